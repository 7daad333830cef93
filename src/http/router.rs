//! Route table and path matching

use lambda_http::http::Method;

use super::{bordereaux, payments, tariff, Handler};
use crate::auth::Access;

pub struct Route {
    pub method: Method,
    /// Segments separated by `/`; `{name}` captures one segment
    pub pattern: &'static str,
    pub access: Access,
    pub handler: Handler,
}

impl Route {
    fn new(method: Method, pattern: &'static str, access: Access, handler: Handler) -> Self {
        Self { method, pattern, access, handler }
    }

    /// Captured segments when `path` matches the pattern
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let mut params = Vec::new();
        let mut pattern = segments(self.pattern);
        let mut actual = segments(path);
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(p), Some(a)) if p.starts_with('{') && p.ends_with('}') => {
                    params.push(a.to_string())
                }
                (Some(p), Some(a)) if p == a => {}
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip the optional `/api` mount prefix
pub fn normalize(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

pub fn routes() -> Vec<Route> {
    use Access::{Admin, Authenticated};

    vec![
        Route::new(Method::POST, "/tariff/calculate", Authenticated, tariff::calculate),
        Route::new(Method::POST, "/quotes/{id}/calculate", Authenticated, tariff::calculate_quote),
        Route::new(Method::POST, "/bordereaux/preview", Authenticated, bordereaux::preview),
        Route::new(Method::POST, "/bordereaux/preview-v2", Admin, bordereaux::preview_v2),
        Route::new(Method::POST, "/bordereaux/export", Admin, bordereaux::export),
        Route::new(Method::POST, "/bordereaux/export-v2", Admin, bordereaux::export_v2),
        Route::new(Method::GET, "/bordereaux/history", Admin, bordereaux::history),
        Route::new(Method::GET, "/bordereaux/{id}/download", Admin, bordereaux::download),
        Route::new(Method::GET, "/payment-installments", Authenticated, payments::list),
        Route::new(Method::GET, "/payment-installments/overdue", Admin, payments::overdue),
        Route::new(Method::PATCH, "/payment-installments/{id}/mark-paid", Admin, payments::mark_paid),
        Route::new(Method::PATCH, "/payment-installments/{id}/mark-unpaid", Admin, payments::mark_unpaid),
        Route::new(Method::POST, "/rectifier-montants", Admin, payments::rectify),
        Route::new(Method::POST, "/payment-schedules", Admin, payments::create_schedule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &'static str) -> Route {
        Route::new(Method::GET, pattern, Access::Authenticated, |_| unreachable!())
    }

    #[test]
    fn test_captures() {
        let r = route("/bordereaux/{id}/download");
        assert_eq!(r.captures("/bordereaux/abc/download"), Some(vec!["abc".to_string()]));
        assert_eq!(r.captures("/bordereaux/abc/download/"), Some(vec!["abc".to_string()]));
        assert_eq!(r.captures("/bordereaux/history"), None);
        assert_eq!(route("/bordereaux/history").captures("/bordereaux/history"), Some(vec![]));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/api/bordereaux/history"), "/bordereaux/history");
        assert_eq!(normalize("/apis/x"), "/apis/x");
        assert_eq!(normalize("/payment-installments"), "/payment-installments");
    }

    #[test]
    fn test_routes_are_unambiguous() {
        let routes = routes();
        for (i, a) in routes.iter().enumerate() {
            for b in &routes[i + 1..] {
                assert!(
                    !(a.method == b.method && a.pattern == b.pattern),
                    "duplicate route {}",
                    a.pattern
                );
            }
        }
    }
}
