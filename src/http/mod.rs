//! HTTP surface: routing, access gate, request parsing and handlers
//!
//! Every request goes through [`App::handle`]: the route is matched, the
//! [`AuthGate`] checks the route's access tier, and only then does the
//! handler body run. Handlers return a [`Reply`] or a [`CrmError`]; both are
//! turned into the `{success, data?|error?}` envelope here, so binary
//! endpoints fall back to a JSON error body on failure.

mod bordereaux;
mod payments;
mod response;
mod router;
mod tariff;

pub use response::{error_response, Reply};
pub use router::{routes, Route};

use std::sync::Arc;

use lambda_http::{Body, Request, RequestExt, Response};
use log::info;
use serde::de::DeserializeOwned;

use crate::auth::{AuthGate, Session, SessionProvider};
use crate::clock::Clock;
use crate::error::{CrmError, Result};
use crate::store::CrmStore;

/// Signature shared by all route handlers
pub type Handler = fn(&Ctx) -> Result<Reply>;

/// Shared services, built once per process
pub struct App {
    pub store: Arc<dyn CrmStore>,
    pub sessions: Arc<dyn SessionProvider>,
    pub clock: Arc<dyn Clock>,
    pub csv_delimiter: u8,
    routes: Vec<Route>,
}

/// What a handler sees of one request
pub struct Ctx<'a> {
    pub app: &'a App,
    pub session: Session,
    pub request: &'a Request,
    /// Values of the `{..}` segments, in pattern order
    pub params: Vec<String>,
}

impl Ctx<'_> {
    pub fn store(&self) -> &dyn CrmStore {
        self.app.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.app.clock.as_ref()
    }

    pub fn param(&self, index: usize) -> Result<&str> {
        self.params
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CrmError::validation("Paramètre de chemin manquant"))
    }

    pub fn query(&self, name: &str) -> Option<String> {
        self.request
            .query_string_parameters_ref()
            .and_then(|params| params.first(name))
            .map(str::to_string)
    }

    /// Deserialize the JSON body; an empty body reads as `{}`
    pub fn body<T: DeserializeOwned>(&self) -> Result<T> {
        let text = match self.request.body() {
            Body::Text(s) => s.as_str(),
            Body::Binary(b) => std::str::from_utf8(b)
                .map_err(|e| CrmError::validation(format!("Requête invalide: {}", e)))?,
            Body::Empty => "{}",
        };
        serde_json::from_str(text)
            .map_err(|e| CrmError::validation(format!("Requête invalide: {}", e)))
    }
}

impl App {
    pub fn new(
        store: Arc<dyn CrmStore>,
        sessions: Arc<dyn SessionProvider>,
        clock: Arc<dyn Clock>,
        csv_delimiter: u8,
    ) -> Self {
        Self {
            store,
            sessions,
            clock,
            csv_delimiter,
            routes: routes(),
        }
    }

    pub async fn handle(&self, request: Request) -> Response<Body> {
        self.dispatch(&request)
    }

    fn dispatch(&self, request: &Request) -> Response<Body> {
        if request.method().as_str() == "OPTIONS" {
            return response::preflight();
        }

        let path = router::normalize(request.uri().path());
        let label = format!("{} {}", request.method(), path);

        let matched = self.routes.iter().find_map(|route| {
            if &route.method != request.method() {
                return None;
            }
            route.captures(path).map(|params| (route, params))
        });
        let Some((route, params)) = matched else {
            return response::error_response(404, "Route introuvable");
        };

        let gate = AuthGate::new(self.sessions.as_ref());
        let session = match gate.check(request.headers(), route.access) {
            Ok(session) => session,
            Err(err) => return response::failure(&label, &err),
        };

        let ctx = Ctx {
            app: self,
            session,
            request,
            params,
        };
        match (route.handler)(&ctx) {
            Ok(reply) => {
                info!("{} ok ({})", label, ctx.session.user.id);
                response::success(reply)
            }
            Err(err) => response::failure(&label, &err),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _) = app();
        let response = app.handle(request("GET", "/nope", Some("admin-token"), None)).await;
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(json(&response)["success"], false);
    }

    #[tokio::test]
    async fn test_gate_runs_before_handler() {
        let (app, store) = app();
        let before = store.snapshot().unwrap();

        let response = app.handle(request("POST", "/rectifier-montants", None, None)).await;
        assert_eq!(response.status().as_u16(), 401);

        let response = app
            .handle(request("POST", "/rectifier-montants", Some("brk-1-token"), None))
            .await;
        assert_eq!(response.status().as_u16(), 403);
        assert_eq!(json(&response)["error"], "Droits administrateur requis");

        // neither request reached the handler
        assert_eq!(store.snapshot().unwrap(), before);
    }

    fn binary_request(bytes: &[u8]) -> lambda_http::Request {
        lambda_http::http::Request::builder()
            .method("POST")
            .uri("/tariff/calculate")
            .header("authorization", "Bearer brk-1-token")
            .body(lambda_http::Body::Binary(bytes.to_vec()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_binary_body_must_be_utf8() {
        let (app, _) = app();
        let response = app.handle(binary_request(b"{\"annualRevenue\": 1\xff}")).await;
        assert_eq!(response.status().as_u16(), 400);
        assert!(json(&response)["error"]
            .as_str()
            .unwrap()
            .starts_with("Requête invalide"));

        let response = app.handle(binary_request(br#"{"annualRevenue": 150000}"#)).await;
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_preflight_and_api_prefix() {
        let (app, _) = app();
        let response = app.handle(request("OPTIONS", "/bordereaux/history", None, None)).await;
        assert_eq!(response.status().as_u16(), 200);

        let response = app
            .handle(request("GET", "/api/bordereaux/history", Some("admin-token"), None))
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }
}
