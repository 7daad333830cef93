//! JSON envelope and attachment responses

use lambda_http::http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use log::{error, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::bordereau::Download;
use crate::error::CrmError;

/// What a handler produces on success
#[derive(Debug)]
pub enum Reply {
    /// Envelope fields other than `success`
    Json { status: u16, fields: Map<String, Value> },
    File(Download),
}

impl Reply {
    /// `{success: true, data}`
    pub fn data<T: Serialize>(data: &T) -> Result<Self, CrmError> {
        Ok(Reply::fields([("data", serde_json::to_value(data)?)]))
    }

    /// `{success: true, ...fields}`
    pub fn fields<const N: usize>(fields: [(&str, Value); N]) -> Self {
        Reply::Json {
            status: 200,
            fields: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    pub fn with_status(self, status: u16) -> Self {
        match self {
            Reply::Json { fields, .. } => Reply::Json { status, fields },
            file => file,
        }
    }
}

fn with_status(mut response: Response<Body>, status: u16) -> Response<Body> {
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}

fn cors(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

fn json_body(status: u16, body: Value) -> Response<Body> {
    let mut response = with_status(Response::new(Body::Text(body.to_string())), status);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    cors(&mut response);
    response
}

pub fn error_response(status: u16, message: &str) -> Response<Body> {
    json_body(status, json!({ "success": false, "error": message }))
}

/// Map an error to its envelope; 500s are logged with their detail
pub fn failure(route: &str, err: &CrmError) -> Response<Body> {
    let status = err.status();
    if status >= 500 {
        error!("{} failed: {}", route, err);
    } else {
        warn!("{} rejected ({}): {}", route, status, err);
    }
    error_response(status, &err.client_message())
}

/// Keep file names to a safe header-compatible alphabet
fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

fn attachment(download: Download) -> Response<Body> {
    let disposition = format!("attachment; filename=\"{}\"", safe_file_name(&download.file_name));
    let mut response = Response::new(Body::Binary(download.bytes));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(download.content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    headers.insert(
        HeaderName::from_static("access-control-expose-headers"),
        HeaderValue::from_static("Content-Disposition"),
    );
    cors(&mut response);
    response
}

pub fn success(reply: Reply) -> Response<Body> {
    match reply {
        Reply::Json { status, fields } => {
            let mut body = Map::new();
            body.insert("success".to_string(), Value::Bool(true));
            body.extend(fields);
            json_body(status, Value::Object(body))
        }
        Reply::File(download) => attachment(download),
    }
}

/// CORS preflight answer
pub fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    cors(&mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(response: &Response<Body>) -> Value {
        match response.body() {
            Body::Text(s) => serde_json::from_str(s).unwrap(),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_hides_internal_detail() {
        let err = CrmError::Internal("connection refused on 10.0.0.3".into());
        let response = failure("GET /x", &err);
        assert_eq!(response.status().as_u16(), 500);
        let body = text(&response);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Erreur interne du serveur");
    }

    #[test]
    fn test_success_merges_fields() {
        let reply = Reply::fields([("data", json!([1, 2])), ("metadata", json!({"total": 2}))]);
        let response = success(reply.with_status(201));
        assert_eq!(response.status().as_u16(), 201);
        let body = text(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["metadata"]["total"], 2);
    }

    #[test]
    fn test_attachment_headers() {
        let response = success(Reply::File(Download {
            file_name: "bordereau 2024/03.csv".into(),
            content_type: "text/csv; charset=utf-8",
            bytes: b"A;B\r\n".to_vec(),
        }));
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"bordereau_2024_03.csv\""
        );
        assert!(matches!(response.body(), Body::Binary(b) if b.as_slice() == b"A;B\r\n"));
    }
}
