//! Sessions, roles and the access gate run before every handler

use std::collections::HashMap;
use std::path::Path;

use lambda_http::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Broker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Set for broker accounts; scopes what the session may see
    #[serde(default)]
    pub broker_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SessionUser,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Broker id the session is restricted to; `None` for admins
    pub fn broker_scope(&self) -> Option<&str> {
        match self.role {
            Role::Admin => None,
            Role::Broker => Some(self.user.broker_id.as_deref().unwrap_or_default()),
        }
    }

    /// Admins may act on any broker's records, brokers only on their own
    pub fn ensure_owns(&self, broker_id: &str) -> Result<()> {
        match self.broker_scope() {
            Some(own) if own != broker_id => Err(CrmError::forbidden("Accès refusé")),
            _ => Ok(()),
        }
    }
}

/// Resolves the caller's session from request headers
pub trait SessionProvider: Send + Sync {
    fn get_session(&self, headers: &HeaderMap) -> Option<Session>;
}

/// Bearer tokens mapped to sessions, loaded from a JSON object file
#[derive(Debug, Clone, Default)]
pub struct TokenSessions {
    sessions: HashMap<String, Session>,
}

impl TokenSessions {
    pub fn new(sessions: HashMap<String, Session>) -> Self {
        Self { sessions }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&text)?))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl SessionProvider for TokenSessions {
    fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        bearer_token(headers).and_then(|token| self.sessions.get(token).cloned())
    }
}

/// Minimum privilege a route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authenticated,
    Admin,
}

/// Checks the caller against a route's access tier before its handler runs
pub struct AuthGate<'a> {
    provider: &'a dyn SessionProvider,
}

impl<'a> AuthGate<'a> {
    pub fn new(provider: &'a dyn SessionProvider) -> Self {
        Self { provider }
    }

    /// No session gives 401, a broker on an admin route 403
    pub fn check(&self, headers: &HeaderMap, access: Access) -> Result<Session> {
        let session = self
            .provider
            .get_session(headers)
            .ok_or(CrmError::Unauthorized)?;
        if access == Access::Admin && !session.is_admin() {
            return Err(CrmError::forbidden("Droits administrateur requis"));
        }
        Ok(session)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lambda_http::http::HeaderValue;

    pub fn admin() -> Session {
        Session {
            user: SessionUser {
                id: "user-admin".into(),
                email: "admin@rcd.fr".into(),
                name: Some("Admin".into()),
                broker_id: None,
            },
            role: Role::Admin,
        }
    }

    pub fn broker(broker_id: &str) -> Session {
        Session {
            user: SessionUser {
                id: format!("user-{}", broker_id),
                email: format!("{}@example.fr", broker_id),
                name: None,
                broker_id: Some(broker_id.into()),
            },
            role: Role::Broker,
        }
    }

    /// Tokens "admin-token", "brk-1-token" and "brk-2-token"
    pub fn sessions() -> TokenSessions {
        TokenSessions::new(HashMap::from([
            ("admin-token".to_string(), admin()),
            ("brk-1-token".to_string(), broker("brk-1")),
            ("brk-2-token".to_string(), broker("brk-2")),
        ]))
    }

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn test_bearer_lookup() {
        let sessions = sessions();
        assert_eq!(sessions.get_session(&headers("Bearer admin-token")), Some(admin()));
        assert_eq!(sessions.get_session(&headers("bearer brk-1-token")), Some(broker("brk-1")));
        assert_eq!(sessions.get_session(&headers("Basic admin-token")), None);
        assert_eq!(sessions.get_session(&headers("Bearer unknown")), None);
        assert_eq!(sessions.get_session(&HeaderMap::new()), None);
    }

    #[test]
    fn test_gate_tiers() {
        let sessions = sessions();
        let gate = AuthGate::new(&sessions);

        let err = gate.check(&HeaderMap::new(), Access::Authenticated).unwrap_err();
        assert_eq!(err.status(), 401);

        let err = gate.check(&headers("Bearer brk-1-token"), Access::Admin).unwrap_err();
        assert_eq!(err.status(), 403);

        assert!(gate.check(&headers("Bearer brk-1-token"), Access::Authenticated).is_ok());
        assert!(gate.check(&headers("Bearer admin-token"), Access::Admin).is_ok());
    }

    #[test]
    fn test_ownership() {
        assert!(admin().ensure_owns("brk-2").is_ok());
        assert!(broker("brk-1").ensure_owns("brk-1").is_ok());
        assert_eq!(broker("brk-1").ensure_owns("brk-2").unwrap_err().status(), 403);
    }

    #[test]
    fn test_sessions_file_format() {
        let json = r#"{"tok": {"user": {"id": "u1", "email": "a@b.fr", "brokerId": "brk-1"}, "role": "BROKER"}}"#;
        let parsed: HashMap<String, Session> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["tok"].broker_scope(), Some("brk-1"));
    }
}
