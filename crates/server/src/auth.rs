use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::warn;

use sparky_core::config::AdminConfig;

/// Bearer-token gate for admin routes. Without a configured token every
/// request passes.
#[derive(Clone, Default)]
pub struct AdminAuth {
    token: Option<SecretString>,
}

#[derive(Debug, PartialEq, Eq)]
enum AuthCheck {
    Open,
    Accepted,
    Missing,
    Malformed,
    Rejected,
}

impl AdminAuth {
    pub fn from_config(config: &AdminConfig) -> Self {
        let token = if config.requires_token() { config.api_token.clone() } else { None };
        Self { token }
    }

    fn check(&self, authorization: Option<&str>) -> AuthCheck {
        let Some(expected) = &self.token else {
            return AuthCheck::Open;
        };

        match authorization {
            None => AuthCheck::Missing,
            Some(value) => match value.strip_prefix("Bearer ") {
                Some(provided)
                    if constant_time_compare(
                        provided.trim().as_bytes(),
                        expected.expose_secret().trim().as_bytes(),
                    ) =>
                {
                    AuthCheck::Accepted
                }
                Some(_) => AuthCheck::Rejected,
                None => AuthCheck::Malformed,
            },
        }
    }
}

pub async fn require_admin_token(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());

    let (status, detail) = match auth.check(authorization) {
        AuthCheck::Open | AuthCheck::Accepted => return next.run(request).await,
        AuthCheck::Missing => (StatusCode::UNAUTHORIZED, "Missing Authorization header"),
        AuthCheck::Malformed => {
            (StatusCode::BAD_REQUEST, "Invalid Authorization header format. Expected: Bearer <token>")
        }
        AuthCheck::Rejected => (StatusCode::UNAUTHORIZED, "Invalid API token"),
    };

    warn!(
        event_name = "system.auth.rejected",
        path = %request.uri().path(),
        status = status.as_u16(),
        "admin request rejected"
    );
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use sparky_core::config::AdminConfig;

    use super::{constant_time_compare, AdminAuth, AuthCheck};

    fn guarded(token: &str) -> AdminAuth {
        AdminAuth::from_config(&AdminConfig { api_token: Some(token.to_string().into()) })
    }

    #[test]
    fn no_token_configured_leaves_routes_open() {
        let auth = AdminAuth::from_config(&AdminConfig::default());
        assert_eq!(auth.check(None), AuthCheck::Open);

        let blank = guarded("   ");
        assert_eq!(blank.check(None), AuthCheck::Open);
    }

    #[test]
    fn bearer_token_is_checked() {
        let auth = guarded("s3cret");
        assert_eq!(auth.check(Some("Bearer s3cret")), AuthCheck::Accepted);
        assert_eq!(auth.check(Some("Bearer nope")), AuthCheck::Rejected);
        assert_eq!(auth.check(Some("Basic s3cret")), AuthCheck::Malformed);
        assert_eq!(auth.check(None), AuthCheck::Missing);
    }

    #[test]
    fn comparison_handles_length_mismatch() {
        assert!(constant_time_compare(b"abc", b"abc"));
        assert!(!constant_time_compare(b"abc", b"abcd"));
        assert!(!constant_time_compare(b"abc", b"abd"));
    }
}
