//! Bearer token gate for private routes

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::error::AuthError;
use super::token::{Payload, TokenMaker};

pub const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

/// Resolve an `Authorization` header value to a verified payload.
///
/// The header is split on whitespace. Fewer than two fields is malformed,
/// the first field must equal `bearer` ignoring case, and the second field
/// is handed to the token maker.
pub fn verify_credential(
    header: Option<&str>,
    maker: &dyn TokenMaker,
) -> Result<Payload, AuthError> {
    let header = header
        .filter(|h| !h.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let mut fields = header.split_whitespace();
    let (Some(scheme), Some(token)) = (fields.next(), fields.next()) else {
        return Err(AuthError::MalformedHeader);
    };

    if !scheme.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        return Err(AuthError::UnsupportedScheme(scheme.to_lowercase()));
    }

    maker.verify_token(token).map_err(AuthError::InvalidToken)
}

/// Axum middleware that gates a route on a valid bearer token.
///
/// On success the [`Payload`] is stored in the request extensions for
/// handlers to pick up with `Extension<Payload>`.
pub async fn auth_middleware(
    State(maker): State<Arc<dyn TokenMaker>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
        None => None,
    };

    match verify_credential(header, maker.as_ref()) {
        Ok(payload) => {
            request.extensions_mut().insert(payload);
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::debug!(reason = err.reason(), path = %request.uri().path(), "Request rejected");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtMaker;
    use crate::auth::token::TokenError;
    use crate::random::RandomGen;
    use axum::{Extension, Router, http::StatusCode, middleware, routing::get};
    use chrono::Duration;
    use tower::ServiceExt;

    fn maker() -> Arc<dyn TokenMaker> {
        Arc::new(JwtMaker::new(&RandomGen::seeded(11).string(32)).unwrap())
    }

    fn token_for(maker: &dyn TokenMaker, username: &str, ttl: Duration) -> String {
        maker.create_token(username, ttl).unwrap().0
    }

    #[test]
    fn test_verify_credential_table() {
        let maker = maker();
        let valid = token_for(maker.as_ref(), "alice", Duration::minutes(1));
        let expired = token_for(maker.as_ref(), "alice", -Duration::minutes(1));

        let cases: Vec<(Option<String>, Result<&str, AuthError>)> = vec![
            (None, Err(AuthError::MissingHeader)),
            (Some(String::new()), Err(AuthError::MissingHeader)),
            (Some("Bearer".into()), Err(AuthError::MalformedHeader)),
            (Some("   ".into()), Err(AuthError::MalformedHeader)),
            (
                Some(format!("Basic {}", valid)),
                Err(AuthError::UnsupportedScheme("basic".into())),
            ),
            (
                Some(format!("Bearer {}", expired)),
                Err(AuthError::InvalidToken(TokenError::Expired)),
            ),
            (Some(format!("Bearer {}", valid)), Ok("alice")),
            (Some(format!("bearer {}", valid)), Ok("alice")),
            (Some(format!("BEARER   {}", valid)), Ok("alice")),
        ];

        for (header, expected) in cases {
            let got = verify_credential(header.as_deref(), maker.as_ref());
            match expected {
                Ok(username) => assert_eq!(got.unwrap().username, username, "{:?}", header),
                Err(err) => assert_eq!(got.unwrap_err(), err, "{:?}", header),
            }
        }
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let got = verify_credential(Some("Bearer abc.def.ghi"), maker().as_ref());
        assert!(matches!(got, Err(AuthError::InvalidToken(TokenError::Invalid(_)))));
    }

    async fn whoami(Extension(payload): Extension<Payload>) -> String {
        payload.username
    }

    fn app(maker: Arc<dyn TokenMaker>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(maker, auth_middleware))
    }

    async fn call(app: Router, header: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri("/whoami");
        if let Some(h) = header {
            req = req.header(header::AUTHORIZATION, h);
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_middleware_passes_payload() {
        let maker = maker();
        let token = token_for(maker.as_ref(), "bob", Duration::minutes(5));
        let (status, body) = call(app(maker), Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob");
    }

    #[tokio::test]
    async fn test_middleware_rejects() {
        let maker = maker();
        let expired = token_for(maker.as_ref(), "bob", -Duration::minutes(5));

        for header in [
            None,
            Some("Bearer".to_string()),
            Some("Token abc".to_string()),
            Some(format!("Bearer {}", expired)),
        ] {
            let (status, body) = call(app(maker.clone()), header.as_deref()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{:?}", header);
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_ne!(json["code"], 0);
            assert!(json.get("data").is_none());
        }
    }
}
