//! Request body extraction for JSON and URL-encoded forms.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use crate::models::AppError;

/// Nesting depth accepted for bracketed form keys such as `user[address][city]`.
const FORM_MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

/// Deserializes the request body by `Content-Type`:
/// `application/json` as JSON, `application/x-www-form-urlencoded` as a form with
/// bracketed keys expanded into nested objects (`user[email]=x`).
/// An empty body, or one of any other type, is treated as `{}`, so handlers whose
/// fields are all optional still run. A body that fails to parse (or is over the
/// size limit) becomes `AppError::Body`, which is answered with the generic 500 envelope.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let kind = body_kind(&req);
        let bytes = Bytes::from_request(req, state).await?;

        let value = match kind {
            _ if bytes.is_empty() => empty_body()?,
            BodyKind::Json => serde_json::from_slice(&bytes).map_err(|e| AppError::Body(e.to_string()))?,
            BodyKind::Form => serde_qs::Config::new(FORM_MAX_DEPTH, false)
                .deserialize_bytes(&bytes)
                .map_err(|e| AppError::Body(e.to_string()))?,
            BodyKind::Other => empty_body()?,
        };
        Ok(Payload(value))
    }
}

fn empty_body<T: DeserializeOwned>() -> Result<T, AppError> {
    serde_json::from_slice(b"{}").map_err(|e| AppError::Body(e.to_string()))
}

fn body_kind(req: &Request) -> BodyKind {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase())
        .unwrap_or_default();
    if content_type.starts_with("application/json") {
        BodyKind::Json
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        email: String,
        password: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        user: Login,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Optional {
        email: Option<String>,
    }

    fn request(content_type: &str, body: &str) -> Request {
        http::Request::post("/").header(CONTENT_TYPE, content_type).body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn parses_json_and_form() {
        let Payload(json) = Payload::<Login>::from_request(request("application/json", r#"{"email":"a@b.com","password":"pw"}"#), &())
            .await
            .unwrap();
        let Payload(form) = Payload::<Login>::from_request(request("application/x-www-form-urlencoded", "email=a%40b.com&password=pw"), &())
            .await
            .unwrap();
        assert_eq!(json, form);
        assert_eq!(form.email, "a@b.com");
    }

    #[tokio::test]
    async fn expands_bracketed_form_keys() {
        let body = "user%5Bemail%5D=a%40b.com&user[password]=pw";
        let Payload(profile) = Payload::<Profile>::from_request(request("application/x-www-form-urlencoded", body), &()).await.unwrap();
        assert_eq!(profile.user, Login { email: "a@b.com".into(), password: "pw".into() });
    }

    #[tokio::test]
    async fn missing_or_foreign_bodies_read_as_empty_object() {
        let req = http::Request::post("/").body(Body::empty()).unwrap();
        let Payload(opt) = Payload::<Optional>::from_request(req, &()).await.unwrap();
        assert_eq!(opt, Optional { email: None });

        let Payload(opt) = Payload::<Optional>::from_request(request("text/plain", "email=x"), &()).await.unwrap();
        assert_eq!(opt, Optional { email: None });

        let Payload(opt) = Payload::<Optional>::from_request(request("application/json", ""), &()).await.unwrap();
        assert_eq!(opt, Optional { email: None });
    }

    #[tokio::test]
    async fn malformed_bodies_are_body_errors() {
        let err = Payload::<Login>::from_request(request("application/json", "{\"email\":"), &()).await.unwrap_err();
        assert!(matches!(err, AppError::Body(_)));

        // An empty object still has to satisfy required fields.
        let err = Payload::<Login>::from_request(request("text/plain", "email=x"), &()).await.unwrap_err();
        assert!(matches!(err, AppError::Body(_)));
    }
}
