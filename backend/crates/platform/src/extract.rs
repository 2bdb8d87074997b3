//! Request extractors

use axum::Json;
use axum::extract::{FromRequest, Request};
use kernel::error::app_error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::sanitize::sanitize_value_except;

/// Top-level body fields that [`SanitizedJson`] passes through unchanged
///
/// Secrets such as passwords must reach the handler exactly as typed.
pub trait VerbatimFields {
    const VERBATIM_FIELDS: &'static [&'static str] = &[];
}

impl VerbatimFields for Value {}

/// JSON body whose string leaves are stripped of markup before deserializing
///
/// Only the body is sanitized. Query and path parameters go through their
/// own extractors.
#[derive(Debug, Clone)]
pub struct SanitizedJson<T>(pub T);

impl<T, S> FromRequest<S> for SanitizedJson<T>
where
    T: DeserializeOwned + VerbatimFields,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        let value = serde_json::from_value(sanitize_value_except(value, T::VERBATIM_FIELDS))?;
        Ok(SanitizedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use kernel::error::kind::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        age: u32,
    }

    impl VerbatimFields for Profile {}

    #[derive(Deserialize)]
    struct Credentials {
        login: String,
        secret: String,
    }

    impl VerbatimFields for Credentials {
        const VERBATIM_FIELDS: &'static [&'static str] = &["secret"];
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_sanitizes_before_deserializing() {
        let req = json_request(
            r#"{"name":" <b>Ada</b> ","tags":["<script>x()</script>ok","<i>two</i>"],"age":36}"#,
        );
        let SanitizedJson(profile) = SanitizedJson::<Profile>::from_request(req, &())
            .await
            .unwrap();

        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.tags, vec!["ok", "two"]);
        assert_eq!(profile.age, 36);
    }

    #[tokio::test]
    async fn test_verbatim_fields_untouched() {
        let req = json_request(r#"{"login":"<b>ada</b>","secret":" Str0ng<Pass>word "}"#);
        let SanitizedJson(creds) = SanitizedJson::<Credentials>::from_request(req, &())
            .await
            .unwrap();

        assert_eq!(creds.login, "ada");
        assert_eq!(creds.secret, " Str0ng<Pass>word ");
    }

    #[tokio::test]
    async fn test_rejects_missing_content_type() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"name":"a"}"#))
            .unwrap();
        let err = SanitizedJson::<Value>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_rejects_wrong_shape() {
        let req = json_request(r#"{"name":"a","tags":"not-a-list","age":1}"#);
        let err = SanitizedJson::<Profile>::from_request(req, &())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
