use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 原始請求內容，依 Content-Type 以 JSON 或表單解析
#[derive(Debug, Clone, Default)]
pub struct Payload {
    content_type: Option<String>,
    body: Bytes,
}

impl Payload {
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn is_form(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false)
    }

    /// 空內容視為空物件
    pub fn decode<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        if self.is_form() {
            serde_urlencoded::from_bytes(&self.body).map_err(|e| AppError::ParseError {
                message: format!("Form parse error - {}", e),
            })
        } else {
            serde_json::from_slice(&self.body).map_err(|e| AppError::ParseError {
                message: format!("JSON parse error - {}", e),
            })
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::ParseError {
                message: e.body_text(),
            })?;

        Ok(Self { content_type, body })
    }
}
