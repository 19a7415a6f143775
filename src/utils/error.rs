use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// 欄位驗證錯誤，序列化後為 `{"field": ["message", ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// 沒有錯誤時回傳 `Ok(())`
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("{message}")]
    AuthenticationFailed { message: String },

    #[error("{message}")]
    PermissionDenied { message: String },

    #[error("Not found.")]
    NotFound,

    #[error("Method \"{method}\" not allowed.")]
    MethodNotAllowed { method: String },

    #[error("Malformed request: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' - {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Password hashing error: {message}")]
    HashingError { message: String },

    #[error("Template error: {0}")]
    TemplateError(#[from] askama::Error),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

impl AppError {
    /// 單一欄位的驗證錯誤
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::ValidationError(errors)
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        AppError::AuthenticationFailed {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        AppError::PermissionDenied {
            message: message.into(),
        }
    }

    /// CLI 結束代碼
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::ConfigError { .. } | AppError::InvalidConfigValueError { .. } => 2,
            AppError::IoError(_) | AppError::RequestError(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
