//! Unified application error model.
//! This module provides the closed error enum used across the directive compiler,
//! the guard chain and the request boundary, along with helper constructors and
//! an HTTP status mapping for transports that sit in front of the engine.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Why an authorization gate rejected a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthReason {
    NotAuthenticated,
    AlreadyAuthenticated,
    InsufficientRole,
    InvalidCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// A gate rejected the request. Surfaced to the caller, never a server fault.
    Auth { reason: AuthReason, message: String },
    /// Caller-supplied arguments did not match the declared input shape.
    Input { message: String },
    /// An addressed entity does not exist where existence is required.
    NotFound { message: String },
    /// A field's annotations are incompatible with its declared shape.
    /// Raised while compiling the schema; a process that sees this must not serve.
    Config { message: String },
    /// The storage collaborator failed. Surfaced as a generic failure, not retried here.
    Storage { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::Auth { reason: AuthReason::NotAuthenticated, .. } => "not_authenticated",
            AppError::Auth { reason: AuthReason::AlreadyAuthenticated, .. } => "already_authenticated",
            AppError::Auth { reason: AuthReason::InsufficientRole, .. } => "insufficient_role",
            AppError::Auth { reason: AuthReason::InvalidCredentials, .. } => "invalid_credentials",
            AppError::Input { .. } => "bad_input",
            AppError::NotFound { .. } => "not_found",
            AppError::Config { .. } => "config_error",
            AppError::Storage { .. } => "storage_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Auth { message, .. }
            | AppError::Input { message }
            | AppError::NotFound { message }
            | AppError::Config { message }
            | AppError::Storage { message } => message.as_str(),
        }
    }

    pub fn not_authenticated() -> Self {
        AppError::Auth { reason: AuthReason::NotAuthenticated, message: "not authenticated".into() }
    }
    pub fn already_authenticated() -> Self {
        AppError::Auth { reason: AuthReason::AlreadyAuthenticated, message: "already authenticated".into() }
    }
    pub fn insufficient_role<S: Display>(minimum: S) -> Self {
        AppError::Auth { reason: AuthReason::InsufficientRole, message: format!("insufficient role, {} required", minimum) }
    }
    pub fn invalid_credentials() -> Self {
        AppError::Auth { reason: AuthReason::InvalidCredentials, message: "invalid credentials".into() }
    }
    pub fn input<S: Into<String>>(msg: S) -> Self { AppError::Input { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { AppError::Config { message: msg.into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { AppError::Storage { message: msg.into() } }

    /// Map to HTTP status code for transports fronting the engine.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Auth { reason: AuthReason::InsufficientRole, .. } => 403,
            AppError::Auth { .. } => 401,
            AppError::Input { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Config { .. } => 500,
            AppError::Storage { .. } => 503,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as storage-side unless downcasted elsewhere
        AppError::Storage { message: err.to_string() }
    }
}
