//! Unified error handling for the Oylkka backend
//!
//! Layered error kinds with HTTP status mapping, user-facing messages and
//! machine-readable codes. Failures are recovered as close to their origin
//! as possible; nothing is allowed to reach a global handler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic client handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "APPLICATION_NOT_FOUND")]
    ApplicationNotFound,
    #[serde(rename = "RESERVATION_NOT_FOUND")]
    ReservationNotFound,
    #[serde(rename = "PAYMENT_NOT_COMPLETED")]
    PaymentNotCompleted,
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 503)
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,
    #[serde(rename = "MEDIA_STORAGE_ERROR")]
    MediaStorageError,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Permanent application record doesn't exist
    ApplicationNotFound { application_id: String },
    /// Reservation was already promoted, discarded or swept
    ReservationNotFound { application_id: String },
    /// Gateway did not report the payment as completed
    PaymentNotCompleted {
        payment_id: String,
        status: Option<String>,
    },
    /// Amount is invalid (zero, negative, below minimum)
    InvalidAmount { amount: String, reason: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (payment gateway, media storage)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Payment gateway (bKash) error
    PaymentProvider {
        provider: String,
        message: String,
        is_retryable: bool,
    },
    /// Media storage error
    MediaStorage { message: String },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Invalid amount (format or value)
    InvalidAmount { amount: String, reason: String },
    /// Field present but outside its accepted range or format
    InvalidField { field: String, reason: String },
    /// Required field missing
    MissingField { field: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::ApplicationNotFound { .. } => 404,
                DomainError::ReservationNotFound { .. } => 404,
                DomainError::PaymentNotCompleted { .. } => 402,
                DomainError::InvalidAmount { .. } => 400,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => 502,
                ExternalError::MediaStorage { .. } => 502,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::ApplicationNotFound { .. } => ErrorCode::ApplicationNotFound,
                DomainError::ReservationNotFound { .. } => ErrorCode::ReservationNotFound,
                DomainError::PaymentNotCompleted { .. } => ErrorCode::PaymentNotCompleted,
                DomainError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
                ExternalError::MediaStorage { .. } => ErrorCode::MediaStorageError,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => *is_retryable,
                ExternalError::MediaStorage { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::ApplicationNotFound { .. } => "Application not found".to_string(),
                DomainError::ReservationNotFound { .. } => "Application not found".to_string(),
                DomainError::PaymentNotCompleted { .. } => {
                    "Payment was not completed".to_string()
                }
                DomainError::InvalidAmount { reason, .. } => reason.clone(),
            },
            AppErrorKind::Infrastructure(_) => {
                "Service is temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => {
                    "Payment provider returned an error".to_string()
                }
                ExternalError::MediaStorage { .. } => {
                    "Media storage is temporarily unavailable".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { reason, .. } => reason.clone(),
                ValidationError::InvalidField { field, reason } => {
                    format!("{}: {}", field, reason)
                }
                ValidationError::MissingField { field } => {
                    format!("Required field missing: {}", field)
                }
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AppErrorKind::Domain(err) => write!(f, "domain error: {:?}", err),
            AppErrorKind::Infrastructure(err) => write!(f, "infrastructure error: {:?}", err),
            AppErrorKind::External(err) => write!(f, "external error: {:?}", err),
            AppErrorKind::Validation(err) => write!(f, "validation error: {:?}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::database::error::DatabaseError> for AppError {
    fn from(err: crate::database::error::DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        AppError::new(AppErrorKind::External(ExternalError::MediaStorage {
            message: err.to_string(),
        }))
    }
}
