use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "message": "Insufficient stock for 'Omeprazole 20mg'. Available: 15, Requested: 20.",
    "code": "INSUFFICIENT_STOCK"
}))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub message: String,
    /// Machine-readable error code
    #[schema(example = "INSUFFICIENT_STOCK")]
    pub code: String,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    /// Request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    ValidationError {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Product with ID {0} not found.")]
    ProductNotFound(i32),

    #[error("Insufficient stock for '{product_name}'. Available: {available}, Requested: {requested}.")]
    InsufficientStock {
        product_id: i32,
        product_name: String,
        available: i32,
        requested: i32,
    },

    #[error("Order is already delivered and cannot be advanced further.")]
    AlreadyDelivered(i32),

    #[error("Order with ID {0} was modified by another request. Reload and try again.")]
    ConcurrentModification(i32),

    #[error("A product with SKU '{0}' already exists.")]
    DuplicateSku(String),

    #[error("Product with ID {0} is referenced by existing orders and cannot be deleted.")]
    ProductInUse(i32),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn order_not_found(id: i32) -> Self {
        ServiceError::NotFound(format!("Order with ID {} not found.", id))
    }

    pub fn product_not_found(id: i32) -> Self {
        ServiceError::NotFound(format!("Product with ID {} not found.", id))
    }

    /// A validation failure on a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.clone()]);
        ServiceError::ValidationError { message, fields }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. }
            | Self::ProductNotFound(_)
            | Self::InsufficientStock { .. }
            | Self::AlreadyDelivered(_) => StatusCode::BAD_REQUEST,
            Self::ConcurrentModification(_) | Self::DuplicateSku(_) | Self::ProductInUse(_) => {
                StatusCode::CONFLICT
            }
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::AlreadyDelivered(_) => "ALREADY_DELIVERED",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::DuplicateSku(_) => "DUPLICATE_SKU",
            Self::ProductInUse(_) => "PRODUCT_IN_USE",
            Self::DatabaseError(_) | Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return a generic message to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => {
                "An unexpected error occurred.".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let fields: BTreeMap<String, Vec<String>> = err
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid ({}).", field, e.code))
                    })
                    .collect();
                (camel_case(field), messages)
            })
            .collect();

        ServiceError::ValidationError {
            message: "One or more validation errors occurred.".to_string(),
            fields,
        }
    }
}

/// Field names are reported the way clients spell them in JSON bodies.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::ValidationError {
            message: rejection.body_text(),
            fields: BTreeMap::new(),
        }
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::ValidationError {
            message: rejection.body_text(),
            fields: BTreeMap::new(),
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::ValidationError {
            message: rejection.body_text(),
            fields: BTreeMap::new(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_internal() {
            error!(error = %self, "Unhandled error while processing request");
        }

        let errors = match &self {
            Self::ValidationError { fields, .. } if !fields.is_empty() => Some(fields.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            message: self.response_message(),
            code: self.error_code().to_string(),
            errors,
            request_id: current_request_id(),
        };

        (status, Json(body)).into_response()
    }
}
