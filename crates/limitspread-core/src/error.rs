// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for LimitSpread operations
#[derive(Error, Debug, Diagnostic)]
pub enum LimitSpreadError {
    /// Resource not found
    #[error("Resource not found: {resource_key}")]
    #[diagnostic(
        code(limitspread::resource_not_found),
        help("Verify the resource name, namespace, and API version are correct")
    )]
    ResourceNotFound {
        #[allow(unused)]
        resource_key: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(limitspread::serialization_error),
        help("Ensure the document is valid JSON or YAML")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid API version
    #[error("Invalid API version: {api_version}")]
    #[diagnostic(
        code(limitspread::invalid_api_version),
        help("Use a valid Kubernetes API version like 'v1' or 'apps/v1'")
    )]
    InvalidApiVersion {
        #[allow(unused)]
        api_version: String,
    },

    /// Invalid resource quantity
    #[error("Invalid {resource} quantity: {value}")]
    #[diagnostic(
        code(limitspread::invalid_quantity),
        help("Use Kubernetes quantity notation, e.g. '500m' for CPU or '128Mi' for memory")
    )]
    InvalidQuantity {
        #[allow(unused)]
        resource: String,
        #[allow(unused)]
        value: String,
    },
}

/// Result type alias for LimitSpread operations
pub type Result<T> = std::result::Result<T, LimitSpreadError>;

impl LimitSpreadError {
    /// Create a ResourceNotFound error
    pub fn resource_not_found(resource_key: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_key: resource_key.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidApiVersion error
    pub fn invalid_api_version(api_version: impl Into<String>) -> Self {
        Self::InvalidApiVersion {
            api_version: api_version.into(),
        }
    }

    /// Create an InvalidQuantity error
    pub fn invalid_quantity(resource: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            resource: resource.into(),
            value: value.into(),
        }
    }
}
