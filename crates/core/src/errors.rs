use thiserror::Error;

use crate::table::RangeError;

/// Failures of the collaborators around the engine. Classification and
/// filtering never fail; an empty result is reported as an outcome, not here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("data source failure: {0}")]
    DataSource(String),
    #[error("authentication failure: {0}")]
    Authentication(String),
    #[error("language model failure: {0}")]
    Model(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<RangeError> for ApplicationError {
    fn from(value: RangeError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("data source unavailable: {message}")]
    SourceUnavailable { message: String, correlation_id: String },
    #[error("language model unavailable: {message}")]
    ModelUnavailable { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => {
                "I could not reach the data source. Check the sheet location and try again."
            }
            Self::ModelUnavailable { .. } => {
                "The language model is temporarily unavailable. Please retry shortly."
            }
            Self::Unauthorized { .. } => {
                "Access was denied. Check the configured credentials and sharing settings."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::SourceUnavailable { correlation_id, .. }
            | Self::ModelUnavailable { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::SourceUnavailable { correlation_id: id, .. }
            | InterfaceError::ModelUnavailable { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    /// Stable class name used in structured CLI output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::DataSource(_) => "data_source",
            Self::Authentication(_) => "authentication",
            Self::Model(_) => "model",
            Self::Configuration(_) => "config_validation",
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::DataSource(message) => {
                Self::SourceUnavailable { message, correlation_id }
            }
            ApplicationError::Model(message) => Self::ModelUnavailable { message, correlation_id },
            ApplicationError::Authentication(message) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
