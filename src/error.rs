//! Error Handling Module
//!
//! This module defines the error taxonomy for the SES client using the `thiserror` crate.

use crate::models::ServiceFault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SesError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid message: {0}")]
    Message(String),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-200 response carrying a parsed fault document.
    #[error("{fault}")]
    Service {
        status: u16,
        body: String,
        fault: ServiceFault,
    },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid format: {0}")]
    Format(String),
}

impl SesError {
    /// Returns the fault if the service rejected the call.
    pub fn fault(&self) -> Option<&ServiceFault> {
        match self {
            SesError::Service { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SesError>;
