//! Data Models Module
//!
//! Typed results for every SES action, plus the fault document returned on
//! failure. Every result carries the request id echoed in `ResponseMetadata`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ResponseMetadata {
    pub request_id: String,
}

/// A decimal quantity exactly as the service wrote it, with its parsed value.
///
/// Displays and serializes as the original text, so `1000.0` stays `1000.0`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    text: String,
    value: f64,
}

impl Quantity {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl FromStr for Quantity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let value = text
            .parse::<f64>()
            .map_err(|_| format!("not a number: {:?}", s))?;
        Ok(Quantity {
            text: text.to_string(),
            value,
        })
    }
}

impl TryFrom<String> for Quantity {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        q.text
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SendQuota {
    pub max_24_hour_send: Quantity,
    pub max_send_rate: Quantity,
    pub sent_last_24_hours: Quantity,
    pub request_id: String,
}

/// One fifteen-minute bucket of sending activity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SendDataPoint {
    pub delivery_attempts: u64,
    pub timestamp: DateTime<Utc>,
    pub rejects: u64,
    pub bounces: u64,
    pub complaints: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SendStatistics {
    pub data_points: Vec<SendDataPoint>,
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifiedEmailAddresses {
    pub addresses: Vec<String>,
    pub request_id: String,
}

/// Result of `SendEmail` and `SendRawEmail`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SendResult {
    pub message_id: String,
    pub request_id: String,
}

/// The `<ErrorResponse>` document returned with a non-200 status.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ServiceFault {
    pub fault_type: String,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimpleEmailService error: Type: {} Code: {} Message: {} Request Id: {}",
            self.fault_type, self.code, self.message, self.request_id
        )
    }
}
