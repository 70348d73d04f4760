//! XML Parser Module
//!
//! Decodes SES response documents into the typed results in [`crate::models`].
//! Element names are matched on their local part, so the API namespace on the
//! root element does not matter. Documents with a DOCTYPE are rejected outright
//! and nesting depth is capped. Truncated documents and missing required
//! elements are errors, never partial results.

use crate::error::{Result, SesError};
use crate::models::{
    Quantity, ResponseMetadata, SendDataPoint, SendQuota, SendResult, SendStatistics, ServiceFault,
    VerifiedEmailAddresses,
};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

const MAX_DEPTH: usize = 20;

/// One step of a document walk. `path` holds the local names of the open elements,
/// outermost first, including the element being opened or closed.
enum Node<'a> {
    Open(&'a [String]),
    Text(&'a [String], String),
    Close(&'a [String]),
}

/// Walks `xml` and hands every element boundary and text node to `visit`.
///
/// All text and CDATA directly inside one element is joined and delivered as a
/// single trimmed `Node::Text` just before that element's `Node::Close`, so a
/// comment or CDATA section in the middle of a value does not split it.
fn walk<F>(xml: &str, mut visit: F) -> Result<()>
where
    F: FnMut(Node<'_>) -> Result<()>,
{
    let mut reader = Reader::from_str(xml);

    let mut path: Vec<String> = Vec::new();
    let mut texts: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if path.is_empty() && seen_root {
                    return Err(SesError::Format("multiple root elements".into()));
                }
                seen_root = true;
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                texts.push(String::new());
                if path.len() > MAX_DEPTH {
                    return Err(SesError::Format("XML nesting depth limit exceeded".into()));
                }
                visit(Node::Open(&path))?;
            }
            Ok(Event::Empty(ref e)) => {
                if path.is_empty() && seen_root {
                    return Err(SesError::Format("multiple root elements".into()));
                }
                seen_root = true;
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                visit(Node::Open(&path))?;
                visit(Node::Close(&path))?;
                path.pop();
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| SesError::Format(format!("bad text content: {}", e)))?;
                if let Some(buffer) = texts.last_mut() {
                    buffer.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(buffer) = texts.last_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let text = texts.pop().unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    visit(Node::Text(&path, text.to_string()))?;
                }
                visit(Node::Close(&path))?;
                path.pop();
            }
            Ok(Event::DocType(_)) => {
                return Err(SesError::Format("DOCTYPE declarations are not accepted".into()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SesError::Xml(e)),
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(SesError::Format(format!(
            "unexpected end of document inside <{}>",
            path.join("/")
        )));
    }
    if !seen_root {
        return Err(SesError::Format("empty document".into()));
    }
    Ok(())
}

/// True when `path` ends with `suffix`.
fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn required(value: Option<String>, element: &str) -> Result<String> {
    value.ok_or_else(|| SesError::Format(format!("missing <{}> element", element)))
}

fn parse_number<T: std::str::FromStr>(text: &str, element: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| SesError::Format(format!("<{}> is not a number: {:?}", element, text)))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SesError::Format(format!("<Timestamp> is not RFC 3339 ({}): {:?}", e, text)))
}

/// Parses a response that carries only `ResponseMetadata/RequestId`
/// (`VerifyEmailAddress`, `DeleteVerifiedEmailAddress`).
pub fn parse_response_metadata(xml: &str) -> Result<ResponseMetadata> {
    let mut request_id = None;
    walk(xml, |node| {
        if let Node::Text(path, text) = node {
            if ends_with(path, &["ResponseMetadata", "RequestId"]) {
                request_id = Some(text);
            }
        }
        Ok(())
    })?;
    Ok(ResponseMetadata {
        request_id: required(request_id, "RequestId")?,
    })
}

/// Parses a `GetSendQuotaResponse` document.
pub fn parse_send_quota(xml: &str) -> Result<SendQuota> {
    let mut max_24_hour_send = None;
    let mut max_send_rate = None;
    let mut sent_last_24_hours = None;
    let mut request_id = None;
    walk(xml, |node| {
        if let Node::Text(path, text) = node {
            if ends_with(path, &["GetSendQuotaResult", "Max24HourSend"]) {
                max_24_hour_send = Some(text);
            } else if ends_with(path, &["GetSendQuotaResult", "MaxSendRate"]) {
                max_send_rate = Some(text);
            } else if ends_with(path, &["GetSendQuotaResult", "SentLast24Hours"]) {
                sent_last_24_hours = Some(text);
            } else if ends_with(path, &["ResponseMetadata", "RequestId"]) {
                request_id = Some(text);
            }
        }
        Ok(())
    })?;
    Ok(SendQuota {
        max_24_hour_send: parse_number::<Quantity>(
            &required(max_24_hour_send, "Max24HourSend")?,
            "Max24HourSend",
        )?,
        max_send_rate: parse_number::<Quantity>(&required(max_send_rate, "MaxSendRate")?, "MaxSendRate")?,
        sent_last_24_hours: parse_number::<Quantity>(
            &required(sent_last_24_hours, "SentLast24Hours")?,
            "SentLast24Hours",
        )?,
        request_id: required(request_id, "RequestId")?,
    })
}

#[derive(Default)]
struct DataPointFields {
    delivery_attempts: Option<String>,
    timestamp: Option<String>,
    rejects: Option<String>,
    bounces: Option<String>,
    complaints: Option<String>,
}

impl DataPointFields {
    fn finish(self) -> Result<SendDataPoint> {
        Ok(SendDataPoint {
            delivery_attempts: parse_number(
                &required(self.delivery_attempts, "DeliveryAttempts")?,
                "DeliveryAttempts",
            )?,
            timestamp: parse_timestamp(&required(self.timestamp, "Timestamp")?)?,
            rejects: parse_number(&required(self.rejects, "Rejects")?, "Rejects")?,
            bounces: parse_number(&required(self.bounces, "Bounces")?, "Bounces")?,
            complaints: parse_number(&required(self.complaints, "Complaints")?, "Complaints")?,
        })
    }
}

/// Parses a `GetSendStatisticsResponse` document. Data points keep document order.
pub fn parse_send_statistics(xml: &str) -> Result<SendStatistics> {
    const MEMBER: &[&str] = &["SendDataPoints", "member"];
    let mut data_points = Vec::new();
    let mut current: Option<DataPointFields> = None;
    let mut request_id = None;
    walk(xml, |node| {
        match node {
            Node::Open(path) if ends_with(path, MEMBER) => {
                current = Some(DataPointFields::default());
            }
            Node::Close(path) if ends_with(path, MEMBER) => {
                if let Some(fields) = current.take() {
                    data_points.push(fields.finish()?);
                }
            }
            Node::Text(path, text) => {
                if ends_with(path, &["ResponseMetadata", "RequestId"]) {
                    request_id = Some(text);
                } else if let Some(fields) = current.as_mut() {
                    let slot = match path.last().map(String::as_str) {
                        Some("DeliveryAttempts") => &mut fields.delivery_attempts,
                        Some("Timestamp") => &mut fields.timestamp,
                        Some("Rejects") => &mut fields.rejects,
                        Some("Bounces") => &mut fields.bounces,
                        Some("Complaints") => &mut fields.complaints,
                        _ => return Ok(()),
                    };
                    *slot = Some(text);
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(SendStatistics {
        data_points,
        request_id: required(request_id, "RequestId")?,
    })
}

/// Parses a `ListVerifiedEmailAddressesResponse` document.
pub fn parse_verified_email_addresses(xml: &str) -> Result<VerifiedEmailAddresses> {
    let mut addresses = Vec::new();
    let mut request_id = None;
    walk(xml, |node| {
        if let Node::Text(path, text) = node {
            if ends_with(path, &["VerifiedEmailAddresses", "member"]) {
                addresses.push(text);
            } else if ends_with(path, &["ResponseMetadata", "RequestId"]) {
                request_id = Some(text);
            }
        }
        Ok(())
    })?;
    Ok(VerifiedEmailAddresses {
        addresses,
        request_id: required(request_id, "RequestId")?,
    })
}

/// Parses a `SendEmailResponse` or `SendRawEmailResponse`; `result_element` names
/// the element holding `MessageId` (e.g. `SendRawEmailResult`).
pub fn parse_send_result(xml: &str, result_element: &str) -> Result<SendResult> {
    let mut message_id = None;
    let mut request_id = None;
    walk(xml, |node| {
        if let Node::Text(path, text) = node {
            if ends_with(path, &[result_element, "MessageId"]) {
                message_id = Some(text);
            } else if ends_with(path, &["ResponseMetadata", "RequestId"]) {
                request_id = Some(text);
            }
        }
        Ok(())
    })?;
    Ok(SendResult {
        message_id: required(message_id, "MessageId")?,
        request_id: required(request_id, "RequestId")?,
    })
}

/// Parses an `<ErrorResponse>` fault document.
///
/// `Type`, `Code` and `RequestId` must be present; `Message` may be absent and
/// decodes to an empty string.
pub fn parse_error_response(xml: &str) -> Result<ServiceFault> {
    let mut fault_type = None;
    let mut code = None;
    let mut message = None;
    let mut request_id = None;
    walk(xml, |node| {
        if let Node::Text(path, text) = node {
            if ends_with(path, &["Error", "Type"]) {
                fault_type = Some(text);
            } else if ends_with(path, &["Error", "Code"]) {
                code = Some(text);
            } else if ends_with(path, &["Error", "Message"]) {
                message = Some(text);
            } else if ends_with(path, &["ErrorResponse", "RequestId"]) {
                request_id = Some(text);
            }
        }
        Ok(())
    })?;
    Ok(ServiceFault {
        fault_type: required(fault_type, "Type")?,
        code: required(code, "Code")?,
        message: message.unwrap_or_default(),
        request_id: required(request_id, "RequestId")?,
    })
}
