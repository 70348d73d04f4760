//! Message Module
//!
//! Plain data describing one email: sender, recipients, subject and a body that
//! is either plain text or text with alternative representations. The client
//! turns it into `SendEmail` parameters, or renders it to MIME for `SendRawEmail`.

use crate::error::{Result, SesError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Character set declared for every text part and parameter.
pub const CHARSET: &str = "utf-8";

const LINE_LENGTH: usize = 76;

/// An alternative rendering of the body, e.g. `text/html`.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub content: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    PlainText(String),
    MultipartAlternative {
        text: String,
        alternatives: Vec<Alternative>,
    },
}

impl MessageBody {
    /// The plain-text part.
    pub fn text(&self) -> &str {
        match self {
            MessageBody::PlainText(text) => text,
            MessageBody::MultipartAlternative { text, .. } => text,
        }
    }

    /// The first `text/html` alternative, if any.
    pub fn html(&self) -> Option<&str> {
        match self {
            MessageBody::PlainText(_) => None,
            MessageBody::MultipartAlternative { alternatives, .. } => alternatives
                .iter()
                .find(|a| a.mime_type.eq_ignore_ascii_case("text/html"))
                .map(|a| a.content.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    from: String,
    subject: String,
    body: MessageBody,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    reply_to: Vec<String>,
    return_path: Option<String>,
    headers: Vec<(String, String)>,
}

impl Message {
    /// Creates a plain-text message.
    ///
    /// # Errors
    ///
    /// Returns [`SesError::Message`] if the sender, subject or body is empty, or
    /// if the sender or subject contains a line break.
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        let from = from.into();
        let subject = subject.into();
        let body = body.into();
        if from.trim().is_empty() {
            return Err(SesError::Message("sender cannot be empty".into()));
        }
        if subject.is_empty() {
            return Err(SesError::Message("subject cannot be empty".into()));
        }
        if body.is_empty() {
            return Err(SesError::Message("body cannot be empty".into()));
        }
        reject_line_breaks("sender", &from)?;
        reject_line_breaks("subject", &subject)?;
        Ok(Self {
            from,
            subject,
            body: MessageBody::PlainText(body),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            return_path: None,
            headers: Vec::new(),
        })
    }

    /// Adds an alternative rendering, turning the body into `multipart/alternative`.
    ///
    /// `mime_type` must have the form `type/subtype`.
    pub fn attach_alternative(
        mut self,
        content: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Result<Self> {
        let mime_type = mime_type.into();
        match mime_type.split_once('/') {
            Some((kind, sub))
                if !kind.is_empty() && !sub.is_empty() && !has_line_break(&mime_type) => {}
            _ => {
                return Err(SesError::Message(format!(
                    "invalid MIME type for alternative: {:?}",
                    mime_type
                )))
            }
        }
        let alternative = Alternative {
            content: content.into(),
            mime_type,
        };
        self.body = match self.body {
            MessageBody::PlainText(text) => MessageBody::MultipartAlternative {
                text,
                alternatives: vec![alternative],
            },
            MessageBody::MultipartAlternative {
                text,
                mut alternatives,
            } => {
                alternatives.push(alternative);
                MessageBody::MultipartAlternative { text, alternatives }
            }
        };
        Ok(self)
    }

    pub fn to<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to.extend(addresses.into_iter().map(Into::into));
        self
    }

    pub fn cc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc.extend(addresses.into_iter().map(Into::into));
        self
    }

    pub fn bcc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bcc.extend(addresses.into_iter().map(Into::into));
        self
    }

    pub fn reply_to<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reply_to.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Address bounces go to. Defaults to the sender.
    pub fn return_path(mut self, address: impl Into<String>) -> Self {
        self.return_path = Some(address.into());
        self
    }

    /// Adds an extra header to the rendered MIME. `From` and `Date` here
    /// override the generated values.
    ///
    /// # Errors
    ///
    /// Returns [`SesError::Message`] if the name is empty or contains `:`,
    /// whitespace or control characters, or if the value contains a line break.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        validate_header_name(&name)?;
        reject_line_breaks(&name, &value)?;
        self.headers.push((name, value));
        Ok(self)
    }

    /// Checks every value that ends up in a header line.
    ///
    /// Addresses are added without checks, so this runs before the message is
    /// rendered or sent.
    pub fn validate(&self) -> Result<()> {
        reject_line_breaks("sender", &self.from)?;
        reject_line_breaks("subject", &self.subject)?;
        let addresses = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .chain(&self.reply_to)
            .chain(&self.return_path);
        for address in addresses {
            reject_line_breaks("address", address)?;
        }
        for (name, value) in &self.headers {
            validate_header_name(name)?;
            reject_line_breaks(name, value)?;
        }
        Ok(())
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn to_addresses(&self) -> &[String] {
        &self.to
    }

    pub fn cc_addresses(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc_addresses(&self) -> &[String] {
        &self.bcc
    }

    pub fn reply_to_addresses(&self) -> &[String] {
        &self.reply_to
    }

    pub fn return_path_address(&self) -> &str {
        self.return_path.as_deref().unwrap_or(&self.from)
    }

    /// All recipients: To, then Cc, then Bcc.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .collect()
    }

    /// Renders the message as MIME text, dated now.
    pub fn to_mime(&self) -> Result<String> {
        let now = Utc::now();
        let boundary = format!(
            "===============ses{:x}==",
            now.timestamp_nanos_opt().unwrap_or_default()
        );
        self.to_mime_at(now, &boundary)
    }

    /// Renders the message with a fixed date and multipart boundary.
    pub fn to_mime_at(&self, date: DateTime<Utc>, boundary: &str) -> Result<String> {
        self.validate()?;
        let mut out = String::new();
        let from = self
            .extra_header("From")
            .unwrap_or(self.from.as_str());

        push_header(&mut out, "Subject", &encode_header_value(&self.subject));
        push_header(&mut out, "From", from);
        if !self.to.is_empty() {
            push_header(&mut out, "To", &self.to.join(", "));
        }
        if !self.cc.is_empty() {
            push_header(&mut out, "Cc", &self.cc.join(", "));
        }
        if self.extra_header("Date").is_none() {
            push_header(&mut out, "Date", &date.to_rfc2822());
        }
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("From") {
                continue;
            }
            push_header(&mut out, name, value);
        }
        push_header(&mut out, "MIME-Version", "1.0");

        match &self.body {
            MessageBody::PlainText(text) => {
                push_text_part(&mut out, "text/plain", text);
            }
            MessageBody::MultipartAlternative { text, alternatives } => {
                push_header(
                    &mut out,
                    "Content-Type",
                    &format!("multipart/alternative; boundary=\"{}\"", boundary),
                );
                out.push_str("\r\n");
                out.push_str(&format!("--{}\r\n", boundary));
                push_text_part(&mut out, "text/plain", text);
                for alternative in alternatives {
                    out.push_str(&format!("--{}\r\n", boundary));
                    push_text_part(&mut out, &alternative.mime_type, &alternative.content);
                }
                out.push_str(&format!("--{}--\r\n", boundary));
            }
        }
        Ok(out)
    }

    fn extra_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

fn reject_line_breaks(field: &str, value: &str) -> Result<()> {
    if has_line_break(value) {
        return Err(SesError::Message(format!(
            "{} cannot contain line breaks: {:?}",
            field, value
        )));
    }
    Ok(())
}

fn validate_header_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b':');
    if !valid {
        return Err(SesError::Message(format!("invalid header name: {:?}", name)));
    }
    Ok(())
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

/// Content headers, blank line, then the base64 body wrapped at 76 columns.
fn push_text_part(out: &mut String, mime_type: &str, content: &str) {
    push_header(
        out,
        "Content-Type",
        &format!("{}; charset=\"{}\"", mime_type, CHARSET),
    );
    push_header(out, "Content-Transfer-Encoding", "base64");
    out.push_str("\r\n");
    let encoded = STANDARD.encode(content.as_bytes());
    for line in encoded.as_bytes().chunks(LINE_LENGTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?{}?b?{}?=", CHARSET, STANDARD.encode(value.as_bytes()))
    }
}
