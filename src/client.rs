//! Client Module
//!
//! `SimpleEmailService` issues one signed request per action and decodes the
//! reply. A 200 status is decoded with the action's result schema; anything
//! else is decoded as a fault and returned as [`SesError::Service`]. There are
//! no retries: each call has exactly one outcome.

use crate::error::{Result, SesError};
use crate::message::{Message, CHARSET};
use crate::models::{
    ResponseMetadata, SendQuota, SendResult, SendStatistics, VerifiedEmailAddresses,
};
use crate::signer::{Action, Credentials, RequestBuilder};
use crate::transport::{ReqwestTransport, Transport};
use crate::xml_parser;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;

/// Timeout used by [`SimpleEmailService::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SimpleEmailService<T = ReqwestTransport> {
    credentials: Credentials,
    endpoint: String,
    transport: T,
}

impl SimpleEmailService<ReqwestTransport> {
    /// Creates a client for the default host.
    ///
    /// # Errors
    ///
    /// Returns [`SesError::Config`] if either key is empty.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        Self::with_credentials(Credentials::new(access_key, secret_key)?, DEFAULT_TIMEOUT)
    }

    /// Creates a client backed by a `reqwest` transport with the given timeout.
    pub fn with_credentials(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self::with_transport(credentials, ReqwestTransport::new(timeout)?))
    }
}

impl<T: Transport> SimpleEmailService<T> {
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        let endpoint = format!("https://{}/", credentials.host());
        Self {
            credentials,
            endpoint,
            transport,
        }
    }

    /// Sends requests to `endpoint` instead of `https://{host}/`.
    /// The `Host` header still carries the configured host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Removes an address from the verified list.
    pub fn delete_verified_email_address(&self, email_address: &str) -> Result<ResponseMetadata> {
        require("EmailAddress", email_address)?;
        let request = RequestBuilder::new(Action::DeleteVerifiedEmailAddress)
            .param("EmailAddress", email_address);
        self.call(request, xml_parser::parse_response_metadata)
    }

    /// Returns the current sending limits.
    pub fn get_send_quota(&self) -> Result<SendQuota> {
        self.call(
            RequestBuilder::new(Action::GetSendQuota),
            xml_parser::parse_send_quota,
        )
    }

    /// Returns the data points covering the last two weeks of sending.
    pub fn get_send_statistics(&self) -> Result<SendStatistics> {
        self.call(
            RequestBuilder::new(Action::GetSendStatistics),
            xml_parser::parse_send_statistics,
        )
    }

    pub fn list_verified_email_addresses(&self) -> Result<VerifiedEmailAddresses> {
        self.call(
            RequestBuilder::new(Action::ListVerifiedEmailAddresses),
            xml_parser::parse_verified_email_addresses,
        )
    }

    /// Sends a confirmation mail to `email_address` so it can become a verified sender.
    pub fn verify_email_address(&self, email_address: &str) -> Result<ResponseMetadata> {
        require("EmailAddress", email_address)?;
        let request =
            RequestBuilder::new(Action::VerifyEmailAddress).param("EmailAddress", email_address);
        self.call(request, xml_parser::parse_response_metadata)
    }

    /// Composes and queues `message` through `SendEmail`.
    pub fn send_email(&self, message: &Message) -> Result<SendResult> {
        self.call(send_email_request(RequestBuilder::new(Action::SendEmail), message)?, |xml| {
            xml_parser::parse_send_result(xml, "SendEmailResult")
        })
    }

    /// Sends an already-rendered MIME message to `destinations`.
    pub fn send_raw_email<S: AsRef<str>>(
        &self,
        source: &str,
        destinations: &[S],
        raw_message: &str,
    ) -> Result<SendResult> {
        let request = send_raw_email_request(
            RequestBuilder::new(Action::SendRawEmail),
            source,
            destinations,
            raw_message,
        )?;
        self.call(request, |xml| {
            xml_parser::parse_send_result(xml, "SendRawEmailResult")
        })
    }

    /// Renders `message` to MIME and sends it to all of its recipients.
    pub fn send_raw_message(&self, message: &Message) -> Result<SendResult> {
        self.send_raw_email(
            message.from_address(),
            &message.recipients(),
            &message.to_mime()?,
        )
    }

    fn call<R, F>(&self, builder: RequestBuilder, decode: F) -> Result<R>
    where
        F: FnOnce(&str) -> Result<R>,
    {
        let action = builder.action();
        let request = builder.sign(&self.credentials, &self.endpoint)?;
        log::debug!("Issuing {} {} to {}", request.method, action, self.endpoint);

        let response = self.transport.execute(&request)?;
        log::debug!("{} returned HTTP {}", action, response.status);

        if response.status == 200 {
            return decode(&response.body);
        }

        let fault = xml_parser::parse_error_response(&response.body).map_err(|e| {
            log::warn!(
                "{} failed with HTTP {} and an unreadable fault document",
                action,
                response.status
            );
            e
        })?;
        log::warn!(
            "{} rejected with HTTP {}: {} ({}), request id {}",
            action,
            response.status,
            fault.code,
            fault.fault_type,
            fault.request_id
        );
        Err(SesError::Service {
            status: response.status,
            body: response.body,
            fault,
        })
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SesError::InvalidParameter(format!("{} cannot be empty", name)));
    }
    Ok(())
}

/// Adds the `SendEmail` parameters for `message` to `builder`.
pub fn send_email_request(builder: RequestBuilder, message: &Message) -> Result<RequestBuilder> {
    message.validate()?;
    if message.recipients().is_empty() {
        return Err(SesError::InvalidParameter(
            "at least one To, Cc or Bcc address is required".into(),
        ));
    }
    let builder = builder
        .members("Destination.ToAddresses", message.to_addresses())
        .members("Destination.CcAddresses", message.cc_addresses())
        .members("Destination.BccAddresses", message.bcc_addresses())
        .members("ReplyToAddresses", message.reply_to_addresses())
        .param("Source", message.from_address())
        .param("ReturnPath", message.return_path_address())
        .param("Message.Subject.Data", message.subject())
        .param("Message.Subject.Charset", CHARSET)
        .param("Message.Body.Text.Data", message.body().text())
        .param("Message.Body.Text.Charset", CHARSET);
    Ok(match message.body().html() {
        Some(html) => builder
            .param("Message.Body.Html.Data", html)
            .param("Message.Body.Html.Charset", CHARSET),
        None => builder,
    })
}

/// Adds the `SendRawEmail` parameters to `builder`. The raw text is sent base64 encoded.
pub fn send_raw_email_request<S: AsRef<str>>(
    builder: RequestBuilder,
    source: &str,
    destinations: &[S],
    raw_message: &str,
) -> Result<RequestBuilder> {
    require("Source", source)?;
    require("RawMessage.Data", raw_message)?;
    if destinations.is_empty() {
        return Err(SesError::InvalidParameter(
            "at least one destination is required".into(),
        ));
    }
    Ok(builder
        .param("Source", source)
        .param("RawMessage.Data", STANDARD.encode(raw_message.as_bytes()))
        .members("Destinations", destinations.iter().map(|d| d.as_ref())))
}
