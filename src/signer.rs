//! Request Signer Module
//!
//! Builds authenticated requests for the SES query API. The signature is the
//! legacy `AWS3-HTTPS` scheme: an HMAC-SHA256 of the `Date` header value, keyed
//! by the secret key and base64 encoded. Parameters and body are not covered
//! by the signature, so the request must travel over TLS to a trusted host.

use crate::error::{Result, SesError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Regional endpoint used when no host is given.
pub const DEFAULT_HOST: &str = "email.us-east-1.amazonaws.com";

/// RFC 1123 date, always in GMT.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const USER_AGENT: &str = concat!("ses-rs/", env!("CARGO_PKG_VERSION"));

/// Access key, secret key and host. Never mutated after construction.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    host: String,
}

impl Credentials {
    /// Creates credentials for the default regional endpoint.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        Self::with_host(access_key, secret_key, DEFAULT_HOST)
    }

    /// Creates credentials for an explicit host.
    ///
    /// # Errors
    ///
    /// Returns [`SesError::Config`] if the access key, secret key or host is empty.
    pub fn with_host(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();
        let host = host.into();
        if access_key.is_empty() {
            return Err(SesError::Config("access key cannot be empty".into()));
        }
        if secret_key.is_empty() {
            return Err(SesError::Config("secret key cannot be empty".into()));
        }
        if host.is_empty() {
            return Err(SesError::Config("host cannot be empty".into()));
        }
        Ok(Self {
            access_key,
            secret_key,
            host,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every remote operation this client knows, with its fixed HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    DeleteVerifiedEmailAddress,
    GetSendQuota,
    GetSendStatistics,
    ListVerifiedEmailAddresses,
    SendEmail,
    SendRawEmail,
    VerifyEmailAddress,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::DeleteVerifiedEmailAddress => "DeleteVerifiedEmailAddress",
            Action::GetSendQuota => "GetSendQuota",
            Action::GetSendStatistics => "GetSendStatistics",
            Action::ListVerifiedEmailAddresses => "ListVerifiedEmailAddresses",
            Action::SendEmail => "SendEmail",
            Action::SendRawEmail => "SendRawEmail",
            Action::VerifyEmailAddress => "VerifyEmailAddress",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Action::DeleteVerifiedEmailAddress => Method::Delete,
            Action::GetSendQuota
            | Action::GetSendStatistics
            | Action::ListVerifiedEmailAddresses
            | Action::VerifyEmailAddress => Method::Get,
            Action::SendEmail | Action::SendRawEmail => Method::Post,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulates parameters for one action before it is signed.
///
/// The timestamp is captured once, here, and reused verbatim for both the
/// `Date` header and the signature input.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    action: Action,
    date: String,
    params: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(action: Action) -> Self {
        Self::at(action, Utc::now())
    }

    /// Builds a request stamped with a fixed time.
    pub fn at(action: Action, timestamp: DateTime<Utc>) -> Self {
        Self {
            action,
            date: format_date(timestamp),
            params: vec![("Action".to_string(), action.name().to_string())],
        }
    }

    /// Sets a parameter. A repeated key keeps its original position but takes the new value.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Flattens a list into `{prefix}.member.1 .. {prefix}.member.N` in input order.
    /// An empty list adds nothing.
    pub fn members<I, S>(self, prefix: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .enumerate()
            .fold(self, |builder, (i, value)| {
                builder.param(format!("{}.member.{}", prefix, i + 1), value)
            })
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Freezes the builder into a transport-ready request.
    ///
    /// GET and DELETE carry the parameters in the query string of `endpoint`;
    /// POST carries them as a form-encoded body.
    pub fn sign(self, credentials: &Credentials, endpoint: &str) -> Result<SignedRequest> {
        let method = self.action.method();
        let signature = signature(&credentials.secret_key, &self.date)?;
        let encoded = encode_params(&self.params);

        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Date".to_string(), self.date.clone()),
            ("Host".to_string(), credentials.host.clone()),
            (
                "X-Amzn-Authorization".to_string(),
                authorization_header(&credentials.access_key, &signature),
            ),
        ];

        let (url, body) = match method {
            Method::Post => {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                (endpoint.to_string(), Some(encoded))
            }
            Method::Get | Method::Delete => (format!("{}?{}", endpoint, encoded), None),
        };

        Ok(SignedRequest {
            action: self.action,
            method,
            url,
            headers,
            body,
        })
    }
}

/// A signed request ready to hand to a [`crate::transport::Transport`].
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub action: Action,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl SignedRequest {
    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Formats a timestamp the way the `Date` header expects it.
pub fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

/// Base64 HMAC-SHA256 of `date`, keyed by `secret_key`.
pub fn signature(secret_key: &str, date: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| SesError::Config(format!("unusable secret key: {}", e)))?;
    mac.update(date.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Value of the `X-Amzn-Authorization` header.
pub fn authorization_header(access_key: &str, signature: &str) -> String {
    format!(
        "AWS3-HTTPS AWSAccessKeyId={},Algorithm=HmacSHA256,Signature={}",
        access_key, signature
    )
}

/// `application/x-www-form-urlencoded` serialization, in parameter order.
pub fn encode_params(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 6, 27, 1, 49, 0).unwrap()
    }

    fn test_credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret").unwrap()
    }

    fn decode(encoded: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect()
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(matches!(Credentials::new("", "secret"), Err(SesError::Config(_))));
        assert!(matches!(Credentials::new("key", ""), Err(SesError::Config(_))));
        assert!(matches!(
            Credentials::with_host("key", "secret", ""),
            Err(SesError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_credentials());
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_date_format() {
        assert_eq!(format_date(fixed_time()), "Mon, 27 Jun 2011 01:49:00 GMT");
    }

    #[test]
    fn test_signature_known_value() {
        assert_eq!(
            signature("secret", "Mon, 27 Jun 2011 01:49:00 GMT").unwrap(),
            "0EUQIXEEGcCwqRYtlAoFvFqoSDS8XqV6e4GY51Rfy8U="
        );
        assert_eq!(
            signature(
                "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
                "Tue, 28 Jun 2011 10:00:00 GMT"
            )
            .unwrap(),
            "9y67Cwb8nhsEsEbENf0a4uVMLmi5Uxx0xiV/QO/rInI="
        );
    }

    #[test]
    fn test_signature_deterministic() {
        let date = "Mon, 27 Jun 2011 01:49:00 GMT";
        let first = signature("secret", date).unwrap();
        assert_eq!(first, signature("secret", date).unwrap());
        assert_ne!(first, signature("other-secret", date).unwrap());
        assert_ne!(first, signature("secret", "Mon, 27 Jun 2011 01:49:01 GMT").unwrap());
        assert!(!first.ends_with('\n'));
    }

    #[test]
    fn test_authorization_header_layout() {
        let request = RequestBuilder::at(Action::GetSendQuota, fixed_time())
            .sign(&test_credentials(), "https://email.us-east-1.amazonaws.com/")
            .unwrap();
        assert_eq!(
            request.header("x-amzn-authorization"),
            Some(
                "AWS3-HTTPS AWSAccessKeyId=AKIDEXAMPLE,Algorithm=HmacSHA256,\
                 Signature=0EUQIXEEGcCwqRYtlAoFvFqoSDS8XqV6e4GY51Rfy8U="
            )
        );
        assert_eq!(request.header("Host"), Some(DEFAULT_HOST));
    }

    #[test]
    fn test_date_header_matches_signed_string() {
        let credentials = test_credentials();
        let builder = RequestBuilder::new(Action::GetSendQuota);
        let date = builder.date().to_string();
        let request = builder.sign(&credentials, "https://host/").unwrap();
        assert_eq!(request.header("Date"), Some(date.as_str()));
        let expected = authorization_header("AKIDEXAMPLE", &signature("secret", &date).unwrap());
        assert_eq!(request.header("X-Amzn-Authorization"), Some(expected.as_str()));
    }

    #[test]
    fn test_get_puts_params_in_query() {
        let request = RequestBuilder::at(Action::VerifyEmailAddress, fixed_time())
            .param("EmailAddress", "user+tag@example.com")
            .sign(&test_credentials(), "https://email.us-east-1.amazonaws.com/")
            .unwrap();
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
        assert_eq!(
            request.url,
            "https://email.us-east-1.amazonaws.com/?Action=VerifyEmailAddress&EmailAddress=user%2Btag%40example.com"
        );
    }

    #[test]
    fn test_delete_puts_params_in_query() {
        let request = RequestBuilder::at(Action::DeleteVerifiedEmailAddress, fixed_time())
            .param("EmailAddress", "a@example.com")
            .sign(&test_credentials(), "https://host/")
            .unwrap();
        assert_eq!(request.method, Method::Delete);
        assert!(request.url.starts_with("https://host/?Action=DeleteVerifiedEmailAddress"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_post_puts_params_in_body() {
        let request = RequestBuilder::at(Action::SendRawEmail, fixed_time())
            .param("Source", "from@example.com")
            .sign(&test_credentials(), "https://host/")
            .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://host/");
        assert_eq!(
            request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        let body = request.body.unwrap();
        assert_eq!(
            decode(&body),
            vec![
                ("Action".to_string(), "SendRawEmail".to_string()),
                ("Source".to_string(), "from@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_last_write_wins() {
        let builder = RequestBuilder::at(Action::VerifyEmailAddress, fixed_time())
            .param("EmailAddress", "first@example.com")
            .param("EmailAddress", "second@example.com");
        assert_eq!(
            builder.params(),
            &[
                ("Action".to_string(), "VerifyEmailAddress".to_string()),
                ("EmailAddress".to_string(), "second@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_encoding_round_trip() {
        let builder = RequestBuilder::at(Action::SendEmail, fixed_time())
            .param("Message.Subject.Data", "Héllo & welcome = 100% ?")
            .param("Message.Body.Text.Data", "line one\nline two\t+ tabs")
            .param("Source", "Name <from@example.com>");
        let encoded = encode_params(builder.params());
        assert_eq!(decode(&encoded), builder.params().to_vec());
    }

    #[test]
    fn test_members_are_one_indexed_in_order() {
        let recipients = ["c@example.com", "a@example.com", "b@example.com"];
        let builder = RequestBuilder::at(Action::SendRawEmail, fixed_time())
            .members("Destinations", recipients);
        let keys: Vec<&str> = builder.params()[1..].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Destinations.member.1",
                "Destinations.member.2",
                "Destinations.member.3"
            ]
        );
        let values: Vec<&str> = builder.params()[1..].iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, recipients.to_vec());
    }

    #[test]
    fn test_empty_members_add_nothing() {
        let builder = RequestBuilder::at(Action::SendEmail, fixed_time())
            .members("Destination.CcAddresses", Vec::<String>::new());
        assert_eq!(builder.params().len(), 1);
    }

    #[test]
    fn test_action_table() {
        assert_eq!(Action::DeleteVerifiedEmailAddress.method(), Method::Delete);
        assert_eq!(Action::GetSendQuota.method(), Method::Get);
        assert_eq!(Action::GetSendStatistics.method(), Method::Get);
        assert_eq!(Action::ListVerifiedEmailAddresses.method(), Method::Get);
        assert_eq!(Action::VerifyEmailAddress.method(), Method::Get);
        assert_eq!(Action::SendEmail.method(), Method::Post);
        assert_eq!(Action::SendRawEmail.method(), Method::Post);
        assert_eq!(Action::SendRawEmail.to_string(), "SendRawEmail");
    }
}
