/// Security tests for the SES client.
///
/// This module verifies that the response decoder and credential handling are
/// protected against common problems:
/// - XML External Entity (XXE) Injection in reply documents
/// - Billion Laughs (recursive XML entity) attacks
/// - Excessively nested documents
/// - Secret keys leaking through `Debug` output
use std::time::Instant;

#[cfg(test)]
mod tests {
    use super::*;
    use ses::xml_parser::{parse_error_response, parse_response_metadata};
    use ses::{Config, Credentials};

    const MAX_PROCESSING_TIME_MS: u128 = 2000; // 2 seconds for test

    /// Test protection against XXE (XML External Entity Injection).
    #[test]
    fn test_xxe_protection() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE foo [
            <!ENTITY xxe SYSTEM "file:///etc/passwd">
        ]>
        <ErrorResponse>
            <Error><Type>Sender</Type><Code>&xxe;</Code><Message>m</Message></Error>
            <RequestId>r-1</RequestId>
        </ErrorResponse>
        "#;
        let result = parse_error_response(xml);
        assert!(result.is_err(), "Documents with a DOCTYPE must be rejected");
    }

    /// Test protection against the Billion Laughs attack (recursive XML entities).
    #[test]
    fn test_billion_laughs_protection() {
        let xml = r#"<?xml version="1.0"?>
        <!DOCTYPE lolz [
            <!ENTITY lol "lol">
            <!ENTITY lol2 "&lol;&lol;">
            <!ENTITY lol3 "&lol2;&lol2;">
            <!ENTITY lol4 "&lol3;&lol3;">
            <!ENTITY lol5 "&lol4;&lol4;">
            <!ENTITY lol6 "&lol5;&lol5;">
            <!ENTITY lol7 "&lol6;&lol6;">
            <!ENTITY lol8 "&lol7;&lol7;">
            <!ENTITY lol9 "&lol8;&lol8;">
        ]>
        <VerifyEmailAddressResponse>
            <ResponseMetadata><RequestId>&lol9;</RequestId></ResponseMetadata>
        </VerifyEmailAddressResponse>
        "#;
        let start = Instant::now();
        let result = parse_response_metadata(xml);
        let duration = start.elapsed();
        assert!(
            duration.as_millis() < MAX_PROCESSING_TIME_MS,
            "XML Billion Laughs was not blocked in time"
        );
        assert!(result.is_err(), "Parser should reject recursive entities");
    }

    /// Deeply nested replies are refused rather than walked.
    #[test]
    fn test_nesting_limit() {
        let depth = 10_000;
        let xml = format!("{}{}", "<x>".repeat(depth), "</x>".repeat(depth));
        assert!(parse_response_metadata(&xml).is_err());
    }

    /// The secret key never appears in debug output.
    #[test]
    fn test_secret_not_in_debug_output() {
        let secret = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";
        let credentials = Credentials::new("AKIDEXAMPLE", secret).unwrap();
        assert!(!format!("{:?}", credentials).contains(secret));

        let config = Config::from_lookup(|key| match key {
            "SES_ACCESS_KEY_ID" => Some("AKIDEXAMPLE".to_string()),
            "SES_SECRET_ACCESS_KEY" => Some(secret.to_string()),
            _ => None,
        })
        .unwrap();
        assert!(!format!("{:?}", config).contains(secret));
    }
}
