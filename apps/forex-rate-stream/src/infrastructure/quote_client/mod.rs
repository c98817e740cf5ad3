//! HTTP Quote Client
//!
//! Implements `QuoteSource` against the forex REST service:
//!
//! ```text
//! GET {base_url}/rates?pair=USDJPY
//! token: <api token>
//! ```
//!
//! A 200 response carries a JSON array of quote records; the first record
//! is the answer. Status codes map onto [`QuoteError`]:
//!
//! | Status | Error |
//! |--------|-------|
//! | 200, empty array | `NoData` |
//! | 200, undecodable body | `InvalidResponse` |
//! | 429 | `QuotaExceeded` |
//! | 500-599 | `ServiceUnavailable` |
//! | anything else, transport failure, timeout | `ConnectionFailed` |

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::application::ports::{QuoteError, QuoteSource};
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;
use crate::infrastructure::config::QuoteServiceSettings;

/// Request header carrying the API token.
const TOKEN_HEADER: &str = "token";

/// Quote service client over HTTP.
pub struct HttpQuoteClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpQuoteClient {
    /// Create a client for the configured service.
    ///
    /// Missing base URL or token do not fail construction; requests then
    /// fail with `InvalidUrl` or are rejected by the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(settings: &QuoteServiceSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone().unwrap_or_default(),
            token: settings.token.expose().unwrap_or_default().to_string(),
        })
    }

    /// Build the request URL for an instrument.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the base URL is empty or malformed.
    pub fn request_url(&self, instrument: Instrument) -> Result<reqwest::Url, QuoteError> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = reqwest::Url::parse(&format!("{base}/rates"))
            .map_err(|_| QuoteError::InvalidUrl)?;
        url.query_pairs_mut()
            .append_pair("pair", &instrument.api_symbol());
        Ok(url)
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteClient {
    async fn fetch(&self, instrument: Instrument) -> Result<Quote, QuoteError> {
        let url = self.request_url(instrument)?;

        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if let Err(e) = classify_status(status) {
            tracing::debug!(%instrument, status = status.as_u16(), "Quote service rejected request");
            return Err(e);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(&e))?;

        decode_quotes(&body)
    }
}

impl std::fmt::Debug for HttpQuoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQuoteClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Map a response status to the request outcome.
///
/// # Errors
///
/// Returns the error kind for every status other than 200.
pub fn classify_status(status: StatusCode) -> Result<(), QuoteError> {
    match status.as_u16() {
        200 => Ok(()),
        429 => Err(QuoteError::QuotaExceeded),
        500..=599 => Err(QuoteError::ServiceUnavailable),
        _ => Err(QuoteError::ConnectionFailed),
    }
}

/// Decode a 200 response body into its first quote record.
///
/// # Errors
///
/// Returns `InvalidResponse` if the body is not an array of quote records,
/// or `NoData` if the array is empty.
pub fn decode_quotes(body: &[u8]) -> Result<Quote, QuoteError> {
    let quotes: Vec<Quote> = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Quote response did not decode");
        QuoteError::InvalidResponse
    })?;
    quotes.into_iter().next().ok_or(QuoteError::NoData)
}

fn map_transport_error(e: &reqwest::Error) -> QuoteError {
    if e.is_builder() || e.is_decode() {
        QuoteError::Unknown(e.to_string())
    } else {
        QuoteError::ConnectionFailed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_case::test_case;

    use super::*;
    use crate::infrastructure::config::ApiToken;

    fn client(base_url: Option<&str>) -> HttpQuoteClient {
        HttpQuoteClient::new(&QuoteServiceSettings {
            base_url: base_url.map(str::to_string),
            token: ApiToken::new(Some("secret".to_string())),
            request_timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[test_case(200 => Ok(()); "ok")]
    #[test_case(429 => Err(QuoteError::QuotaExceeded); "quota")]
    #[test_case(500 => Err(QuoteError::ServiceUnavailable); "internal error")]
    #[test_case(503 => Err(QuoteError::ServiceUnavailable); "unavailable")]
    #[test_case(599 => Err(QuoteError::ServiceUnavailable); "upper server range")]
    #[test_case(401 => Err(QuoteError::ConnectionFailed); "unauthorized")]
    #[test_case(403 => Err(QuoteError::ConnectionFailed); "forbidden")]
    #[test_case(404 => Err(QuoteError::ConnectionFailed); "not found")]
    #[test_case(204 => Err(QuoteError::ConnectionFailed); "no content")]
    fn status_mapping(code: u16) -> Result<(), QuoteError> {
        classify_status(StatusCode::from_u16(code).unwrap())
    }

    #[test]
    fn decode_takes_first_record() {
        let body = br#"[
            {"from":"USD","to":"JPY","bid":149.50,"ask":149.52,"price":149.51,"time_stamp":"2025-09-13T03:00:00Z"},
            {"from":"USD","to":"JPY","bid":150.00,"ask":150.02,"price":150.01,"time_stamp":"2025-09-13T03:00:05Z"}
        ]"#;
        let quote = decode_quotes(body).unwrap();
        assert_eq!(quote.timestamp, "2025-09-13T03:00:00Z");
    }

    #[test]
    fn decode_empty_array_is_no_data() {
        assert_eq!(decode_quotes(b"[]"), Err(QuoteError::NoData));
    }

    #[test]
    fn decode_garbage_is_invalid_response() {
        assert_eq!(decode_quotes(b"<html>"), Err(QuoteError::InvalidResponse));
        assert_eq!(
            decode_quotes(br#"{"from":"USD"}"#),
            Err(QuoteError::InvalidResponse)
        );
    }

    #[test]
    fn request_url_carries_pair_symbol() {
        let url = client(Some("https://forex.example.com/")).request_url(Instrument::UsdJpy);
        assert_eq!(
            url.unwrap().as_str(),
            "https://forex.example.com/rates?pair=USDJPY"
        );
    }

    #[test]
    fn empty_base_url_is_invalid() {
        assert_eq!(
            client(None).request_url(Instrument::EurUsd),
            Err(QuoteError::InvalidUrl)
        );
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", client(Some("https://forex.example.com")));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
