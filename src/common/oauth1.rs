//! OAuth 1.0a request signing (HMAC-SHA1), as required by Garmin's
//! `oauth-service` endpoints.

use crate::common::types::{GarminError, OAuth1Token, OAuthConsumer};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub struct OAuth1Signer<'a> {
    consumer: &'a OAuthConsumer,
    token: Option<&'a OAuth1Token>,
}

impl<'a> OAuth1Signer<'a> {
    pub fn new(consumer: &'a OAuthConsumer) -> Self {
        Self {
            consumer,
            token: None,
        }
    }

    pub fn with_token(mut self, token: &'a OAuth1Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Build the `Authorization` header for a request.
    ///
    /// `base_url` must not carry a query string; query and form parameters go
    /// in `params` (decoded) so they take part in the signature.
    pub fn authorization_header(
        &self,
        method: &str,
        base_url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, GarminError> {
        let nonce: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        self.authorization_header_with(method, base_url, params, &nonce, &timestamp)
    }

    pub fn authorization_header_with(
        &self,
        method: &str,
        base_url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, GarminError> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_version", "1.0"),
        ];
        if let Some(token) = self.token {
            oauth_params.push(("oauth_token", token.oauth_token.as_str()));
        }

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.extend(oauth_params.iter().copied());

        let signature = self.signature(method, base_url, &all_params)?;

        let mut header_params: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        header_params.push(format!("oauth_signature=\"{}\"", encode(&signature)));

        Ok(format!("OAuth {}", header_params.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        base_url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, GarminError> {
        let base_string = signature_base_string(method, base_url, params);
        let key = format!(
            "{}&{}",
            encode(&self.consumer.consumer_secret),
            encode(self.token.map_or("", |t| t.oauth_token_secret.as_str()))
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| GarminError::Authentication(format!("Invalid signing key: {e}")))?;
        mac.update(base_string.as_bytes());

        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn signature_base_string(method: &str, base_url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url),
        encode(&normalized)
    )
}

// RFC 3986 unreserved set, uppercase hex
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Parse an `application/x-www-form-urlencoded` response body.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    body.trim()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}
