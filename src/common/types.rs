use serde::{Deserialize, Serialize};
use std::fmt;

// Garmin weight-service `dateRange` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyComposition {
    #[serde(default)]
    pub date_weight_list: Vec<WeightRecord>,
}

/// One scale measurement as Garmin reports it.
///
/// `date` is epoch milliseconds, `weight` and `muscle_mass` are grams and
/// `body_fat` is a percentage. Any of them can be `null` for partial
/// measurements (e.g. a manual weight entry without impedance data).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRecord {
    pub sample_pk: Option<i64>,
    pub date: Option<i64>,
    pub calendar_date: Option<String>,
    pub weight: Option<f64>,
    pub body_fat: Option<f64>,
    pub muscle_mass: Option<f64>,
}

// Libra `PUT /values/weight/{date}` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub weight: f64,
    pub body_fat: f64,
    pub muscle_mass: f64,
    pub log: String,
}

// Libra `GET /values/weight/latest` body
#[derive(Debug, Deserialize)]
pub struct LatestWeight {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConsumer {
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    pub mfa_token: Option<String>,
    pub mfa_expiration_timestamp: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub scope: String,
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: i64,
    pub refresh_token_expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires_at: i64,
}

impl OAuth2Token {
    /// Fill in the absolute expiry timestamps from the relative `*_in` fields.
    pub fn set_expirations(&mut self, now: i64) {
        self.expires_at = now + self.expires_in;
        self.refresh_token_expires_at = now + self.refresh_token_expires_in;
    }

    pub fn expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Both halves of a Garmin session, as kept in the token store.
#[derive(Debug, Clone)]
pub struct GarminTokens {
    pub oauth1: OAuth1Token,
    pub oauth2: OAuth2Token,
}

#[derive(Debug)]
pub enum GarminError {
    Http(reqwest::StatusCode),
    Network(reqwest::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Authentication(String),
    MfaRequired,
    NotAuthenticated,
}

impl fmt::Display for GarminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GarminError::Http(status) => write!(f, "HTTP {status}"),
            GarminError::Network(err) => write!(f, "Network error: {err}"),
            GarminError::Io(err) => write!(f, "IO error: {err}"),
            GarminError::Serialization(err) => write!(f, "Serialization error: {err}"),
            GarminError::Authentication(msg) => write!(f, "Authentication error: {msg}"),
            GarminError::MfaRequired => {
                write!(f, "Account requires multi-factor authentication, which is not supported")
            }
            GarminError::NotAuthenticated => write!(f, "No Garmin session established"),
        }
    }
}

impl std::error::Error for GarminError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GarminError::Network(err) => Some(err),
            GarminError::Io(err) => Some(err),
            GarminError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GarminError {
    fn from(err: std::io::Error) -> Self {
        GarminError::Io(err)
    }
}

impl From<serde_json::Error> for GarminError {
    fn from(err: serde_json::Error) -> Self {
        GarminError::Serialization(err)
    }
}

impl From<reqwest::Error> for GarminError {
    fn from(err: reqwest::Error) -> Self {
        GarminError::Network(err)
    }
}
