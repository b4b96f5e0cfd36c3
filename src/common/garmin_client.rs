use crate::common::oauth1::{OAuth1Signer, parse_form};
use crate::common::sso;
use crate::common::token_store::TokenStore;
use crate::common::types::{
    BodyComposition, GarminError, GarminTokens, OAuth1Token, OAuth2Token, OAuthConsumer,
};
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use tracing::{debug, info, warn};

pub const DEFAULT_DOMAIN: &str = "garmin.com";

const OAUTH_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";
const SSO_USER_AGENT: &str = "GCM-iOS-5.7.2.1";
const MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

pub struct GarminClient {
    client: Client,
    domain: String,
    tokens: Option<GarminTokens>,
}

impl GarminClient {
    pub fn new(domain: &str) -> Result<Self, GarminError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(SSO_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            domain: domain.to_string(),
            tokens: None,
        })
    }

    pub fn tokens(&self) -> Option<&GarminTokens> {
        self.tokens.as_ref()
    }

    /// Resume a saved session: load it, re-exchange an expired OAuth2 token,
    /// then check the session against the profile endpoint.
    pub async fn resume(&mut self, store: &TokenStore) -> Result<(), GarminError> {
        let mut tokens = store.load()?;

        if tokens.oauth2.expired(Utc::now().timestamp()) {
            info!("Stored Garmin OAuth2 token expired, exchanging OAuth1 token");
            tokens.oauth2 = self.exchange(&tokens.oauth1).await?;
            save_refreshed(store, &tokens);
        }

        let path = format!("{}/userprofile-service/socialProfile", self.connectapi());
        let response = self
            .client
            .get(path)
            .header(AUTHORIZATION, tokens.oauth2.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GarminError::Http(status));
        }

        self.tokens = Some(tokens);
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), GarminError> {
        let ticket = sso::sign_in(&self.client, &self.domain, email, password).await?;
        debug!("Obtained Garmin SSO ticket");

        let consumer = self.fetch_consumer().await?;
        let oauth1 = self.preauthorized(&ticket, &consumer).await?;
        let oauth2 = self.exchange_with(&oauth1, &consumer).await?;

        self.tokens = Some(GarminTokens { oauth1, oauth2 });
        Ok(())
    }

    pub async fn fetch_body_composition(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BodyComposition, GarminError> {
        let tokens = self.tokens.as_ref().ok_or(GarminError::NotAuthenticated)?;
        let path = format!("{}/weight-service/weight/dateRange", self.connectapi());

        let response = self
            .client
            .get(path)
            .query(&[
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
            ])
            .header(AUTHORIZATION, tokens.oauth2.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GarminError::Http(status));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_consumer(&self) -> Result<OAuthConsumer, GarminError> {
        let consumer = self
            .client
            .get(OAUTH_CONSUMER_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(consumer)
    }

    async fn preauthorized(
        &self,
        ticket: &str,
        consumer: &OAuthConsumer,
    ) -> Result<OAuth1Token, GarminError> {
        let base_url = format!("{}/oauth-service/oauth/preauthorized", self.connectapi());
        let login_url = format!("https://sso.{}/sso/embed", self.domain);
        let params = [
            ("ticket", ticket),
            ("login-url", login_url.as_str()),
            ("accepts-mfa-tokens", "true"),
        ];

        let auth_header =
            OAuth1Signer::new(consumer).authorization_header("GET", &base_url, &params)?;

        let response = self
            .client
            .get(&base_url)
            .query(&params)
            .header(AUTHORIZATION, auth_header)
            .header(USER_AGENT, MOBILE_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GarminError::Http(status));
        }

        let body = response.text().await?;
        oauth1_token_from_form(&body, &self.domain)
    }

    async fn exchange(&self, oauth1: &OAuth1Token) -> Result<OAuth2Token, GarminError> {
        let consumer = self.fetch_consumer().await?;
        self.exchange_with(oauth1, &consumer).await
    }

    async fn exchange_with(
        &self,
        oauth1: &OAuth1Token,
        consumer: &OAuthConsumer,
    ) -> Result<OAuth2Token, GarminError> {
        let url = format!("{}/oauth-service/oauth/exchange/user/2.0", self.connectapi());
        let form: Vec<(&str, &str)> = oauth1
            .mfa_token
            .as_deref()
            .map(|mfa_token| vec![("mfa_token", mfa_token)])
            .unwrap_or_default();

        let auth_header = OAuth1Signer::new(consumer)
            .with_token(oauth1)
            .authorization_header("POST", &url, &form)?;

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, auth_header)
            .header(USER_AGENT, MOBILE_USER_AGENT)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GarminError::Http(status));
        }

        let body = response.text().await?;
        let mut token: OAuth2Token = serde_json::from_str(&body)?;
        token.set_expirations(Utc::now().timestamp());
        Ok(token)
    }

    fn connectapi(&self) -> String {
        format!("https://connectapi.{}", self.domain)
    }
}

/// Persist re-exchanged tokens. The refreshed session stays usable for this
/// run even when the store cannot be written.
fn save_refreshed(store: &TokenStore, tokens: &GarminTokens) -> bool {
    match store.save(tokens) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Failed to save refreshed Garmin session to {}: {}",
                store.path().display(),
                e
            );
            false
        }
    }
}

fn oauth1_token_from_form(body: &str, domain: &str) -> Result<OAuth1Token, GarminError> {
    let mut oauth_token = None;
    let mut oauth_token_secret = None;
    let mut mfa_token = None;

    for (key, value) in parse_form(body) {
        match key.as_str() {
            "oauth_token" => oauth_token = Some(value),
            "oauth_token_secret" => oauth_token_secret = Some(value),
            "mfa_token" if !value.is_empty() => mfa_token = Some(value),
            _ => {}
        }
    }

    match (oauth_token, oauth_token_secret) {
        (Some(oauth_token), Some(oauth_token_secret)) => Ok(OAuth1Token {
            oauth_token,
            oauth_token_secret,
            mfa_token,
            mfa_expiration_timestamp: None,
            domain: Some(domain.to_string()),
        }),
        _ => Err(GarminError::Authentication(
            "Preauthorized response is missing the OAuth1 token".to_string(),
        )),
    }
}
