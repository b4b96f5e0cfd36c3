use anyhow::{Context, Result};
use garmin_libra_sync::common::garmin_client::GarminClient;
use garmin_libra_sync::common::token_store::TokenStore;
use garmin_libra_sync::common::types::{GarminError, GarminTokens};
use tracing::{info, warn};

/// Anything that can hold a Garmin session.
pub trait GarminSession {
    async fn resume(&mut self, store: &TokenStore) -> Result<(), GarminError>;
    async fn login(&mut self, email: &str, password: &str) -> Result<(), GarminError>;
    fn tokens(&self) -> Option<&GarminTokens>;
}

impl GarminSession for GarminClient {
    async fn resume(&mut self, store: &TokenStore) -> Result<(), GarminError> {
        GarminClient::resume(self, store).await
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<(), GarminError> {
        GarminClient::login(self, email, password).await
    }

    fn tokens(&self) -> Option<&GarminTokens> {
        GarminClient::tokens(self)
    }
}

/// Resume the saved session, or log in with credentials and save the new one.
pub async fn bootstrap<S: GarminSession>(
    session: &mut S,
    store: &TokenStore,
    email: &str,
    password: &str,
) -> Result<()> {
    match session.resume(store).await {
        Ok(()) => {
            info!("Resumed Garmin session from {}", store.path().display());
            return Ok(());
        }
        Err(e) => warn!("Could not resume Garmin session: {}, logging in", e),
    }

    session
        .login(email, password)
        .await
        .context("Garmin login failed")?;
    info!("Logged in to Garmin Connect");

    if let Some(tokens) = session.tokens() {
        match store.save(tokens) {
            Ok(()) => info!("Saved Garmin session to {}", store.path().display()),
            Err(e) => warn!(
                "Failed to save Garmin session to {}: {}",
                store.path().display(),
                e
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use garmin_libra_sync::common::types::{OAuth1Token, OAuth2Token};
    use reqwest::StatusCode;
    use tempdir::TempDir;

    fn tokens(access_token: &str) -> GarminTokens {
        GarminTokens {
            oauth1: OAuth1Token {
                oauth_token: "oauth1".to_string(),
                oauth_token_secret: "secret".to_string(),
                mfa_token: None,
                mfa_expiration_timestamp: None,
                domain: Some("garmin.com".to_string()),
            },
            oauth2: OAuth2Token {
                scope: "CONNECT_READ".to_string(),
                jti: "jti".to_string(),
                token_type: "Bearer".to_string(),
                access_token: access_token.to_string(),
                refresh_token: "refresh".to_string(),
                expires_in: 3600,
                expires_at: i64::MAX,
                refresh_token_expires_in: 7200,
                refresh_token_expires_at: i64::MAX,
            },
        }
    }

    /// Resumes only when the store exists and the server accepts it.
    struct FakeSession {
        server_accepts_stored: bool,
        login_succeeds: bool,
        logins: Vec<(String, String)>,
        tokens: Option<GarminTokens>,
    }

    impl FakeSession {
        fn new(server_accepts_stored: bool, login_succeeds: bool) -> Self {
            Self {
                server_accepts_stored,
                login_succeeds,
                logins: Vec::new(),
                tokens: None,
            }
        }
    }

    impl GarminSession for FakeSession {
        async fn resume(&mut self, store: &TokenStore) -> Result<(), GarminError> {
            let stored = store.load()?;
            if !self.server_accepts_stored {
                return Err(GarminError::Http(StatusCode::UNAUTHORIZED));
            }
            self.tokens = Some(stored);
            Ok(())
        }

        async fn login(&mut self, email: &str, password: &str) -> Result<(), GarminError> {
            self.logins.push((email.to_string(), password.to_string()));
            if !self.login_succeeds {
                return Err(GarminError::Authentication("bad credentials".to_string()));
            }
            self.tokens = Some(tokens("fresh"));
            Ok(())
        }

        fn tokens(&self) -> Option<&GarminTokens> {
            self.tokens.as_ref()
        }
    }

    #[tokio::test]
    async fn test_resumes_valid_store() {
        let dir = TempDir::new("session").unwrap();
        let store = TokenStore::new(dir.path());
        store.save(&tokens("stored")).unwrap();

        let mut session = FakeSession::new(true, true);
        bootstrap(&mut session, &store, "a@b.c", "pw").await.unwrap();

        assert!(session.logins.is_empty());
        assert_eq!(session.tokens().unwrap().oauth2.access_token, "stored");
    }

    #[tokio::test]
    async fn test_falls_back_when_store_missing() {
        let dir = TempDir::new("session").unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));

        let mut session = FakeSession::new(true, true);
        bootstrap(&mut session, &store, "a@b.c", "pw").await.unwrap();

        assert_eq!(session.logins, vec![("a@b.c".to_string(), "pw".to_string())]);
        assert_eq!(store.load().unwrap().oauth2.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_falls_back_when_store_rejected() {
        let dir = TempDir::new("session").unwrap();
        let store = TokenStore::new(dir.path());
        store.save(&tokens("revoked")).unwrap();

        let mut session = FakeSession::new(false, true);
        bootstrap(&mut session, &store, "a@b.c", "pw").await.unwrap();

        assert_eq!(session.logins.len(), 1);
        assert_eq!(store.load().unwrap().oauth2.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_login_failure_is_fatal() {
        let dir = TempDir::new("session").unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));

        let mut session = FakeSession::new(true, false);
        let err = bootstrap(&mut session, &store, "a@b.c", "wrong")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Garmin login failed"));
        assert!(store.load().is_err());
    }
}
