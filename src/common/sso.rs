use crate::common::types::GarminError;
use regex::Regex;
use reqwest::Client;
use reqwest::header::REFERER;
use std::sync::LazyLock;
use tracing::debug;

static CSRF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="_csrf"\s+value="(.+?)""#).expect("valid CSRF pattern")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.+?)</title>").expect("valid title pattern"));
static TICKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"embed\?ticket=([^"]+)""#).expect("valid ticket pattern")
});

/// Sign in through the Garmin SSO embed widget and return the service ticket.
///
/// `client` must keep cookies between requests; the CSRF token is bound to
/// the session cookie set by the first two pages.
pub async fn sign_in(
    client: &Client,
    domain: &str,
    email: &str,
    password: &str,
) -> Result<String, GarminError> {
    let sso = format!("https://sso.{domain}/sso");
    let sso_embed = format!("{sso}/embed");
    let signin_url = format!("{sso}/signin");

    let embed_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", sso.as_str()),
    ];
    let signin_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", sso_embed.as_str()),
        ("service", sso_embed.as_str()),
        ("source", sso_embed.as_str()),
        ("redirectAfterAccountLoginUrl", sso_embed.as_str()),
        ("redirectAfterAccountCreationUrl", sso_embed.as_str()),
    ];

    let response = client
        .get(&sso_embed)
        .query(&embed_params)
        .send()
        .await?
        .error_for_status()?;
    let referer = response.url().to_string();

    let response = client
        .get(&signin_url)
        .query(&signin_params)
        .header(REFERER, referer)
        .send()
        .await?
        .error_for_status()?;
    let referer = response.url().to_string();
    let csrf_token = extract_csrf_token(&response.text().await?)
        .ok_or_else(|| GarminError::Authentication("CSRF token not found".to_string()))?;

    debug!("Submitting Garmin SSO credentials");
    let form = [
        ("username", email),
        ("password", password),
        ("embed", "true"),
        ("_csrf", csrf_token.as_str()),
    ];
    let body = client
        .post(&signin_url)
        .query(&signin_params)
        .header(REFERER, referer)
        .form(&form)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let title = extract_title(&body).unwrap_or_default();
    if title.contains("MFA") {
        return Err(GarminError::MfaRequired);
    }
    if title != "Success" {
        return Err(GarminError::Authentication(format!(
            "Unexpected SSO page title: {title:?}"
        )));
    }

    extract_ticket(&body)
        .ok_or_else(|| GarminError::Authentication("Service ticket not found".to_string()))
}

pub fn extract_csrf_token(html: &str) -> Option<String> {
    capture(&CSRF_RE, html)
}

pub fn extract_title(html: &str) -> Option<String> {
    capture(&TITLE_RE, html)
}

pub fn extract_ticket(html: &str) -> Option<String> {
    capture(&TICKET_RE, html)
}

fn capture(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}
