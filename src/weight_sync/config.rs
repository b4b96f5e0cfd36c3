use anyhow::{Result, anyhow};
use garmin_libra_sync::common::{garmin_client, libra_client};
use std::env;
use std::path::PathBuf;

pub struct Config {
    pub email: String,
    pub password: String,
    pub token_store: PathBuf,
    pub libra_token: String,
    pub libra_endpoint: String,
    pub garmin_domain: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("{key} environment variable not set"))
        };

        let optional = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let token_store = expand_home(&required("TOKENSTORE")?, lookup("HOME").as_deref());

        Ok(Self {
            email: required("EMAIL")?,
            password: required("PASSWORD")?,
            token_store,
            libra_token: required("AUTH_TOKEN")?,
            libra_endpoint: optional("LIBRA_API_URL")
                .unwrap_or_else(|| libra_client::DEFAULT_ENDPOINT.to_string()),
            garmin_domain: optional("GARMIN_DOMAIN")
                .unwrap_or_else(|| garmin_client::DEFAULT_DOMAIN.to_string()),
        })
    }
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => PathBuf::from(home),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 5] = [
        ("EMAIL", "athlete@example.com"),
        ("PASSWORD", "hunter2"),
        ("TOKENSTORE", "~/.garminconnect"),
        ("AUTH_TOKEN", "libra-token"),
        ("HOME", "/home/athlete"),
    ];

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.email, "athlete@example.com");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.libra_token, "libra-token");
        assert_eq!(
            config.token_store,
            PathBuf::from("/home/athlete/.garminconnect")
        );
        assert_eq!(config.libra_endpoint, "https://api.libra-app.eu");
        assert_eq!(config.garmin_domain, "garmin.com");
    }

    #[test]
    fn test_config_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LIBRA_API_URL", "http://localhost:8080"));
        vars.push(("GARMIN_DOMAIN", "garmin.cn"));

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.libra_endpoint, "http://localhost:8080");
        assert_eq!(config.garmin_domain, "garmin.cn");
    }

    #[test]
    fn test_empty_optional_variables_use_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LIBRA_API_URL", ""));
        vars.push(("GARMIN_DOMAIN", ""));

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.libra_endpoint, "https://api.libra-app.eu");
        assert_eq!(config.garmin_domain, "garmin.com");
    }

    #[test]
    fn test_config_missing_variable() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "AUTH_TOKEN")
            .collect();

        let err = Config::from_lookup(lookup_from(&vars)).err().unwrap();
        assert_eq!(err.to_string(), "AUTH_TOKEN environment variable not set");
    }

    #[test]
    fn test_empty_variable_is_missing() {
        let mut vars = REQUIRED.to_vec();
        vars.retain(|(k, _)| *k != "EMAIL");
        vars.push(("EMAIL", ""));

        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(
            expand_home("~/.garth", Some("/root")),
            PathBuf::from("/root/.garth")
        );
        assert_eq!(expand_home("~", Some("/root")), PathBuf::from("/root"));
        assert_eq!(
            expand_home("/var/lib/tokens", Some("/root")),
            PathBuf::from("/var/lib/tokens")
        );
        assert_eq!(expand_home("~/.garth", None), PathBuf::from("~/.garth"));
        assert_eq!(
            expand_home("~other/tokens", Some("/root")),
            PathBuf::from("~other/tokens")
        );
    }
}
