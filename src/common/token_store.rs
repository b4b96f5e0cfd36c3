use crate::common::types::{GarminError, GarminTokens, OAuth1Token, OAuth2Token};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

const OAUTH1_FILE: &str = "oauth1_token.json";
const OAUTH2_FILE: &str = "oauth2_token.json";

/// Directory holding a saved Garmin session, in the same layout `garth` uses
/// so existing token stores keep working.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<GarminTokens, GarminError> {
        let oauth1: OAuth1Token = self.read_json(OAUTH1_FILE)?;
        let oauth2: OAuth2Token = self.read_json(OAUTH2_FILE)?;
        Ok(GarminTokens { oauth1, oauth2 })
    }

    pub fn save(&self, tokens: &GarminTokens) -> Result<(), GarminError> {
        fs::create_dir_all(&self.dir)?;
        self.write_json(OAUTH1_FILE, &tokens.oauth1)?;
        self.write_json(OAUTH2_FILE, &tokens.oauth2)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, GarminError> {
        let contents = fs::read_to_string(self.dir.join(file_name))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<(), GarminError> {
        let contents = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(file_name), contents)?;
        Ok(())
    }
}
