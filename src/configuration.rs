use std::{path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use secrecy::{ExposeSecret, SecretString};
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Config {
    pub api: Api,
    pub storage: Storage,
    pub imgbb: Imgbb,
    pub achievements: Achievements,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Api {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Storage {
    pub path: PathBuf,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Imgbb {
    pub upload_url: String,
    pub api_key: SecretString,
}

impl Imgbb {
    pub fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Achievements {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub toast_seconds: u64,
}

impl Achievements {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_seconds)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        let base_path = std::env::current_dir().map_err(|e| {
            figment::Error::from(format!("Failed to determine the current directory: {e}"))
        })?;
        let config_directory = base_path.join("configuration");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(figment::Error::from)?;

        let environment_filename = format!("{}.yaml", environment.as_str());

        Figment::new()
            .merge(Yaml::file(config_directory.join("base.yaml")))
            .merge(Yaml::file(config_directory.join(environment_filename)))
            .merge(Env::raw().split("__"))
            .extract()
    }
}
