use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs::read_to_string;

/// How the SMTP connection is secured
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS from the first byte
    #[default]
    Wrapper,
    /// Plaintext greeting upgraded with STARTTLS
    Starttls,
    /// No encryption at all, only for local relays
    #[serde(rename = "none")]
    Plain,
}

impl TlsMode {
    /// The conventional port for this mode of transport
    pub fn default_port(self) -> u16 {
        match self {
            Self::Wrapper => 465,
            Self::Starttls => 587,
            Self::Plain => 25,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSmtpConfig {
    pub tls: Option<TlsMode>,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub greeting_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub socket_timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawApiConfig {
    pub endpoint: Option<String>,
    pub verify_url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub brand: Option<String>,

    #[serde(default)]
    pub smtp: RawSmtpConfig,

    #[serde(default)]
    pub api: RawApiConfig,
}

impl RawConfig {
    /// Read and parse a tuning file
    pub async fn load(path: &Path) -> Result<Self> {
        let toml_str = read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&toml_str)
            .with_context(|| format!("Failed to deserialize TOML config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("haulmail.toml");
        write(&path, "brand = 'Acme Freight'\n\n[smtp]\ntls = 'none'\nsocket_timeout = '3s'\n")?;

        let config = RawConfig::load(&path).await?;
        assert_eq!(config.brand.as_deref(), Some("Acme Freight"));
        assert_eq!(config.smtp.tls, Some(TlsMode::Plain));
        assert_eq!(config.smtp.socket_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.api.endpoint, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_errors() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("missing.toml");
        let err = RawConfig::load(&missing).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));

        let unknown = dir.path().join("unknown.toml");
        write(&unknown, "[smtp]\nretries = 3\n")?;
        let err = RawConfig::load(&unknown).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to deserialize TOML config file"));
        Ok(())
    }
}
