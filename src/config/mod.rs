mod raw;

pub use self::raw::TlsMode;
use self::raw::{RawApiConfig, RawConfig, RawSmtpConfig};
use crate::cli::{Cli, Transport};
use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BRAND: &str = "Ankit Transport";
const DEFAULT_API_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SmtpTimeouts {
    pub connect: Duration,
    pub greeting: Duration,
    pub socket: Duration,
}

impl Default for SmtpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            greeting: Duration::from_secs(10),
            socket: Duration::from_secs(20),
        }
    }
}

impl SmtpTimeouts {
    /// The longest a complete delivery may take
    pub fn total(&self) -> Duration {
        self.connect + self.greeting + self.socket
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    pub username: String,
    pub password: Option<String>,
    pub from: String,
    pub timeouts: SmtpTimeouts,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiSettings {
    pub endpoint: String,
    pub verify_url: Option<String>,
    pub api_key: String,
    pub from: String,
    pub timeout: Duration,
}

/// The delivery strategy chosen for this process
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    Smtp(SmtpSettings),
    Api(ApiSettings),
}

#[derive(Debug)]
pub struct Settings {
    pub listen: SocketAddr,
    pub messages_file: PathBuf,
    pub phone_number: String,
    pub brand: String,
    pub inbox: String,
    pub delivery: Delivery,
}

impl Settings {
    /// Load the tuning file, if any, and merge it with the command line
    pub async fn load(cli: &Cli) -> Result<Self> {
        let raw = match &cli.config {
            Some(path) => RawConfig::load(path).await?,
            None => RawConfig::default(),
        };
        Self::resolve(cli, raw)
    }

    fn resolve(cli: &Cli, raw: RawConfig) -> Result<Self> {
        let delivery = match cli.transport {
            Transport::Smtp => Delivery::Smtp(resolve_smtp(cli, raw.smtp)?),
            Transport::Api => Delivery::Api(resolve_api(cli, raw.api)?),
        };
        let from = match &delivery {
            Delivery::Smtp(smtp) => &smtp.from,
            Delivery::Api(api) => &api.from,
        };

        Ok(Self {
            listen: SocketAddr::new(cli.host, cli.port),
            messages_file: cli.messages_file.clone(),
            phone_number: cli.phone_number.clone(),
            brand: raw.brand.unwrap_or_else(|| DEFAULT_BRAND.to_owned()),
            inbox: cli.email_to.clone().unwrap_or_else(|| from.clone()),
            delivery,
        })
    }
}

fn resolve_smtp(cli: &Cli, raw: RawSmtpConfig) -> Result<SmtpSettings> {
    let Some(username) = cli.email_user.clone() else {
        bail!("EMAIL_USER must be set when delivering through SMTP")
    };
    let defaults = SmtpTimeouts::default();
    let timeouts = SmtpTimeouts {
        connect: nonzero("smtp.connect_timeout", raw.connect_timeout, defaults.connect)?,
        greeting: nonzero("smtp.greeting_timeout", raw.greeting_timeout, defaults.greeting)?,
        socket: nonzero("smtp.socket_timeout", raw.socket_timeout, defaults.socket)?,
    };
    let tls = raw.tls.unwrap_or_default();

    Ok(SmtpSettings {
        host: cli.smtp_host.clone(),
        port: cli.smtp_port.unwrap_or_else(|| tls.default_port()),
        tls,
        from: cli.email_from.clone().unwrap_or_else(|| username.clone()),
        username,
        password: cli.email_pass.clone(),
        timeouts,
    })
}

fn resolve_api(cli: &Cli, raw: RawApiConfig) -> Result<ApiSettings> {
    let Some(api_key) = cli.mail_api_key.clone().filter(|key| !key.is_empty()) else {
        bail!("MAIL_API_KEY must be set when delivering through the email API")
    };
    let Some(from) = cli.email_from.clone().or_else(|| cli.email_user.clone()) else {
        bail!("EMAIL_FROM or EMAIL_USER must be set when delivering through the email API")
    };

    Ok(ApiSettings {
        endpoint: raw
            .endpoint
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_owned()),
        verify_url: raw.verify_url,
        api_key,
        from,
        timeout: nonzero("api.timeout", raw.timeout, Duration::from_secs(15))?,
    })
}

/// Apply a default to an optional timeout, rejecting zero durations
fn nonzero(name: &str, value: Option<Duration>, default: Duration) -> Result<Duration> {
    match value {
        Some(duration) if duration.is_zero() => bail!("`{name}` must be greater than zero"),
        Some(duration) => Ok(duration),
        None => Ok(default),
    }
}
