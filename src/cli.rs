use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// How outbound notifications leave the process
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Transport {
    /// Deliver through an SMTP relay
    Smtp,
    /// Deliver through a transactional email HTTP API
    Api,
}

#[derive(Parser)]
#[clap(about, version, author)]
pub struct Cli {
    /// HTTP server port
    #[clap(short = 'p', long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// HTTP server address
    #[clap(long, env = "LISTEN_ADDRESS", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Log fewer messages
    #[clap(short = 'q', long)]
    pub quiet: bool,

    /// Path to an optional TOML tuning file
    #[clap(short = 'c', long, env = "HAULMAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the JSON message log
    #[clap(long, env = "MESSAGES_FILE", default_value = "messages.json")]
    pub messages_file: PathBuf,

    /// Delivery strategy for notification emails
    #[clap(long, env = "MAIL_TRANSPORT", value_enum, default_value_t = Transport::Smtp)]
    pub transport: Transport,

    /// SMTP relay host
    #[clap(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP relay port, derived from the TLS mode when omitted
    #[clap(long, env = "SMTP_PORT")]
    pub smtp_port: Option<u16>,

    /// SMTP username, also the default sender and inbox
    #[clap(long, env = "EMAIL_USER")]
    pub email_user: Option<String>,

    /// SMTP password
    #[clap(long, env = "EMAIL_PASS", hide_env_values = true)]
    pub email_pass: Option<String>,

    /// Sender address of notification emails
    #[clap(long, env = "EMAIL_FROM")]
    pub email_from: Option<String>,

    /// Inbox that receives notification emails
    #[clap(long, env = "EMAIL_TO")]
    pub email_to: Option<String>,

    /// Credential for the email HTTP API
    #[clap(long, env = "MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    /// Phone number recorded with logged contact messages
    #[clap(long, env = "PHONE_NUMBER", default_value = "local")]
    pub phone_number: String,
}
