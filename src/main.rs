mod cli;
mod config;
mod http;
mod io_ext;
mod mailer;
mod message;
mod notification;
mod store;

use crate::cli::Cli;
use crate::config::{Delivery, Settings};
use crate::http::AppState;
use crate::mailer::{ApiMailer, Mailer, SmtpMailer};
use crate::notification::Notifier;
use crate::store::MessageLog;
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_module_level("actix_server", LevelFilter::Off)
        .with_module_level("mio", LevelFilter::Off)
        .with_module_level("rustls", LevelFilter::Warn)
        .with_level(if cli.quiet {
            LevelFilter::Info
        } else {
            LevelFilter::Debug
        })
        .init()?;

    let settings = Settings::load(&cli).await?;

    // The delivery strategy is fixed for the lifetime of the process
    let mailer: Arc<dyn Mailer> = match &settings.delivery {
        Delivery::Smtp(smtp) => {
            let mailer = SmtpMailer::new(smtp).context("Failed to configure SMTP delivery")?;
            match mailer.verify().await {
                Ok(()) => info!("Connected to SMTP relay {}:{}", smtp.host, smtp.port),
                Err(err) => warn!(
                    "SMTP relay {}:{} is not reachable yet: {err}",
                    smtp.host, smtp.port
                ),
            }
            Arc::new(mailer)
        }
        Delivery::Api(api) => {
            info!("Delivering email through {}", api.endpoint);
            Arc::new(ApiMailer::new(api).context("Failed to configure email API delivery")?)
        }
    };
    info!(
        "Sending notifications from {} to {}",
        mailer.sender(),
        settings.inbox
    );

    let state = AppState {
        log: MessageLog::new(settings.messages_file),
        notifier: Notifier::new(mailer, settings.inbox, settings.brand),
        phone_number: settings.phone_number,
    };
    info!("Logging messages to {}", state.log.path().display());
    http::start_server(state, settings.listen)
        .await
        .context("Failed to run HTTP server")?;

    info!("HTTP server stopped");
    Ok(())
}
