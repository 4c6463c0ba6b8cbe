use super::{DeliveryError, Email, Mailer, Receipt};
use crate::config::{SmtpSettings, SmtpTimeouts, TlsMode};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::{authentication::Credentials, Error as SmtpError};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::debug;
use std::error::Error;
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::time::timeout;

type Relay = AsyncSmtpTransport<Tokio1Executor>;

/// Delivers emails through one SMTP relay
///
/// The underlying transport keeps a pool of authenticated connections, so concurrent sends each get their own
/// connection instead of interleaving commands on a shared one.
pub struct SmtpMailer {
    relay: Relay,
    from: Mailbox,
    sender: String,
    username: String,
    timeouts: SmtpTimeouts,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&settings.from)?;
        let builder = match settings.tls {
            TlsMode::Wrapper => Relay::relay(&settings.host),
            TlsMode::Starttls => Relay::starttls_relay(&settings.host),
            TlsMode::Plain => Ok(Relay::builder_dangerous(&settings.host)),
        }
        .map_err(|err| {
            DeliveryError::Transport(format!("Failed to configure SMTP transport: {err}"))
        })?
        .port(settings.port)
        // Bounds every read or write on an open connection
        .timeout(Some(settings.timeouts.socket));
        let builder = match &settings.password {
            Some(password) => builder.credentials(Credentials::new(
                settings.username.clone(),
                password.clone(),
            )),
            None => builder,
        };

        Ok(Self {
            relay: builder.build(),
            from,
            sender: settings.from.clone(),
            username: settings.username.clone(),
            timeouts: settings.timeouts,
        })
    }

    /// Make sure the pool holds a live connection that got past the greeting
    ///
    /// Connecting and receiving the greeting are bounded together here, so a relay that accepts the TCP connection
    /// but stays silent fails fast instead of waiting out the socket timeout.
    async fn connect(&self) -> Result<(), DeliveryError> {
        let limit = self.timeouts.connect + self.timeouts.greeting;
        if bounded("connection", limit, self.relay.test_connection()).await? {
            Ok(())
        } else {
            Err(DeliveryError::Transport(
                "SMTP relay refused the connection test".to_owned(),
            ))
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<Receipt, DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .reply_to(parse_mailbox(&email.reply_to)?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|err| DeliveryError::Build(err.to_string()))?;

        // The pool hands this connection to the delivery unless a concurrent send takes it first
        self.connect().await?;
        let response = bounded("delivery", self.timeouts.total(), self.relay.send(message)).await?;
        let reply = response.message().collect::<Vec<_>>().join(" ");
        debug!("SMTP relay accepted email: {} {reply}", response.code());
        Ok(Receipt {
            id: format!("{} {reply}", response.code()),
        })
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        self.connect().await
    }

    fn sender(&self) -> &str {
        &self.sender
    }

    fn account(&self) -> &str {
        &self.username
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse().map_err(|err| DeliveryError::Address {
        address: address.to_owned(),
        reason: format!("{err}"),
    })
}

/// Run an SMTP operation, failing with a timeout if it exceeds `limit` or if the transport's own socket timeout fired
async fn bounded<T>(
    stage: &'static str,
    limit: Duration,
    operation: impl Future<Output = Result<T, SmtpError>>,
) -> Result<T, DeliveryError> {
    match timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) if timed_out(&err) => Err(DeliveryError::Timeout(stage)),
        Ok(Err(err)) => Err(DeliveryError::Transport(err.to_string())),
        Err(_) => Err(DeliveryError::Timeout(stage)),
    }
}

/// Determine whether an error was caused by an I/O timeout anywhere in its source chain
fn timed_out(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            if matches!(io_err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    fn settings(port: u16) -> SmtpSettings {
        SmtpSettings {
            host: "127.0.0.1".to_owned(),
            port,
            tls: TlsMode::Plain,
            username: "dispatch@example.com".to_owned(),
            password: None,
            from: "Dispatch <dispatch@example.com>".to_owned(),
            timeouts: SmtpTimeouts {
                connect: Duration::from_millis(200),
                greeting: Duration::from_millis(200),
                socket: Duration::from_millis(200),
            },
        }
    }

    fn email() -> Email {
        Email {
            to: "dispatch@example.com".to_owned(),
            reply_to: "jane@x.com".to_owned(),
            subject: "Hello".to_owned(),
            html: "<p>Hi</p>".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_invalid_sender() {
        let mut settings = settings(25);
        settings.from = "not an address".to_owned();
        assert!(matches!(
            SmtpMailer::new(&settings),
            Err(DeliveryError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn test_sender() {
        let mailer = SmtpMailer::new(&settings(25)).unwrap();
        assert_eq!(mailer.sender(), "Dispatch <dispatch@example.com>");
    }

    #[tokio::test]
    async fn test_invalid_reply_to() {
        let mailer = SmtpMailer::new(&settings(25)).unwrap();
        let email = Email {
            reply_to: "nobody".to_owned(),
            ..email()
        };
        assert_matches!(mailer.send(&email).await, Err(DeliveryError::Address { address, .. }) => {
            assert_eq!(address, "nobody");
        });
    }

    // The listener accepts connections at the OS level but never sends a greeting
    #[tokio::test]
    async fn test_silent_relay_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mailer = SmtpMailer::new(&settings(port)).unwrap();

        assert_matches!(mailer.verify().await, Err(DeliveryError::Timeout(_)));
        assert_matches!(mailer.send(&email()).await, Err(DeliveryError::Timeout(_)));
        drop(listener);
    }

    #[tokio::test]
    async fn test_silent_greeting_fails_before_socket_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut settings = settings(listener.local_addr().unwrap().port());
        settings.timeouts = SmtpTimeouts {
            connect: Duration::from_millis(100),
            greeting: Duration::from_millis(100),
            socket: Duration::from_secs(5),
        };
        let mailer = SmtpMailer::new(&settings).unwrap();

        let start = Instant::now();
        assert_matches!(
            mailer.send(&email()).await,
            Err(DeliveryError::Timeout("connection"))
        );
        assert!(start.elapsed() < Duration::from_secs(2));
        drop(listener);
    }

    #[tokio::test]
    async fn test_account() {
        let mailer = SmtpMailer::new(&settings(25)).unwrap();
        assert_eq!(mailer.account(), "dispatch@example.com");
        assert_ne!(mailer.account(), mailer.sender());
    }

    #[tokio::test]
    async fn test_unreachable_relay() {
        // Bind and immediately release a port so that nothing is listening on it
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mailer = SmtpMailer::new(&settings(port)).unwrap();
        assert!(mailer.send(&email()).await.is_err());
    }
}
