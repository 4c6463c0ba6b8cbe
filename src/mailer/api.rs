use super::{DeliveryError, Email, Mailer, Receipt};
use crate::config::ApiSettings;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Delivers emails through a transactional email HTTP API
/// Each delivery is a single authenticated POST, so the mailer holds no per-delivery state.
pub struct ApiMailer {
    client: Client,
    endpoint: String,
    verify_url: Option<String>,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct Accepted {
    id: String,
}

#[derive(Deserialize)]
struct Rejection {
    message: Option<String>,
}

impl ApiMailer {
    pub fn new(settings: &ApiSettings) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| DeliveryError::Transport(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            verify_url: settings.verify_url.clone(),
            api_key: settings.api_key.clone(),
            from: settings.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ApiMailer {
    async fn send(&self, email: &Email) -> Result<Receipt, DeliveryError> {
        let payload = Payload {
            from: &self.from,
            to: [email.to.as_str()],
            reply_to: &email.reply_to,
            subject: &email.subject,
            html: &email.html,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;
        let accepted: Accepted = accept(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;

        debug!("Email API accepted email {}", accepted.id);
        Ok(Receipt { id: accepted.id })
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        // Without a verification endpoint there is nothing to check beyond having a key
        let Some(verify_url) = &self.verify_url else {
            return Ok(());
        };
        let response = self
            .client
            .get(verify_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(request_error)?;
        accept(response).await?;
        Ok(())
    }

    fn sender(&self) -> &str {
        &self.from
    }
}

fn request_error(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout("email API request")
    } else {
        DeliveryError::Transport(format!("Email API request failed: {err}"))
    }
}

/// Pass through successful responses and turn the rest into errors carrying the provider's explanation
async fn accept(response: Response) -> Result<Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Rejection>(&body)
        .ok()
        .and_then(|rejection| rejection.message)
        .unwrap_or(body);
    Err(DeliveryError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn mailer(server: &MockServer, verify: bool) -> ApiMailer {
        ApiMailer::new(&ApiSettings {
            endpoint: format!("{}/emails", server.uri()),
            verify_url: verify.then(|| format!("{}/domains", server.uri())),
            api_key: "re_test".to_owned(),
            from: "web@example.com".to_owned(),
            timeout: Duration::from_millis(300),
        })
        .unwrap()
    }

    fn email() -> Email {
        Email {
            to: "dispatch@example.com".to_owned(),
            reply_to: "jane@x.com".to_owned(),
            subject: "New Message from Jane - Ankit Transport".to_owned(),
            html: "<p>Hi</p>".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_json(json!({
                "from": "web@example.com",
                "to": ["dispatch@example.com"],
                "reply_to": "jane@x.com",
                "subject": "New Message from Jane - Ankit Transport",
                "html": "<p>Hi</p>",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "4ef9a417" })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = mailer(&server, false).send(&email()).await.unwrap();
        assert_eq!(receipt.id, "4ef9a417");
    }

    #[tokio::test]
    async fn test_rejected_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "statusCode": 422,
                "name": "validation_error",
                "message": "Invalid `to` field.",
            })))
            .mount(&server)
            .await;

        assert_matches!(
            mailer(&server, false).send(&email()).await,
            Err(DeliveryError::Rejected { status: 422, detail }) => {
                assert_eq!(detail, "Invalid `to` field.");
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_with_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        assert_matches!(
            mailer(&server, false).send(&email()).await,
            Err(DeliveryError::Rejected { status: 503, detail }) => {
                assert_eq!(detail, "upstream unavailable");
            }
        );
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        assert_matches!(
            mailer(&server, false).send(&email()).await,
            Err(DeliveryError::Timeout(_))
        );
    }

    #[tokio::test]
    async fn test_verify() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domains"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(mailer(&server, true).verify().await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_bad_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "API key is invalid" })),
            )
            .mount(&server)
            .await;

        assert_matches!(
            mailer(&server, true).verify().await,
            Err(DeliveryError::Rejected { status: 401, .. })
        );
    }

    #[tokio::test]
    async fn test_verify_without_url() {
        let server = MockServer::start().await;
        assert!(mailer(&server, false).verify().await.is_ok());
        assert_eq!(mailer(&server, false).sender(), "web@example.com");
    }
}
