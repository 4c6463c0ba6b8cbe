mod api;
mod http_error;

use self::api::{EmailStatus, SmsRequest, SmsSaved};
use self::http_error::HttpError;
use crate::notification::{ContactSubmission, Notifier, QuotationSubmission};
use crate::store::{MessageLog, StoreError};
use actix_cors::Cors;
use actix_web::middleware::{Compress, Logger};
use actix_web::web::{Data, Json, JsonConfig, Path, PathConfig, ServiceConfig};
use actix_web::{delete, get, post, put, App, HttpServer, Responder, Result};
use log::{error, info};
use serde_json::json;
use std::net::SocketAddr;

/// Everything the handlers share, built once at startup
pub struct AppState {
    pub log: MessageLog,
    pub notifier: Notifier,
    pub phone_number: String,
}

type ThreadData = Data<AppState>;

/// Translate a store failure into a response, treating a missing log or message as not found
fn store_error(message: &'static str, err: StoreError) -> HttpError {
    match err {
        StoreError::Absent => HttpError::NotFound("No messages found"),
        StoreError::NotFound(_) => HttpError::NotFound("Message not found"),
        err => HttpError::internal(message, err),
    }
}

#[post("/api/send-message")]
async fn send_message(
    submission: Json<ContactSubmission>,
    data: ThreadData,
) -> Result<impl Responder> {
    submission
        .validate()
        .map_err(|err| HttpError::bad_request("Name, email and message are required", err))?;
    data.notifier
        .send_contact(&submission)
        .await
        .map_err(|err| HttpError::internal("Failed to send message.", err))?;

    // The email already went out, so a logging failure doesn't fail the request
    if let Err(err) = data
        .log
        .append(submission.log_entry(&data.phone_number))
        .await
    {
        error!("Failed to log message from {}: {err}", submission.email);
    }

    Ok(Json(json!({ "message": "Message sent successfully!" })))
}

#[post("/api/send-quotation")]
async fn send_quotation(
    submission: Json<QuotationSubmission>,
    data: ThreadData,
) -> Result<impl Responder> {
    submission
        .validate()
        .map_err(|err| HttpError::bad_request("Name, email and message are required", err))?;
    data.notifier
        .send_quotation(&submission)
        .await
        .map_err(|err| HttpError::internal("Failed to send quotation request.", err))?;
    Ok(Json(
        json!({ "message": "Quotation request sent successfully!" }),
    ))
}

#[post("/api/send-sms")]
async fn send_sms(request: Json<SmsRequest>, data: ThreadData) -> Result<impl Responder> {
    let request = request.into_inner();
    if !request.is_complete() {
        return Err(HttpError::BadRequest {
            message: "Phone number and message required".to_owned(),
            error: None,
        }
        .into());
    }

    let sms = data
        .log
        .append(request.into_new_message())
        .await
        .map_err(|err| HttpError::internal("Failed to save message", err))?;
    info!("Saved message {} for {}", sms.id, sms.phone_number);
    Ok(Json(SmsSaved {
        message: "Message saved locally!",
        sms,
    }))
}

#[get("/api/messages")]
async fn list_messages(data: ThreadData) -> Result<impl Responder> {
    let messages = data
        .log
        .list()
        .await
        .map_err(|err| HttpError::internal("Error reading messages", err))?;
    Ok(Json(messages))
}

#[put("/api/messages/{id}/read")]
async fn mark_read(id: Path<i64>, data: ThreadData) -> Result<impl Responder> {
    data.log
        .mark_read(id.into_inner())
        .await
        .map_err(|err| store_error("Error updating message", err))?;
    Ok(Json(json!({ "message": "Message marked as read" })))
}

#[delete("/api/messages/{id}")]
async fn delete_message(id: Path<i64>, data: ThreadData) -> Result<impl Responder> {
    let id = id.into_inner();
    let removed = data
        .log
        .remove(id)
        .await
        .map_err(|err| store_error("Error deleting message", err))?;
    if removed {
        info!("Deleted message {id}");
    }
    Ok(Json(json!({ "message": "Message deleted" })))
}

#[get("/api/test-email")]
async fn test_email(data: ThreadData) -> Result<impl Responder> {
    data.notifier.verify().await.map_err(|err| {
        error!("Email configuration error: {err}");
        HttpError::internal("Email configuration failed!", err)
    })?;
    Ok(Json(EmailStatus {
        message: "Email configuration is working!",
        email_user: data.notifier.account().to_owned(),
    }))
}

/// Register the API routes
pub fn configure(config: &mut ServiceConfig) {
    config
        .app_data(JsonConfig::default().error_handler(|err, _| {
            HttpError::bad_request("Invalid request body", err).into()
        }))
        // Ids that aren't integers can't name a stored message
        .app_data(
            PathConfig::default()
                .error_handler(|_, _| HttpError::NotFound("Message not found").into()),
        )
        .service(send_message)
        .service(send_quotation)
        .service(send_sms)
        .service(list_messages)
        .service(mark_read)
        .service(delete_message)
        .service(test_email);
}

pub async fn start_server(state: AppState, listen: SocketAddr) -> Result<(), std::io::Error> {
    info!("Starting HTTP server on {listen}");
    let data = Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Compress::default())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(listen)?
    .run()
    .await
}
