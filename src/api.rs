//! HTTP surface
//!
//! A single transaction endpoint plus health and metrics. Transaction
//! outcomes, success or rejection, travel as HTTP 200 with the tagged wire
//! envelope; only infrastructure failures produce the generic 500 response.

use crate::error::Error;
use crate::metrics::Metrics;
use crate::service::BankService;
use crate::types::{TransactionOutcome, TransactionRequest};
use actix_web::{error::ResponseError, http::StatusCode, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!(error = %self, "request failed");
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.status_code().as_u16(),
                "message": "internal error",
            }
        }))
    }
}

/// Submit one transaction request
pub async fn submit_transaction(
    service: web::Data<Arc<BankService>>,
    request: web::Json<TransactionRequest>,
) -> Result<HttpResponse, Error> {
    let outcome = service.submit(request.into_inner())?;
    Ok(HttpResponse::Ok().json(TransactionOutcome::from(outcome)))
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "reserve-engine",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint(metrics: web::Data<Metrics>) -> Result<HttpResponse, Error> {
    let body = metrics.encode()?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/transaction", web::post().to(submit_transaction))
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint));
}
