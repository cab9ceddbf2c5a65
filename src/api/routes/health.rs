//! Health check endpoint.
//!
//! Exposes the aggregate [`HealthSnapshot`] computed by the system health
//! checker. Degraded deployments still answer 200 so load balancers keep
//! routing; only an unhealthy snapshot turns into 503.

use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::models::{ApiResponse, HealthSnapshot, HealthStatus};
use crate::services::HealthCheckable;

#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    operation_id = "getHealth",
    responses(
        (
            status = 200,
            description = "Service is healthy or degraded",
            body = ApiResponse<HealthSnapshot>
        ),
        (
            status = 503,
            description = "Service is unhealthy",
            body = ApiResponse<HealthSnapshot>
        ),
    )
)]
#[get("/health")]
async fn health(checker: web::Data<Arc<dyn HealthCheckable>>) -> HttpResponse {
    let snapshot = checker.check().await;
    match snapshot.status {
        HealthStatus::Unhealthy => {
            HttpResponse::ServiceUnavailable().json(ApiResponse::success(snapshot))
        }
        _ => HttpResponse::Ok().json(ApiResponse::success(snapshot)),
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
