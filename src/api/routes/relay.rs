//! Relay submission and operation status endpoints.

use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::domain::RelayApi;
use crate::models::{ApiError, ApiResponse, OperationRecord, RelayRequest, RelayerResponse};

/// Submits a relay request. Stateful deployments answer with a pending
/// operation id; stateless ones answer with the broadcast result directly.
#[utoipa::path(
    post,
    path = "/v1/relay",
    tag = "Relay",
    operation_id = "relay",
    request_body = RelayRequest,
    responses(
        (
            status = 200,
            description = "Request accepted; response carries the delivery stage",
            body = ApiResponse<RelayerResponse>
        ),
        (
            status = 400,
            description = "Request failed validation",
            body = ApiResponse<String>
        ),
        (
            status = 503,
            description = "Backing store unavailable",
            body = ApiResponse<String>
        ),
    )
)]
#[post("/relay")]
async fn relay(
    request: web::Json<RelayRequest>,
    api: web::Data<Arc<dyn RelayApi>>,
) -> Result<HttpResponse, ApiError> {
    let response = api.relay(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Fetches the current record for a tracked operation.
#[utoipa::path(
    get,
    path = "/v1/operations/{operation_id}",
    tag = "Relay",
    operation_id = "getOperation",
    params(
        ("operation_id" = String, Path, description = "The operation's idempotency key")
    ),
    responses(
        (
            status = 200,
            description = "Operation record retrieved",
            body = ApiResponse<OperationRecord>
        ),
        (
            status = 404,
            description = "Unknown operation id",
            body = ApiResponse<String>
        ),
    )
)]
#[get("/operations/{operation_id}")]
async fn operation_status(
    path: web::Path<String>,
    api: web::Data<Arc<dyn RelayApi>>,
) -> Result<HttpResponse, ApiError> {
    let record = api.operation_status(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(relay).service(operation_status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockRelayApi;
    use crate::models::HandlerError;
    use actix_web::{test, App};

    fn valid_body() -> serde_json::Value {
        serde_json::json!({
            "address": "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            "chain_id": 1,
            "to": "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            "value": "1000",
            "operation_id": "op-1"
        })
    }

    fn shared(api: MockRelayApi) -> web::Data<Arc<dyn RelayApi>> {
        let api: Arc<dyn RelayApi> = Arc::new(api);
        web::Data::new(api)
    }

    #[actix_web::test]
    async fn test_relay_returns_tagged_response() {
        let mut api = MockRelayApi::new();
        api.expect_relay().returning(|_| {
            Box::pin(async {
                Ok(RelayerResponse::Pending {
                    operation_id: "op-1".to_string(),
                })
            })
        });

        let app =
            test::init_service(App::new().app_data(shared(api)).configure(init)).await;
        let req = test::TestRequest::post()
            .uri("/relay")
            .set_json(valid_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["operation_id"], "op-1");
    }

    #[actix_web::test]
    async fn test_validation_failure_is_400() {
        let mut api = MockRelayApi::new();
        api.expect_relay().returning(|_| {
            Box::pin(async { Err(HandlerError::Validation("Invalid sender".to_string())) })
        });

        let app =
            test::init_service(App::new().app_data(shared(api)).configure(init)).await;
        let req = test::TestRequest::post()
            .uri("/relay")
            .set_json(valid_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_unknown_operation_is_404() {
        let mut api = MockRelayApi::new();
        api.expect_operation_status().returning(|_| {
            Box::pin(async { Err(HandlerError::NotFound("op-404".to_string())) })
        });

        let app =
            test::init_service(App::new().app_data(shared(api)).configure(init)).await;
        let req = test::TestRequest::get()
            .uri("/operations/op-404")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
    }
}
