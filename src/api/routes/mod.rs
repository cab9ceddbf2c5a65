//! HTTP route configuration.
//!
//! * `/v1/health` - aggregate health snapshot
//! * `/v1/relay` - relay submission
//! * `/v1/operations/{id}` - operation status lookup

pub mod health;
pub mod relay;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .configure(health::init)
            .configure(relay::init),
    );
}
