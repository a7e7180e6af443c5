//! Web application router and middleware setup.

use crate::control::Thermostat;
use crate::web::config::WebConfig;
use crate::web::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, thermostat: Arc<Thermostat>) -> Router {
    let mut app = Router::new()
        .route("/setpoint", post(handlers::set_setpoint))
        .route("/status", get(handlers::get_status))
        .route("/sensor", get(handlers::get_sensor))
        .route("/cooler", post(handlers::set_cooler))
        .route("/cooler_top", post(handlers::set_cooler_top))
        .route("/heater", post(handlers::set_heater))
        .route("/auto", post(handlers::set_auto))
        .route("/history", get(handlers::history_page))
        .route("/history.json", get(handlers::history_json))
        .route("/shutdown", post(handlers::shutdown))
        .route("/health", get(handlers::health_check))
        .with_state(thermostat);

    // Add CORS if enabled
    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
