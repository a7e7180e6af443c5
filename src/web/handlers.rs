//! HTTP handlers for API endpoints.

use crate::control::{SystemState, Thermostat};
use crate::error::ThermoError;
use crate::hardware::Actuator;
use crate::history::HistorySeries;
use crate::web::chart;
use crate::web::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Cooler")]
    pub cooler: &'static str,
    #[serde(rename = "Cooler_Top")]
    pub cooler_top: &'static str,
    #[serde(rename = "Heater")]
    pub heater: &'static str,
    #[serde(rename = "Status_Led")]
    pub status_led: &'static str,
    #[serde(rename = "Auto_Control")]
    pub auto_control: bool,
    #[serde(rename = "Setpoint")]
    pub setpoint: f64,
    #[serde(rename = "Last_Reading")]
    pub last_reading: Option<DateTime<Utc>>,
}

impl From<&SystemState> for StatusResponse {
    fn from(state: &SystemState) -> Self {
        Self {
            temperature: state.current_temperature,
            humidity: state.current_humidity,
            cooler: on_off(state.cooler_on),
            cooler_top: on_off(state.cooler_top_on),
            heater: on_off(state.heater_on),
            status_led: on_off(state.status_led_on),
            auto_control: state.auto_control_enabled,
            setpoint: state.setpoint_celsius,
            last_reading: state.last_reading_at,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Unwrap a JSON body that must be an object.
fn json_object(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Map<String, Value>> {
    match payload? {
        Json(Value::Object(map)) => Ok(map),
        Json(_) => Err(ThermoError::validation_error("request body must be a JSON object").into()),
    }
}

/// Accept a JSON number or a numeric string, like a lenient float() cast.
pub fn parse_setpoint(value: Option<&Value>) -> Result<f64, ThermoError> {
    let value = value.ok_or_else(|| ThermoError::validation_error("Missing 'value' field"))?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ThermoError::validation_error("'value' must be a number")),
    }
}

/// The `state` field must be a JSON boolean; `1`, `"true"` and friends are rejected.
pub fn parse_state(body: &Map<String, Value>) -> Result<bool, ThermoError> {
    body.get("state")
        .and_then(Value::as_bool)
        .ok_or_else(|| ThermoError::validation_error("'state' must be true or false"))
}

/// `POST /setpoint`
pub async fn set_setpoint(
    State(thermostat): State<Arc<Thermostat>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_object(payload)?;
    let value = parse_setpoint(body.get("value"))?;
    Ok(Json(json!({ "setpoint": thermostat.set_setpoint(value) })))
}

/// `GET /status`
pub async fn get_status(State(thermostat): State<Arc<Thermostat>>) -> Json<StatusResponse> {
    Json(StatusResponse::from(&thermostat.state()))
}

/// `GET /sensor`
pub async fn get_sensor(State(thermostat): State<Arc<Thermostat>>) -> Json<Value> {
    let state = thermostat.state();
    Json(json!({
        "Temperature": state.current_temperature,
        "Humidity": state.current_humidity,
    }))
}

async fn command_actuator(
    thermostat: &Thermostat,
    actuator: Actuator,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_object(payload)?;
    let on = parse_state(&body)?;
    match thermostat.command(actuator, on).await {
        Ok(()) => {}
        Err(e @ ThermoError::Lifecycle(_)) => return Err(e.into()),
        // Hardware faults stay on the board: answer with what the outputs last held
        Err(e) => {
            warn!(%actuator, error = %e, "manual command failed, reporting last known state");
        }
    }

    let state = thermostat.state();
    let mut response = Map::new();
    response.insert(actuator.name().to_string(), json!(on_off(state.actuator(actuator))));
    if actuator == Actuator::Heater {
        response.insert("auto_control".to_string(), json!(state.auto_control_enabled));
    }
    Ok(Json(Value::Object(response)))
}

/// `POST /cooler`
pub async fn set_cooler(
    State(thermostat): State<Arc<Thermostat>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    command_actuator(&thermostat, Actuator::Cooler, payload).await
}

/// `POST /cooler_top`
pub async fn set_cooler_top(
    State(thermostat): State<Arc<Thermostat>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    command_actuator(&thermostat, Actuator::CoolerTop, payload).await
}

/// `POST /heater`. Also switches auto-control off.
pub async fn set_heater(
    State(thermostat): State<Arc<Thermostat>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    command_actuator(&thermostat, Actuator::Heater, payload).await
}

/// `POST /auto`
pub async fn set_auto(
    State(thermostat): State<Arc<Thermostat>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_object(payload)?;
    let enabled = parse_state(&body)?;
    thermostat.set_auto_control(enabled);
    Ok(Json(json!({ "auto_control": enabled })))
}

/// `GET /history`: chart page with the whole persisted history embedded.
pub async fn history_page(State(thermostat): State<Arc<Thermostat>>) -> Html<String> {
    let samples = thermostat.history().load().await;
    Html(chart::render(&HistorySeries::from_samples(&samples)))
}

/// `GET /history.json`
pub async fn history_json(State(thermostat): State<Arc<Thermostat>>) -> impl IntoResponse {
    Json(thermostat.history().load().await)
}

/// `POST /shutdown`. The process is expected to exit shortly after.
pub async fn shutdown(State(thermostat): State<Arc<Thermostat>>) -> impl IntoResponse {
    info!("shutdown requested over the API");
    tokio::spawn(async move {
        thermostat.shutdown().await;
    });
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "shutting down" })),
    )
}

/// Health check endpoint.
pub async fn health_check(State(thermostat): State<Arc<Thermostat>>) -> Json<Value> {
    Json(json!({
        "status": if thermostat.is_running() { "ok" } else { "stopping" },
        "service": "thermo-pi",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}
