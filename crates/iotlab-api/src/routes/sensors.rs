//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Sensor reading and sensor configuration routes."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use iotlab_logging::LogContext;
use iotlab_sensor::SensorReading;
use iotlab_store::{SensorConfig, StoreError, DEFAULT_CONFIG_NAME};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{parse_optional_json, record, ApiError, ErrorResponse, Messages};
use crate::ApiState;

const CONFIG_MESSAGES: Messages = Messages {
    conflict: "Configuration already exists",
    not_found: "Configuration file does not exist",
    missing_body: "Missing config data",
};

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ConfigResponse {
    #[schema(example = "Configuration created")]
    message: String,
    config: SensorConfig,
}

pub(crate) fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/sensor/:sensor_id", get(read_sensor))
        .route(
            "/sensor/:sensor_id/config",
            get(list_configs).post(create_config),
        )
        .route(
            "/sensor/:sensor_id/config/:filename",
            get(get_config).put(update_config),
        )
}

#[utoipa::path(
    get,
    path = "/sensor/{sensor_id}",
    tag = "sensors",
    params(("sensor_id" = String, Path, description = "Sensor identifier")),
    responses((status = 200, description = "Deterministic reading for the sensor", body = SensorReading))
)]
pub(crate) async fn read_sensor(
    State(state): State<Arc<ApiState>>,
    Path(sensor_id): Path<String>,
) -> Json<SensorReading> {
    Json(state.reader().read(&sensor_id))
}

#[utoipa::path(
    get,
    path = "/sensor/{sensor_id}/config",
    tag = "sensors",
    params(("sensor_id" = String, Path, description = "Sensor identifier")),
    responses(
        (status = 200, description = "Configuration names", body = [String]),
        (status = 400, description = "Invalid sensor identifier", body = ErrorResponse)
    )
)]
pub(crate) async fn list_configs(
    State(state): State<Arc<ApiState>>,
    Path(sensor_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    state
        .configs()
        .list(&sensor_id)
        .map(Json)
        .map_err(|err| ApiError::from_store(err, &CONFIG_MESSAGES))
}

#[utoipa::path(
    post,
    path = "/sensor/{sensor_id}/config",
    tag = "sensors",
    params(("sensor_id" = String, Path, description = "Sensor identifier")),
    request_body(
        content = SensorConfig,
        description = "Fields overriding the defaults, may be omitted",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Configuration created", body = ConfigResponse),
        (status = 400, description = "Invalid identifier or JSON body", body = ErrorResponse),
        (status = 409, description = "Configuration already exists", body = ErrorResponse)
    )
)]
pub(crate) async fn create_config(
    State(state): State<Arc<ApiState>>,
    Path(sensor_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ConfigResponse>), ApiError> {
    let body: Option<SensorConfig> = parse_optional_json(&body)?;
    let ctx = LogContext::new()
        .with_sensor(&sensor_id)
        .with_resource(DEFAULT_CONFIG_NAME)
        .with_operation("create");
    let result = state.configs().create(&sensor_id, body);
    record(&ctx, "sensor.config.create", &result);
    let config = result.map_err(|err| ApiError::from_store(err, &CONFIG_MESSAGES))?;
    Ok((
        StatusCode::CREATED,
        Json(ConfigResponse {
            message: "Configuration created".to_owned(),
            config,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/sensor/{sensor_id}/config/{filename}",
    tag = "sensors",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        ("filename" = String, Path, description = "Configuration resource name")
    ),
    responses(
        (status = 200, description = "Stored configuration", body = SensorConfig),
        (status = 400, description = "Invalid identifier", body = ErrorResponse),
        (status = 404, description = "Configuration file does not exist", body = ErrorResponse)
    )
)]
pub(crate) async fn get_config(
    State(state): State<Arc<ApiState>>,
    Path((sensor_id, filename)): Path<(String, String)>,
) -> Result<Json<SensorConfig>, ApiError> {
    state
        .configs()
        .get(&sensor_id, &filename)
        .map(Json)
        .map_err(|err| ApiError::from_store(err, &CONFIG_MESSAGES))
}

#[utoipa::path(
    put,
    path = "/sensor/{sensor_id}/config/{filename}",
    tag = "sensors",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        ("filename" = String, Path, description = "Configuration resource name")
    ),
    request_body(
        content = SensorConfig,
        description = "Replacement configuration, stored as given",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Configuration updated", body = ConfigResponse),
        (status = 400, description = "Invalid identifier, invalid JSON body or missing config data", body = ErrorResponse),
        (status = 404, description = "Configuration file does not exist", body = ErrorResponse)
    )
)]
pub(crate) async fn update_config(
    State(state): State<Arc<ApiState>>,
    Path((sensor_id, filename)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ConfigResponse>, ApiError> {
    let configs = state.configs();
    let body: Option<SensorConfig> = match parse_optional_json(&body) {
        Ok(body) => body,
        Err(err) => {
            // A missing resource outranks a malformed body.
            let exists = configs
                .exists(&sensor_id, &filename)
                .map_err(|err| ApiError::from_store(err, &CONFIG_MESSAGES))?;
            if !exists {
                return Err(ApiError::from_store(
                    StoreError::NotFound(filename),
                    &CONFIG_MESSAGES,
                ));
            }
            return Err(err);
        }
    };
    let ctx = LogContext::new()
        .with_sensor(&sensor_id)
        .with_resource(&filename)
        .with_operation("update");
    let result = configs.update(&sensor_id, &filename, body);
    record(&ctx, "sensor.config.update", &result);
    let config = result.map_err(|err| ApiError::from_store(err, &CONFIG_MESSAGES))?;
    Ok(Json(ConfigResponse {
        message: "Configuration updated".to_owned(),
        config,
    }))
}
