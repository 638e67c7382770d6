//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Landing page and OpenAPI description."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use axum::response::Html;
use iotlab_sensor::SensorReading;
use iotlab_store::{NewFile, SensorConfig};
use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::routes::files::{ContentResponse, CreatedResponse, MessageResponse, UpdateRequest};
use crate::routes::sensors::ConfigResponse;
use crate::routes::{files, sensors};

/// Where Swagger UI is mounted.
pub(crate) const APIDOCS_PATH: &str = "/apidocs";
/// Where the generated document is served as JSON.
pub(crate) const APISPEC_PATH: &str = "/apispec.json";

const INDEX_HTML: &str = r#"<!doctype html>
<html>
  <head><title>IoT lab sensor API</title></head>
  <body>
    <h1>IoT lab sensor API</h1>
    <p>Interactive documentation lives at <a href="/apidocs/">/apidocs/</a>.</p>
  </body>
</html>
"#;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "IoT lab sensor API",
        description = "Simulated sensor readings, per-sensor configuration and flat text files."
    ),
    paths(
        sensors::read_sensor,
        sensors::list_configs,
        sensors::create_config,
        sensors::get_config,
        sensors::update_config,
        files::list_files,
        files::create_file,
        files::get_file,
        files::update_file,
        files::delete_file,
    ),
    components(schemas(
        SensorReading,
        SensorConfig,
        ConfigResponse,
        NewFile,
        UpdateRequest,
        ContentResponse,
        CreatedResponse,
        MessageResponse,
        ErrorResponse,
    )),
    tags(
        (name = "sensors", description = "Sensor readings and configuration resources"),
        (name = "files", description = "Flat text files")
    )
)]
pub(crate) struct ApiDoc;

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// OpenAPI description of every resource route served by [`crate::build_router`].
pub fn openapi_document() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
