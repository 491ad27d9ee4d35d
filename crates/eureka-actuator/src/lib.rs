//! Management endpoints the registry dashboard links to.
//!
//! [`router`] only answers its own paths, so it can be merged into the host
//! service's router without shadowing anything.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use eureka_core::{Instance, InstanceStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sysinfo::{Disks, System};
use utoipa::{OpenApi, ToSchema};

#[cfg(windows)]
const ROOT_DISK: &str = "c:\\";
#[cfg(not(windows))]
const ROOT_DISK: &str = "/";

#[derive(Clone)]
pub struct ActuatorState {
    description: String,
    version: Option<String>,
    active_port: Option<u16>,
    started: Instant,
    prometheus: Option<PrometheusHandle>,
}

impl ActuatorState {
    pub fn new(instance: &Instance) -> Self {
        Self {
            description: "Eureka Rust Client".to_string(),
            version: None,
            active_port: instance.active_port(),
            started: Instant::now(),
            prometheus: None,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(info, health, env, metrics, prometheus),
    components(schemas(InfoResponse, HealthResponse, DiskSpace, InstanceStatus))
)]
pub struct ApiDoc;

pub fn router(state: ActuatorState) -> Router {
    Router::new()
        .route("/info", get(info))
        .route("/health", get(health))
        .route("/env", get(env))
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(prometheus))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    pub status: InstanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub description: String,
    pub status: InstanceStatus,
    pub disk_space: DiskSpace,
}

/// Root filesystem usage in bytes. Down once free space drops below a tenth of the total.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiskSpace {
    pub status: InstanceStatus,
    pub total: u64,
    pub free: u64,
    pub threshold: u64,
}

impl DiskSpace {
    fn from_usage(total: u64, free: u64) -> Self {
        let threshold = total / 10;
        let status = if free >= threshold {
            InstanceStatus::Up
        } else {
            InstanceStatus::Down
        };
        Self { status, total, free, threshold }
    }

    fn root() -> Self {
        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new(ROOT_DISK))
            .or_else(|| disks.list().first());

        match root {
            Some(disk) => Self::from_usage(disk.total_space(), disk.available_space()),
            None => {
                tracing::debug!("no disk mounted at {}", ROOT_DISK);
                Self {
                    status: InstanceStatus::Unknown,
                    total: 0,
                    free: 0,
                    threshold: 0,
                }
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "Instance is up", body = InfoResponse))
)]
async fn info(State(state): State<ActuatorState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        status: InstanceStatus::Up,
        version: state.version,
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Health summary with root disk usage", body = HealthResponse))
)]
async fn health(State(state): State<ActuatorState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        description: state.description,
        status: InstanceStatus::Up,
        disk_space: DiskSpace::root(),
    })
}

#[utoipa::path(
    get,
    path = "/env",
    responses((status = 200, description = "Profiles, ports, arguments and environment"))
)]
async fn env(State(state): State<ActuatorState>) -> Json<serde_json::Value> {
    let profiles: Vec<String> = std::env::var("EUREKA_PROFILE").ok().into_iter().collect();
    let environment: BTreeMap<String, String> = std::env::vars().collect();
    let args: Vec<String> = std::env::args().collect();

    Json(json!({
        "profiles": profiles,
        "server.ports": { "local.server.port": state.active_port },
        "commandLineArgs": args,
        "systemEnvironment": environment,
    }))
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Memory in KiB, load, processors and uptime"))
)]
async fn metrics(State(state): State<ActuatorState>) -> Json<serde_json::Value> {
    let uptime = state.started.elapsed().as_secs();
    let processors = std::thread::available_parallelism().map_or(1, |n| n.get());

    let mut system = System::new();
    system.refresh_memory();
    let load = System::load_average();

    Json(json!({
        "mem": system.total_memory() / 1024,
        "mem.free": system.free_memory() / 1024,
        "processors": processors,
        "uptime": uptime,
        "instance.uptime": uptime,
        "systemload.average": load.one,
    }))
}

#[utoipa::path(
    get,
    path = "/metrics/prometheus",
    responses(
        (status = 200, description = "Client counters in Prometheus text format"),
        (status = 404, description = "No recorder attached")
    )
)]
async fn prometheus(State(state): State<ActuatorState>) -> Response {
    match state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => {
            tracing::debug!("prometheus endpoint hit without a recorder");
            (StatusCode::NOT_FOUND, "No metrics recorder installed").into_response()
        }
    }
}
