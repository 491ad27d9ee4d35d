use std::time::Duration;

use async_trait::async_trait;
use eureka_core::{ConfigError, Instance};
use reqwest::{Client, Method, Url, header::ACCEPT};
use serde::de::DeserializeOwned;

use crate::error::TransportError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The registry calls the client makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Deregister,
    Heartbeat,
    FetchRegistry,
}

impl Operation {
    pub fn method(&self) -> &'static str {
        match self {
            Operation::Register => "POST",
            Operation::Deregister => "DELETE",
            Operation::Heartbeat => "PUT",
            Operation::FetchRegistry => "GET",
        }
    }
}

/// A call against the registry, addressed by path segments below the registry base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryRequest {
    pub operation: Operation,
    pub segments: Vec<String>,
    pub body: Option<serde_json::Value>,
}

impl RegistryRequest {
    pub fn register(instance: &Instance) -> Result<Self, TransportError> {
        let mut body = serde_json::Map::new();
        body.insert("instance".to_string(), serde_json::to_value(instance)?);
        Ok(Self {
            operation: Operation::Register,
            segments: vec!["apps".to_string(), instance.app.clone()],
            body: Some(serde_json::Value::Object(body)),
        })
    }

    pub fn deregister(app: &str, instance_id: &str) -> Self {
        Self {
            operation: Operation::Deregister,
            segments: vec!["apps".to_string(), app.to_string(), instance_id.to_string()],
            body: None,
        }
    }

    pub fn heartbeat(app: &str, instance_id: &str) -> Self {
        Self {
            operation: Operation::Heartbeat,
            segments: vec!["apps".to_string(), app.to_string(), instance_id.to_string()],
            body: None,
        }
    }

    pub fn fetch_registry() -> Self {
        Self {
            operation: Operation::FetchRegistry,
            segments: vec!["apps".to_string()],
            body: None,
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RegistryResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Performs registry calls. Implementations must not interpret the status code.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    async fn call(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError>;
}

/// Out-of-band check that a registered instance actually answers.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, instance: &Instance) -> Result<(), TransportError>;
}

/// reqwest backed transport and status-page probe.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(eureka_host: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::invalid("httpClient", e.to_string()))?;
        Self::with_client(client, eureka_host)
    }

    pub fn with_client(client: Client, eureka_host: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(eureka_host).map_err(|e| ConfigError::invalid("eurekaHost", e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::invalid("eurekaHost", "not a base URL"));
        }
        Ok(Self { client, base })
    }

    fn url_for(&self, segments: &[String]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn call(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError> {
        let url = self.url_for(&request.segments)?;
        let method = match request.operation {
            Operation::Register => Method::POST,
            Operation::Deregister => Method::DELETE,
            Operation::Heartbeat => Method::PUT,
            Operation::FetchRegistry => Method::GET,
        };
        let http_error = |source| TransportError::Http {
            method: request.operation.method(),
            path: request.path(),
            source,
        };

        let mut builder = self.client.request(method, url).header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(http_error)?;
        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(http_error)?;

        Ok(RegistryResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl LivenessProbe for HttpTransport {
    async fn probe(&self, instance: &Instance) -> Result<(), TransportError> {
        let url = instance
            .status_page_url
            .as_deref()
            .ok_or_else(|| TransportError::Unreachable(format!("{} has no status page", instance.host_name)))?;

        let res = self.client.get(url).send().await.map_err(|source| TransportError::Http {
            method: "GET",
            path: url.to_string(),
            source,
        })?;

        if res.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus {
                method: "GET",
                path: url.to_string(),
                status: res.status().as_u16(),
            })
        }
    }
}
