use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::health::InstanceStatus;
use crate::instance::{DataCenterInfo, Instance, PortInfo};

/// A port given either as a bare number or in the registry's own encoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u16),
    Info(PortInfo),
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        PortSpec::Number(port)
    }
}

impl From<PortSpec> for PortInfo {
    fn from(spec: PortSpec) -> Self {
        match spec {
            PortSpec::Number(port) => PortInfo::enabled(port),
            PortSpec::Info(info) => info,
        }
    }
}

/// User supplied description of the local instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub app: String,
    pub host_name: String,
    pub ip_addr: Option<String>,
    pub instance_id: Option<String>,
    pub port: Option<PortSpec>,
    pub secure_port: Option<PortSpec>,
    pub vip_address: Option<String>,
    pub home_page_url: Option<String>,
    pub status_page_url: Option<String>,
    pub health_check_url: Option<String>,
    pub data_center_info: Option<DataCenterInfo>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InstanceConfig {
    pub fn new(app: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            host_name: host_name.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: impl Into<PortSpec>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn secure_port(mut self, port: impl Into<PortSpec>) -> Self {
        self.secure_port = Some(port.into());
        self
    }

    pub fn instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    pub fn ip_addr(mut self, ip: impl Into<String>) -> Self {
        self.ip_addr = Some(ip.into());
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Builds the normalized registration payload.
    pub fn build(&self) -> Result<Instance, ConfigError> {
        if self.app.trim().is_empty() {
            return Err(ConfigError::Missing("instance.app"));
        }
        if self.host_name.trim().is_empty() {
            return Err(ConfigError::Missing("instance.hostName"));
        }

        let mut instance = Instance {
            instance_id: None,
            app: self.app.clone(),
            host_name: self.host_name.clone(),
            ip_addr: self.ip_addr.clone().unwrap_or_else(|| self.host_name.clone()),
            status: InstanceStatus::Up,
            port: self.port.clone().map(PortInfo::from).unwrap_or_default(),
            secure_port: self.secure_port.clone().map(PortInfo::from).unwrap_or_default(),
            vip_address: Some(self.vip_address.clone().unwrap_or_else(|| self.app.clone())),
            home_page_url: None,
            status_page_url: None,
            health_check_url: None,
            data_center_info: self.data_center_info.clone().unwrap_or_default(),
            metadata: self.metadata.clone(),
        };

        let endpoint = instance.endpoint();
        let instance_id = self.instance_id.clone().unwrap_or_else(|| {
            let port = instance.active_port().unwrap_or(endpoint.port);
            format!("{}:{}:{}", self.host_name, self.app, port)
        });

        instance.home_page_url = Some(
            self.home_page_url
                .clone()
                .unwrap_or_else(|| format!("{endpoint}/")),
        );
        instance.status_page_url = Some(
            self.status_page_url
                .clone()
                .unwrap_or_else(|| format!("{endpoint}/info")),
        );
        instance.health_check_url = Some(
            self.health_check_url
                .clone()
                .unwrap_or_else(|| format!("{endpoint}/health")),
        );
        instance
            .metadata
            .insert("instanceId".to_string(), instance_id.clone());
        instance.instance_id = Some(instance_id);

        Ok(instance)
    }
}
