use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::health::InstanceStatus;
use crate::protocol::{Endpoint, Protocol};

pub const DEFAULT_DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";

/// A port as the registry encodes it: `{ "$": 8080, "@enabled": "true" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    #[serde(
        rename = "$",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::port_number"
    )]
    pub value: Option<u16>,
    #[serde(rename = "@enabled", default, with = "wire::flag")]
    pub enabled: bool,
}

impl PortInfo {
    pub fn enabled(value: u16) -> Self {
        Self {
            value: Some(value),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    pub name: String,
    #[serde(rename = "@class", default = "default_data_center_class")]
    pub class: String,
}

fn default_data_center_class() -> String {
    DEFAULT_DATA_CENTER_CLASS.to_string()
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        Self {
            name: "MyOwn".to_string(),
            class: default_data_center_class(),
        }
    }
}

/// One running copy of a service, as registered with and listed by the registry.
///
/// Every field tolerates absence on decode: registry listings are produced by
/// other clients and only `hostName` plus the ports matter for resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub ip_addr: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub port: PortInfo,
    #[serde(default)]
    pub secure_port: PortInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<String>,
    #[serde(default)]
    pub data_center_info: DataCenterInfo,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Instance {
    /// Address this instance is reached at.
    ///
    /// The secure port wins whenever it is enabled, then the plain port,
    /// then plain http on port 80.
    pub fn endpoint(&self) -> Endpoint {
        let (protocol, port) = if self.secure_port.enabled {
            (Protocol::Https, self.secure_port.value)
        } else if self.port.enabled {
            (Protocol::Http, self.port.value)
        } else {
            (Protocol::Http, None)
        };

        Endpoint {
            protocol,
            host: self.host_name.clone(),
            port: port.unwrap_or_else(|| protocol.default_port()),
        }
    }

    /// Port the local server listens on: the plain port when enabled, else the secure one.
    pub fn active_port(&self) -> Option<u16> {
        if self.port.enabled {
            self.port.value
        } else {
            self.secure_port.value
        }
    }

    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }
}

mod wire {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose<T> {
        Typed(T),
        Text(String),
    }

    pub fn port_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
        Ok(match Option::<Loose<u16>>::deserialize(d)? {
            Some(Loose::Typed(port)) => Some(port),
            Some(Loose::Text(text)) => text.trim().parse().ok(),
            None => None,
        })
    }

    pub mod flag {
        use super::*;

        pub fn serialize<S: Serializer>(enabled: &bool, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(if *enabled { "true" } else { "false" })
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
            Ok(match Option::<Loose<bool>>::deserialize(d)? {
                Some(Loose::Typed(enabled)) => enabled,
                Some(Loose::Text(text)) => text == "true",
                None => false,
            })
        }
    }
}
