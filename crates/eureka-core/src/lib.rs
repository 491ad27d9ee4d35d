pub mod descriptor;
pub mod errors;
pub mod health;
pub mod instance;
pub mod protocol;
pub mod registry;

pub use descriptor::{InstanceConfig, PortSpec};
pub use errors::{ConfigError, SERVICE_UNAVAILABLE, ServiceUnavailable, UnavailableReason};
pub use health::InstanceStatus;
pub use instance::{DataCenterInfo, Instance, PortInfo};
pub use protocol::{Endpoint, Protocol};
pub use registry::{Applications, OneOrMany, RegistryListing};
