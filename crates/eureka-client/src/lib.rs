//! Client side of the Eureka service registry protocol.
//!
//! [`EurekaClient`] registers the local instance, keeps its lease alive with
//! heartbeats, mirrors the registry into a local cache and resolves application
//! names to live instances with failover.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
mod fetcher;
mod heartbeat;
pub mod registration;
pub mod resolver;
pub mod task;
pub mod transport;

pub use cache::RegistryCache;
pub use client::{EurekaClient, EurekaClientBuilder, RegisterOutcome, RegistrationState};
pub use config::ClientConfig;
pub use error::TransportError;
pub use registration::REGISTERED_STATUS;
pub use resolver::InstanceResolver;
pub use transport::{
    HttpTransport, LivenessProbe, Operation, RegistryRequest, RegistryResponse, RegistryTransport,
};
