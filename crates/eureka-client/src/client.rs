use std::sync::Arc;

use eureka_core::{Applications, ConfigError, Endpoint, Instance, InstanceConfig, ServiceUnavailable};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, info, info_span};

use crate::cache::RegistryCache;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::resolver::InstanceResolver;
use crate::task::TaskSlot;
use crate::transport::{HttpTransport, LivenessProbe, RegistryTransport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Registering,
    Registered,
}

/// What a registration attempt ended in. Failures never escape: they schedule a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    RetryScheduled,
    /// A newer registration or a shutdown took over while this attempt was in flight.
    Superseded,
}

#[derive(Debug, Default)]
pub(crate) struct ClientState {
    pub(crate) failed_heartbeat_attempts: u32,
    pub(crate) registration: RegistrationState,
    pub(crate) register_retry: TaskSlot,
    pub(crate) heartbeat: TaskSlot,
    pub(crate) registry: TaskSlot,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) instance: Instance,
    pub(crate) transport: Arc<dyn RegistryTransport>,
    pub(crate) probe: Arc<dyn LivenessProbe>,
    pub(crate) cache: RegistryCache,
    pub(crate) state: Mutex<ClientState>,
    pub(crate) span: Span,
}

impl ClientInner {
    pub(crate) fn instance_id(&self) -> &str {
        self.instance
            .instance_id
            .as_deref()
            .unwrap_or(&self.instance.host_name)
    }
}

/// Keeps the local instance registered and serves lookups of other applications.
///
/// Cloning is cheap; all clones drive the same registration.
#[derive(Clone)]
pub struct EurekaClient {
    inner: Arc<ClientInner>,
}

pub struct EurekaClientBuilder {
    config: ClientConfig,
    instance: InstanceConfig,
    transport: Option<Arc<dyn RegistryTransport>>,
    probe: Option<Arc<dyn LivenessProbe>>,
    span: Option<Span>,
}

impl EurekaClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn RegistryTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Span every log line and background task of the client is recorded under.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<EurekaClient, ConfigError> {
        self.config.validate()?;
        let instance = self.instance.build()?;

        let transport: Arc<dyn RegistryTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config.eureka_host)?),
        };
        let probe: Arc<dyn LivenessProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpTransport::new(&self.config.eureka_host)?),
        };
        let span = self.span.unwrap_or_else(|| {
            info_span!(
                "eureka_client",
                app = %instance.app,
                instance_id = instance.instance_id.as_deref().unwrap_or_default()
            )
        });

        Ok(EurekaClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                instance,
                transport,
                probe,
                cache: RegistryCache::new(),
                state: Mutex::new(ClientState::default()),
                span,
            }),
        })
    }
}

impl EurekaClient {
    pub fn builder(config: ClientConfig, instance: InstanceConfig) -> EurekaClientBuilder {
        EurekaClientBuilder {
            config,
            instance,
            transport: None,
            probe: None,
            span: None,
        }
    }

    /// Client talking HTTP to `config.eureka_host`.
    pub fn new(config: ClientConfig, instance: InstanceConfig) -> Result<Self, ConfigError> {
        Self::builder(config, instance).build()
    }

    pub fn instance(&self) -> &Instance {
        &self.inner.instance
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Registers in the background; the loops keep running until [`EurekaClient::shutdown`].
    pub fn start(&self) -> JoinHandle<RegisterOutcome> {
        let inner = self.inner.clone();
        tokio::spawn(inner.clone().register(None).instrument(inner.span.clone()))
    }

    /// One registration attempt. On failure a retry is already scheduled when this returns.
    pub async fn register(&self) -> RegisterOutcome {
        self.inner
            .clone()
            .register(None)
            .instrument(self.inner.span.clone())
            .await
    }

    pub fn stop_register_retry(&self) {
        self.inner.state.lock().register_retry.stop();
    }

    pub async fn deregister(&self) -> Result<(), TransportError> {
        self.inner.deregister().instrument(self.inner.span.clone()).await
    }

    pub async fn send_heartbeat(&self) -> Result<(), TransportError> {
        self.inner.send_heartbeat().instrument(self.inner.span.clone()).await
    }

    /// Sends a heartbeat now and keeps sending them every `heartbeat_interval`.
    pub async fn start_heartbeats(&self) {
        self.inner
            .clone()
            .start_heartbeats()
            .instrument(self.inner.span.clone())
            .await
    }

    pub fn stop_heartbeats(&self) {
        self.inner.state.lock().heartbeat.stop();
    }

    pub async fn fetch_registry(&self) -> Result<(), TransportError> {
        self.inner.fetch_registry().instrument(self.inner.span.clone()).await
    }

    /// Fetches the registry now and again every `registry_interval`.
    pub async fn start_registry_fetcher(&self) {
        self.inner
            .clone()
            .start_registry_fetcher()
            .instrument(self.inner.span.clone())
            .await
    }

    pub fn stop_registry_fetcher(&self) {
        self.inner.state.lock().registry.stop();
    }

    /// Address of a live instance of `app`, trying cached instances from `attempt` on.
    pub async fn resolve(&self, app: &str, attempt: usize) -> Result<Endpoint, ServiceUnavailable> {
        InstanceResolver::new(&self.inner.cache, self.inner.probe.as_ref())
            .resolve(app, attempt)
            .instrument(self.inner.span.clone())
            .await
    }

    pub fn applications(&self) -> Arc<Applications> {
        self.inner.cache.snapshot()
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.inner.cache
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.inner.state.lock().registration
    }

    pub fn failed_heartbeat_attempts(&self) -> u32 {
        self.inner.state.lock().failed_heartbeat_attempts
    }

    pub fn is_register_retry_scheduled(&self) -> bool {
        self.inner.state.lock().register_retry.is_scheduled()
    }

    pub fn is_heartbeat_scheduled(&self) -> bool {
        self.inner.state.lock().heartbeat.is_scheduled()
    }

    pub fn is_registry_fetch_scheduled(&self) -> bool {
        self.inner.state.lock().registry.is_scheduled()
    }

    /// Stops all loops. Calls already in flight finish but schedule nothing further.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        state.register_retry.stop();
        state.heartbeat.stop();
        state.registry.stop();
        state.registration = RegistrationState::Unregistered;
        let _enter = self.inner.span.enter();
        info!("stopped registration, heartbeats and registry fetcher");
    }

    pub async fn shutdown_and_deregister(&self) -> Result<(), TransportError> {
        self.shutdown();
        self.deregister().await
    }
}
