use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{Instrument, error, info};

use crate::client::{ClientInner, ClientState, RegisterOutcome, RegistrationState};
use crate::error::TransportError;
use crate::transport::RegistryRequest;

/// Status the registry answers a successful registration with.
pub const REGISTERED_STATUS: u16 = 204;

impl ClientInner {
    /// Registers the instance. `fired` carries the generation of the retry timer that
    /// triggered this attempt; direct calls pass `None` and cancel any pending retry.
    pub(crate) fn register(self: Arc<Self>, fired: Option<u64>) -> BoxFuture<'static, RegisterOutcome> {
        async move {
            let generation = {
                let mut state = self.state.lock();
                if let Some(generation) = fired {
                    if !state.register_retry.claim(generation) {
                        return RegisterOutcome::Superseded;
                    }
                }
                begin_registration(&mut state)
            };
            self.attempt_registration(generation).await
        }
        .boxed()
    }

    /// Sends one registration for a generation opened with [`begin_registration`].
    pub(crate) async fn attempt_registration(self: Arc<Self>, generation: u64) -> RegisterOutcome {
        info!("registering with eureka");

        match self.send_registration().await {
            Ok(()) => {
                metrics::counter!("eureka_client_registrations_total", "outcome" => "success").increment(1);
                self.on_registered(generation)
            }
            Err(e) => {
                metrics::counter!("eureka_client_registrations_total", "outcome" => "failure").increment(1);
                error!(error = %e, "registration failure");

                let retry_in = self.config.register_retry_interval;
                let retry = self.clone().register(Some(generation)).map(drop);
                let mut state = self.state.lock();
                if state.register_retry.schedule(generation, retry_in, &self.span, retry) {
                    info!("retrying registration in {:?}", retry_in);
                    RegisterOutcome::RetryScheduled
                } else {
                    RegisterOutcome::Superseded
                }
            }
        }
    }

    fn on_registered(self: &Arc<Self>, generation: u64) -> RegisterOutcome {
        let (heartbeat, registry) = {
            let mut state = self.state.lock();
            if !state.register_retry.is_current(generation) {
                return RegisterOutcome::Superseded;
            }
            state.registration = RegistrationState::Registered;
            state.failed_heartbeat_attempts = 0;
            (state.heartbeat.restart(), state.registry.restart())
        };

        info!("registered with {}", self.config.eureka_host);
        info!("hostname is {}", self.instance.host_name);
        info!("instance ID is {}", self.instance_id());

        info!("starting registry fetcher at interval of {:?}", self.config.registry_interval);
        tokio::spawn(self.clone().registry_tick(registry).instrument(self.span.clone()));

        info!("starting heartbeats at interval of {:?}", self.config.heartbeat_interval);
        tokio::spawn(self.clone().heartbeat_tick(heartbeat).instrument(self.span.clone()));

        RegisterOutcome::Registered
    }

    async fn send_registration(&self) -> Result<(), TransportError> {
        let request = RegistryRequest::register(&self.instance)?;
        let path = request.path();
        let res = self.transport.call(request).await?;
        if res.status == REGISTERED_STATUS {
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus {
                method: "POST",
                path,
                status: res.status,
            })
        }
    }

    /// Removes the instance from the registry. No retry, no state change.
    pub(crate) async fn deregister(&self) -> Result<(), TransportError> {
        let request = RegistryRequest::deregister(&self.instance.app, self.instance_id());
        let path = request.path();
        let res = self.transport.call(request).await?;
        if res.is_success() {
            info!("deregistered from {}", self.config.eureka_host);
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus {
                method: "DELETE",
                path,
                status: res.status,
            })
        }
    }
}

/// Opens a registration generation, cancelling any pending retry.
pub(crate) fn begin_registration(state: &mut ClientState) -> u64 {
    state.registration = RegistrationState::Registering;
    state.register_retry.restart()
}
