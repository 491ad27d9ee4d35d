use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use crate::client::ClientInner;
use crate::error::TransportError;
use crate::registration::begin_registration;
use crate::transport::RegistryRequest;

impl ClientInner {
    /// One liveness ping. Failures are returned, never acted on here.
    pub(crate) async fn send_heartbeat(&self) -> Result<(), TransportError> {
        let request = RegistryRequest::heartbeat(&self.instance.app, self.instance_id());
        let path = request.path();
        let res = self.transport.call(request).await?;
        if res.is_success() {
            debug!("sent heartbeat");
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus {
                method: "PUT",
                path,
                status: res.status,
            })
        }
    }

    pub(crate) async fn start_heartbeats(self: Arc<Self>) {
        let generation = self.state.lock().heartbeat.restart();
        self.heartbeat_tick(generation).await;
    }

    /// Sends a heartbeat, then either schedules the next one or, once more than
    /// `retry_register_after` consecutive heartbeats failed, re-registers instead.
    /// Only a successful registration resets the failure count.
    pub(crate) fn heartbeat_tick(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            if !self.state.lock().heartbeat.is_current(generation) {
                return;
            }
            let result = self.send_heartbeat().await;

            // Re-registration opens its generation under the lock that counted the failure;
            // a later shutdown supersedes it.
            let reregister = {
                let mut state = self.state.lock();
                if !state.heartbeat.is_current(generation) {
                    return;
                }

                let escalate = match result {
                    Ok(()) => {
                        metrics::counter!("eureka_client_heartbeats_total", "outcome" => "success").increment(1);
                        false
                    }
                    Err(e) => {
                        metrics::counter!("eureka_client_heartbeats_total", "outcome" => "failure").increment(1);
                        state.failed_heartbeat_attempts += 1;
                        error!(
                            attempt = state.failed_heartbeat_attempts,
                            error = %e,
                            "heartbeat error"
                        );
                        state.failed_heartbeat_attempts > self.config.retry_register_after
                    }
                };

                if escalate {
                    Some(begin_registration(&mut state))
                } else {
                    let next = self.clone().heartbeat_fired(generation);
                    state
                        .heartbeat
                        .schedule(generation, self.config.heartbeat_interval, &self.span, next);
                    None
                }
            };

            if let Some(registration) = reregister {
                warn!(
                    tolerated = self.config.retry_register_after,
                    "too many failed heartbeats, registering again"
                );
                self.attempt_registration(registration).await;
            }
        }
        .boxed()
    }

    fn heartbeat_fired(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            if !self.state.lock().heartbeat.claim(generation) {
                return;
            }
            self.heartbeat_tick(generation).await;
        }
        .boxed()
    }
}
