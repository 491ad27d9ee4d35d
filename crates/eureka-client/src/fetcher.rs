use std::sync::Arc;

use eureka_core::RegistryListing;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error};

use crate::client::ClientInner;
use crate::error::TransportError;
use crate::transport::RegistryRequest;

impl ClientInner {
    /// Replaces the cache with the registry's current listing.
    /// On any failure the previous snapshot stays in place.
    pub(crate) async fn fetch_registry(&self) -> Result<(), TransportError> {
        let result = self.load_registry().await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("eureka_client_registry_fetches_total", "outcome" => outcome).increment(1);
        result
    }

    async fn load_registry(&self) -> Result<(), TransportError> {
        let request = RegistryRequest::fetch_registry();
        let path = request.path();
        let res = self.transport.call(request).await?;
        if !res.is_success() {
            return Err(TransportError::UnexpectedStatus {
                method: "GET",
                path,
                status: res.status,
            });
        }

        let applications = res.json::<RegistryListing>()?.into_applications();
        debug!(applications = applications.len(), "fetched registry");
        self.cache.replace(applications);
        Ok(())
    }

    pub(crate) async fn start_registry_fetcher(self: Arc<Self>) {
        let generation = self.state.lock().registry.restart();
        self.registry_tick(generation).await;
    }

    pub(crate) fn registry_tick(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            if !self.state.lock().registry.is_current(generation) {
                return;
            }
            if let Err(e) = self.fetch_registry().await {
                error!(error = %e, "registry fetch error");
            }

            let next = self.clone().registry_fired(generation);
            self.state
                .lock()
                .registry
                .schedule(generation, self.config.registry_interval, &self.span, next);
        }
        .boxed()
    }

    fn registry_fired(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            if !self.state.lock().registry.claim(generation) {
                return;
            }
            self.registry_tick(generation).await;
        }
        .boxed()
    }
}
