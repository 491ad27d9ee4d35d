use eureka_core::{Endpoint, ServiceUnavailable, UnavailableReason};
use tracing::{debug, error, warn};

use crate::cache::RegistryCache;
use crate::transport::LivenessProbe;

/// Resolves an application name to the address of a live instance.
pub struct InstanceResolver<'a> {
    cache: &'a RegistryCache,
    probe: &'a dyn LivenessProbe,
}

impl<'a> InstanceResolver<'a> {
    pub fn new(cache: &'a RegistryCache, probe: &'a dyn LivenessProbe) -> Self {
        Self { cache, probe }
    }

    /// Probes candidates starting at `attempt` and returns the first one that answers.
    ///
    /// An application with a single instance has nothing to fail over to, so a failed
    /// probe reports the app as down instead of walking the list.
    pub async fn resolve(&self, app: &str, attempt: usize) -> Result<Endpoint, ServiceUnavailable> {
        let snapshot = self.cache.snapshot();
        let Some(instances) = snapshot.get(app) else {
            return Err(unavailable(app, UnavailableReason::NotInCache));
        };

        if let [only] = instances.as_slice() {
            return match self.probe.probe(only).await {
                Ok(()) => Ok(only.endpoint()),
                Err(e) => {
                    debug!(app, host = %only.host_name, error = %e, "liveness probe failed");
                    Err(unavailable(app, UnavailableReason::InstanceDown))
                }
            };
        }

        for (index, candidate) in instances.iter().enumerate().skip(attempt) {
            match self.probe.probe(candidate).await {
                Ok(()) => return Ok(candidate.endpoint()),
                Err(e) => warn!(
                    app,
                    index,
                    host = %candidate.host_name,
                    error = %e,
                    "liveness probe failed, trying next instance"
                ),
            }
        }

        Err(unavailable(app, UnavailableReason::NoInstancesLeft))
    }
}

fn unavailable(app: &str, reason: UnavailableReason) -> ServiceUnavailable {
    error!("{} is unreachable: {}", app, reason);
    ServiceUnavailable::new(app, reason)
}
