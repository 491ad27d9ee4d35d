#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eureka_client::{
    ClientConfig, EurekaClient, LivenessProbe, Operation, RegistryRequest, RegistryResponse,
    RegistryTransport, TransportError,
};
use eureka_core::{Instance, InstanceConfig};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Json(u16, Value),
    Fail,
    /// Answers with the inner reply once the delay has passed.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    async fn into_result(self, request: &RegistryRequest) -> Result<RegistryResponse, TransportError> {
        let reply = match self {
            Reply::Delayed(delay, reply) => {
                tokio::time::sleep(delay).await;
                *reply
            }
            reply => reply,
        };
        match reply {
            Reply::Status(status) => Ok(RegistryResponse::new(status)),
            Reply::Json(status, body) => Ok(RegistryResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }),
            Reply::Fail => Err(TransportError::Unreachable(request.path())),
            Reply::Delayed(..) => unreachable!("delays do not nest"),
        }
    }
}

/// Registry stand-in: scripted replies per operation, then a fallback reply.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RegistryRequest>>,
    scripted: Mutex<HashMap<Operation, VecDeque<Reply>>>,
    fallback: Mutex<HashMap<Operation, Reply>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let mock = Self::default();
        {
            let mut fallback = mock.fallback.lock();
            fallback.insert(Operation::Register, Reply::Status(204));
            fallback.insert(Operation::Heartbeat, Reply::Status(200));
            fallback.insert(Operation::Deregister, Reply::Status(200));
            fallback.insert(
                Operation::FetchRegistry,
                Reply::Json(200, serde_json::json!({ "applications": {} })),
            );
        }
        Arc::new(mock)
    }

    pub fn always(&self, operation: Operation, reply: Reply) {
        self.fallback.lock().insert(operation, reply);
    }

    pub fn then(&self, operation: Operation, replies: impl IntoIterator<Item = Reply>) {
        self.scripted
            .lock()
            .entry(operation)
            .or_default()
            .extend(replies);
    }

    pub fn calls(&self) -> Vec<RegistryRequest> {
        self.calls.lock().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }
}

#[async_trait]
impl RegistryTransport for MockTransport {
    async fn call(&self, request: RegistryRequest) -> Result<RegistryResponse, TransportError> {
        self.calls.lock().push(request.clone());
        let scripted = self
            .scripted
            .lock()
            .get_mut(&request.operation)
            .and_then(VecDeque::pop_front);
        let reply = match scripted {
            Some(reply) => reply,
            None => self.fallback.lock()[&request.operation].clone(),
        };
        reply.into_result(&request).await
    }
}

/// Liveness probe that fails for a configured set of host names.
#[derive(Default)]
pub struct MockProbe {
    down: Mutex<HashSet<String>>,
    probed: Mutex<Vec<String>>,
}

impl MockProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_down(hosts: &[&str]) -> Arc<Self> {
        let probe = Self::default();
        probe
            .down
            .lock()
            .extend(hosts.iter().map(|host| host.to_string()));
        Arc::new(probe)
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().clone()
    }
}

#[async_trait]
impl LivenessProbe for MockProbe {
    async fn probe(&self, instance: &Instance) -> Result<(), TransportError> {
        self.probed.lock().push(instance.host_name.clone());
        if self.down.lock().contains(&instance.host_name) {
            Err(TransportError::Unreachable(instance.host_name.clone()))
        } else {
            Ok(())
        }
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new("http://eureka.test/eureka")
}

pub fn instance_config() -> InstanceConfig {
    InstanceConfig::new("myApp", "myapp.local")
        .port(3000)
        .instance_id("myApp123")
}

pub fn client_with(
    config: ClientConfig,
    transport: &Arc<MockTransport>,
    probe: &Arc<MockProbe>,
) -> EurekaClient {
    EurekaClient::builder(config, instance_config())
        .transport(transport.clone())
        .probe(probe.clone())
        .build()
        .unwrap()
}

pub fn client(transport: &Arc<MockTransport>) -> EurekaClient {
    client_with(config(), transport, &MockProbe::new())
}
