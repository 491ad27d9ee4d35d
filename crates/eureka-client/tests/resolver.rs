mod common;

use common::{MockProbe, MockTransport, Reply, client_with, config};
use eureka_client::{InstanceResolver, Operation, RegistryCache};
use eureka_core::{Applications, Instance, PortInfo, UnavailableReason};
use serde_json::json;

fn host(name: &str) -> Instance {
    Instance {
        host_name: name.to_string(),
        status_page_url: Some(format!("http://{name}/info")),
        ..Instance::default()
    }
}

fn cache_with(app: &str, instances: Vec<Instance>) -> RegistryCache {
    let cache = RegistryCache::new();
    let mut apps = Applications::new();
    apps.insert(app.to_string(), instances);
    cache.replace(apps);
    cache
}

#[tokio::test]
async fn unknown_app_is_not_in_cache() {
    let cache = RegistryCache::new();
    let probe = MockProbe::new();

    let err = InstanceResolver::new(&cache, probe.as_ref())
        .resolve("unknownApp", 0)
        .await
        .unwrap_err();

    assert_eq!(err.reason, UnavailableReason::NotInCache);
    assert_eq!(err.status_code(), 503);
    assert!(probe.probed().is_empty());
}

#[tokio::test]
async fn single_instance_that_is_down_has_no_failover() {
    let cache = cache_with("foo", vec![host("a")]);
    let probe = MockProbe::with_down(&["a"]);

    let err = InstanceResolver::new(&cache, probe.as_ref())
        .resolve("foo", 0)
        .await
        .unwrap_err();

    assert_eq!(err.reason, UnavailableReason::InstanceDown);
    assert_eq!(err.status_code(), 503);
    assert_eq!(probe.probed(), ["a"]);
}

#[tokio::test]
async fn every_instance_is_tried_in_order_before_giving_up() {
    let cache = cache_with("foo", vec![host("a"), host("b"), host("c")]);
    let probe = MockProbe::with_down(&["a", "b", "c"]);

    let err = InstanceResolver::new(&cache, probe.as_ref())
        .resolve("foo", 0)
        .await
        .unwrap_err();

    assert_eq!(err.reason, UnavailableReason::NoInstancesLeft);
    assert_eq!(probe.probed(), ["a", "b", "c"]);
}

#[tokio::test]
async fn fails_over_to_the_next_live_instance() {
    let a = Instance {
        secure_port: PortInfo::enabled(443),
        ..host("a")
    };
    let b = Instance {
        port: PortInfo::enabled(8080),
        ..host("b")
    };
    let cache = cache_with("foo", vec![a, b]);
    let probe = MockProbe::with_down(&["a"]);

    let endpoint = InstanceResolver::new(&cache, probe.as_ref())
        .resolve("foo", 0)
        .await
        .unwrap();

    assert_eq!(endpoint.to_string(), "http://b:8080");
    assert_eq!(probe.probed(), ["a", "b"]);
}

#[tokio::test]
async fn attempt_index_selects_the_first_candidate() {
    let cache = cache_with("foo", vec![host("a"), host("b")]);
    let probe = MockProbe::new();
    let resolver = InstanceResolver::new(&cache, probe.as_ref());

    assert_eq!(resolver.resolve("foo", 1).await.unwrap().host, "b");

    let err = resolver.resolve("foo", 2).await.unwrap_err();
    assert_eq!(err.reason, UnavailableReason::NoInstancesLeft);
    assert_eq!(probe.probed(), ["b"]);
}

#[tokio::test]
async fn app_without_instances_has_none_left() {
    let cache = cache_with("idle", Vec::new());
    let probe = MockProbe::new();

    let err = InstanceResolver::new(&cache, probe.as_ref())
        .resolve("idle", 0)
        .await
        .unwrap_err();
    assert_eq!(err.reason, UnavailableReason::NoInstancesLeft);
}

#[tokio::test]
async fn secure_port_wins_and_port_80_is_the_fallback() {
    let probe = MockProbe::new();

    let both = Instance {
        secure_port: PortInfo::enabled(443),
        port: PortInfo::enabled(80),
        ..host("x")
    };
    let cache = cache_with("both", vec![both]);
    let endpoint = InstanceResolver::new(&cache, probe.as_ref()).resolve("both", 0).await.unwrap();
    assert_eq!(endpoint.to_string(), "https://x:443");

    let cache = cache_with("neither", vec![host("x")]);
    let endpoint = InstanceResolver::new(&cache, probe.as_ref()).resolve("neither", 0).await.unwrap();
    assert_eq!(endpoint.to_string(), "http://x:80");
}

#[tokio::test(start_paused = true)]
async fn client_resolves_from_the_fetched_registry() {
    let transport = MockTransport::new();
    transport.always(
        Operation::FetchRegistry,
        Reply::Json(200, json!({
            "applications": {
                "application": {
                    "name": "foo",
                    "instance": [
                        { "hostName": "a", "securePort": { "$": 443, "@enabled": "true" } },
                        { "hostName": "b", "port": { "$": 8080, "@enabled": "true" } }
                    ]
                }
            }
        })),
    );
    let probe = MockProbe::with_down(&["a"]);
    let client = client_with(config(), &transport, &probe);

    assert!(client.resolve("foo", 0).await.is_err_and(|e| e.reason == UnavailableReason::NotInCache));

    client.fetch_registry().await.unwrap();
    let endpoint = client.resolve("foo", 0).await.unwrap();
    assert_eq!(endpoint.to_string(), "http://b:8080");
}
