use std::collections::HashMap;

use serde::Deserialize;

use crate::instance::Instance;

/// Registry snapshot keyed by application name.
pub type Applications = HashMap<String, Vec<Instance>>;

/// The registry answers with a bare value when there is exactly one element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Body of `GET /apps`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryListing {
    pub applications: ApplicationList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationList {
    #[serde(default)]
    pub application: Option<OneOrMany<Application>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub instance: Option<OneOrMany<Instance>>,
}

impl RegistryListing {
    /// Flattens the scalar-or-array encoding into one ordered list per application.
    pub fn into_applications(self) -> Applications {
        self.applications
            .application
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|app| {
                let instances = app.instance.map(OneOrMany::into_vec).unwrap_or_default();
                (app.name, instances)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Applications {
        serde_json::from_value::<RegistryListing>(value)
            .unwrap()
            .into_applications()
    }

    #[test]
    fn single_application_with_single_instance() {
        let apps = parse(json!({
            "applications": {
                "application": { "name": "foo", "instance": { "hostName": "a" } }
            }
        }));

        assert_eq!(apps.len(), 1);
        assert_eq!(apps["foo"].len(), 1);
        assert_eq!(apps["foo"][0].host_name, "a");
    }

    #[test]
    fn many_applications_keep_instance_order() {
        let apps = parse(json!({
            "applications": {
                "versions__delta": "1",
                "application": [
                    { "name": "foo", "instance": [{ "hostName": "a" }, { "hostName": "b" }] },
                    { "name": "BAR", "instance": { "hostName": "c" } }
                ]
            }
        }));

        let hosts: Vec<_> = apps["foo"].iter().map(|i| i.host_name.as_str()).collect();
        assert_eq!(hosts, ["a", "b"]);
        assert_eq!(apps["BAR"][0].host_name, "c");
        assert!(!apps.contains_key("bar"));
    }

    #[test]
    fn empty_registry_and_empty_application() {
        assert!(parse(json!({ "applications": {} })).is_empty());

        let apps = parse(json!({
            "applications": { "application": { "name": "idle" } }
        }));
        assert!(apps["idle"].is_empty());
    }
}
