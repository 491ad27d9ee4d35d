use std::time::Duration;

use eureka_core::ConfigError;

pub const DEFAULT_REGISTER_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REGISTRY_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_REGISTER_AFTER: u32 = 3;

/// Timing and endpoint options of the client loops.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the registry, e.g. `http://localhost:8761/eureka`.
    pub eureka_host: String,
    pub register_retry_interval: Duration,
    pub heartbeat_interval: Duration,
    pub registry_interval: Duration,
    /// Consecutive heartbeat failures tolerated before re-registering.
    pub retry_register_after: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            eureka_host: String::new(),
            register_retry_interval: DEFAULT_REGISTER_RETRY_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            registry_interval: DEFAULT_REGISTRY_INTERVAL,
            retry_register_after: DEFAULT_RETRY_REGISTER_AFTER,
        }
    }
}

impl ClientConfig {
    pub fn new(eureka_host: impl Into<String>) -> Self {
        Self {
            eureka_host: eureka_host.into(),
            ..Self::default()
        }
    }

    /// Reads `EUREKA_*` variables, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let eureka_host = lookup("EUREKA_HOST").ok_or(ConfigError::Missing("EUREKA_HOST"))?;
        let mut config = Self::new(eureka_host);

        if let Some(raw) = lookup("EUREKA_REGISTER_RETRY_INTERVAL") {
            config.register_retry_interval = parse_seconds("EUREKA_REGISTER_RETRY_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("EUREKA_HEARTBEAT_INTERVAL") {
            config.heartbeat_interval = parse_seconds("EUREKA_HEARTBEAT_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("EUREKA_REGISTRY_INTERVAL") {
            config.registry_interval = parse_seconds("EUREKA_REGISTRY_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("EUREKA_RETRY_REGISTER_AFTER") {
            config.retry_register_after = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("EUREKA_RETRY_REGISTER_AFTER", format!("{e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eureka_host.trim().is_empty() {
            return Err(ConfigError::Missing("eurekaHost"));
        }
        for (option, interval) in [
            ("registerRetryInterval", self.register_retry_interval),
            ("heartbeatInterval", self.heartbeat_interval),
            ("registryInterval", self.registry_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::invalid(option, "interval must be greater than zero"));
            }
        }
        Ok(())
    }
}

/// Parses a number of seconds, fractions allowed.
pub fn parse_seconds(option: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(option, format!("{e}")))?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::invalid(option, format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_registry_conventions() {
        let config = ClientConfig::from_lookup(lookup(&[("EUREKA_HOST", "http://eureka:8761/eureka")])).unwrap();
        assert_eq!(config.register_retry_interval, Duration::from_secs(5));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.registry_interval, Duration::from_secs(15));
        assert_eq!(config.retry_register_after, 3);
    }

    #[test]
    fn overrides_accept_fractional_seconds() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("EUREKA_HOST", "http://eureka/eureka"),
            ("EUREKA_HEARTBEAT_INTERVAL", "0.5"),
            ("EUREKA_REGISTRY_INTERVAL", "30"),
            ("EUREKA_RETRY_REGISTER_AFTER", "0"),
        ]))
        .unwrap();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(500));
        assert_eq!(config.registry_interval, Duration::from_secs(30));
        assert_eq!(config.retry_register_after, 0);
    }

    #[test]
    fn missing_host_aborts() {
        assert_eq!(
            ClientConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("EUREKA_HOST")
        );
    }

    #[test]
    fn rejects_zero_and_garbage_intervals() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("EUREKA_HOST", "http://eureka/eureka"),
            ("EUREKA_HEARTBEAT_INTERVAL", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { option: "heartbeatInterval", .. }));

        let err = ClientConfig::from_lookup(lookup(&[
            ("EUREKA_HOST", "http://eureka/eureka"),
            ("EUREKA_REGISTRY_INTERVAL", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { option: "EUREKA_REGISTRY_INTERVAL", .. }));
    }
}
