use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Relay server configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port for the WebSocket listener (also serves the query surface when no
    /// monitor port is configured)
    pub relay_port: u16,
    /// Optional separate port for the read-only query surface
    pub monitor_port: Option<u16>,
    /// Maximum inbound frame size; oversize frames close the connection
    pub max_payload_bytes: usize,
    /// Liveness probe interval
    pub heartbeat_interval: Duration,
    /// Room used when a join envelope carries no roomId
    pub default_room: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_port: 4000,
            monitor_port: None,
            max_payload_bytes: 1024 * 1024, // 1 MiB
            heartbeat_interval: Duration::from_secs(30),
            default_room: "main".to_string(),
        }
    }
}

impl RelayConfig {
    /// Reads configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an injectable lookup, so tests never touch
    /// the process-global environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let relay_port = parse_or("RELAY_PORT", &lookup, defaults.relay_port)?;
        let monitor_port = match lookup("MONITOR_PORT") {
            Some(value) => Some(parse_value("MONITOR_PORT", &value)?),
            None => None,
        };
        let max_payload_bytes =
            parse_or("MAX_PAYLOAD_BYTES", &lookup, defaults.max_payload_bytes)?;

        let heartbeat_secs: u64 = parse_or(
            "HEARTBEAT_INTERVAL_SECS",
            &lookup,
            defaults.heartbeat_interval.as_secs(),
        )?;
        // A zero interval would busy-loop the probe timer
        if heartbeat_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "HEARTBEAT_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let default_room = lookup("DEFAULT_ROOM").unwrap_or(defaults.default_room);

        Ok(Self {
            relay_port,
            monitor_port,
            max_payload_bytes,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            default_room,
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => parse_value(name, &value),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
}
