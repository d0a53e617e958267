//! Configuration for the chat server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `CHAT_BIND_ADDR`       (default: "127.0.0.1:50052")
//! - `CHAT_OUTBOX_CAPACITY` (default: "64")
//!
//! The server binary also accepts the bind address as its first argument.

use std::env;
use std::str::FromStr;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:50052";

/// Default per-client outbound queue size
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `host:port` to listen on.
    pub bind_addr: String,

    /// Events buffered per client before further broadcasts are dropped for it.
    pub outbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr = env::var("CHAT_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let outbox_capacity = read_env_or_default("CHAT_OUTBOX_CAPACITY", DEFAULT_OUTBOX_CAPACITY)?;

        if outbox_capacity == 0 {
            return Err("CHAT_OUTBOX_CAPACITY must be at least 1".into());
        }

        Ok(Config {
            bind_addr,
            outbox_capacity,
        })
    }

    /// Replace the bind address, e.g. from a command-line argument.
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
