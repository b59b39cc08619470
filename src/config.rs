//! Server configuration parsed from environment variables.

use axum::http::HeaderValue;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:9002";

/// Room set created at startup. Rooms outside this set do not exist:
/// joins see empty history and messages to them are dropped.
pub const DEFAULT_ROOMS: &[&str] = &["general", "tomato", "pest", "organic", "market"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("ROOMS must name at least one room")]
    EmptyRooms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Exact origin allowed for browser clients (CORS).
    pub allowed_origin: String,
    pub rooms: Vec<String>,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: bind address, default `0.0.0.0`
    /// - `PORT`: default 5000
    /// - `ALLOWED_ORIGIN`: CORS origin, default `http://localhost:9002`
    /// - `ROOMS`: comma-separated room ids, default
    ///   `general,tomato,pest,organic,market`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unparseable `PORT`, an `ALLOWED_ORIGIN`
    /// that is not a valid header value, or an empty `ROOMS` list.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGIN.to_string());
        if allowed_origin.parse::<HeaderValue>().is_err() {
            return Err(ConfigError::Invalid { var: "ALLOWED_ORIGIN", value: allowed_origin });
        }

        let rooms = match std::env::var("ROOMS") {
            Ok(raw) => parse_rooms(&raw)?,
            Err(_) => DEFAULT_ROOMS.iter().map(|r| (*r).to_string()).collect(),
        };

        Ok(Self { host, port, allowed_origin, rooms })
    }

    /// Address string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_rooms(raw: &str) -> Result<Vec<String>, ConfigError> {
    let rooms: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    if rooms.is_empty() {
        return Err(ConfigError::EmptyRooms);
    }
    Ok(rooms)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
