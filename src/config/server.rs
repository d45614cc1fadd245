// src/config/server.rs
// Server, cache, and storage infrastructure configuration

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed_or, require_env};

/// HTTP server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parsed_or("PORT", 8080u16),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shadow vector store + local bookkeeping database (sqlx/SQLite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            path: env_or("DB_PATH", "./data/shadow.db"),
            max_connections: env_parsed_or("DB_MAX_CONNECTIONS", 8u32),
        }
    }

    pub fn connect_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path)
    }
}

/// Shared cache store backing rate limit counters and job queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub url: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            url: require_env("CACHE_STORE_URL"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: env_or("RUST_LOG", "info,meigo=debug"),
        }
    }
}

/// Upstream media service (audio/image fetch for ingestion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderBackendConfig {
    pub url: String,
    pub media_exception_token: String,
    pub media_exception_query: String,
}

impl SenderBackendConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("SENDER_BACKEND_URL", ""),
            media_exception_token: env_or("SENDER_BACKEND_MEDIA_EXCEPTION_TOKEN", ""),
            media_exception_query: env_or("SENDER_BACKEND_MEDIA_EXCEPTION_QUERY", "eq"),
        }
    }

    pub fn media_url(&self, key: &str) -> String {
        format!(
            "{}/api/v1/media/{}?token={}&{}=1",
            self.url.trim_end_matches('/'),
            key,
            self.media_exception_token,
            self.media_exception_query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_joins_host_and_port() {
        let cfg = ServerConfig { host: "0.0.0.0".to_string(), port: 8080 };
        assert_eq!(cfg.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn connect_url_is_a_read_write_create_sqlite_url() {
        let cfg = DatabaseConfig { path: "./data/shadow.db".to_string(), max_connections: 8 };
        assert_eq!(cfg.connect_url(), "sqlite://./data/shadow.db?mode=rwc");
    }

    #[test]
    fn media_url_strips_trailing_slash_from_the_base() {
        let cfg = SenderBackendConfig {
            url: "https://sender.example/".to_string(),
            media_exception_token: "tok".to_string(),
            media_exception_query: "eq".to_string(),
        };
        assert_eq!(cfg.media_url("abc123"), "https://sender.example/api/v1/media/abc123?token=tok&eq=1");
    }
}
