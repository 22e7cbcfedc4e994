use serde::{Deserialize, Serialize};
use std::env;

/// Thirty days, the lifetime of every credential cookie.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub gate: GateConfig,
    pub server: ServerConfig,
    pub socket: SocketConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Base URL of the REST backend that serves `/user/me`.
    pub backend_url: String,
    pub login_path: String,
    pub cookie_max_age_secs: u64,
    pub secure_cookies: bool,
    /// No timeout unless explicitly configured.
    pub validation_timeout_ms: Option<u64>,
    /// Optional YAML route table read once at startup.
    pub routes_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    pub url: String,
    pub auto_connect: bool,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_env_overrides(mut self) -> Self {
        // Gate overrides
        if let Ok(v) = env::var("GATE_BACKEND_URL") {
            self.gate.backend_url = v;
        }
        if let Ok(v) = env::var("GATE_LOGIN_PATH") {
            self.gate.login_path = v;
        }
        if let Ok(v) = env::var("GATE_COOKIE_MAX_AGE_SECS") {
            self.gate.cookie_max_age_secs = v.parse().unwrap_or(self.gate.cookie_max_age_secs);
        }
        if let Ok(v) = env::var("GATE_VALIDATION_TIMEOUT_MS") {
            self.gate.validation_timeout_ms = v.parse().ok();
        }
        if let Ok(v) = env::var("GATE_ROUTES_FILE") {
            self.gate.routes_file = Some(v).filter(|s| !s.trim().is_empty());
        }

        // Server overrides
        if let Some(port) = env::var("GATE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Socket overrides
        if let Ok(v) = env::var("SOCKET_URL") {
            self.socket.url = v;
        }
        if let Ok(v) = env::var("SOCKET_RECONNECT_ATTEMPTS") {
            self.socket.reconnect_attempts = v.parse().unwrap_or(self.socket.reconnect_attempts);
        }
        if let Ok(v) = env::var("SOCKET_RECONNECT_DELAY_MS") {
            self.socket.reconnect_delay_ms = v.parse().unwrap_or(self.socket.reconnect_delay_ms);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            gate: GateConfig {
                backend_url: "http://localhost:5000/api".to_string(),
                login_path: "/login".to_string(),
                cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
                secure_cookies: false,
                validation_timeout_ms: None,
                routes_file: None,
            },
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                enable_request_logging: true,
            },
            socket: SocketConfig {
                url: "ws://localhost:5000/socket".to_string(),
                auto_connect: false,
                reconnect_attempts: 5,
                reconnect_delay_ms: 1000,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            gate: GateConfig {
                backend_url: "https://api.staging.example.com/api".to_string(),
                login_path: "/login".to_string(),
                cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
                secure_cookies: false,
                validation_timeout_ms: None,
                routes_file: None,
            },
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_request_logging: true,
            },
            socket: SocketConfig {
                url: "wss://api.staging.example.com/socket".to_string(),
                auto_connect: false,
                reconnect_attempts: 5,
                reconnect_delay_ms: 1000,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            gate: GateConfig {
                backend_url: "https://api.example.com/api".to_string(),
                login_path: "/login".to_string(),
                cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
                secure_cookies: true,
                validation_timeout_ms: None,
                routes_file: None,
            },
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_request_logging: false,
            },
            socket: SocketConfig {
                url: "wss://api.example.com/socket".to_string(),
                auto_connect: false,
                reconnect_attempts: 5,
                reconnect_delay_ms: 1000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.gate.secure_cookies);
        assert_eq!(config.gate.cookie_max_age_secs, 2_592_000);
        assert_eq!(config.gate.login_path, "/login");
        assert!(!config.socket.auto_connect);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(config.gate.secure_cookies);
        assert!(config.gate.validation_timeout_ms.is_none());
        assert!(!config.server.enable_request_logging);
    }
}
