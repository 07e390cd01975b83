//! Configuration management for CliniGate

use anyhow::{Context, Result};
use std::env;

use crate::crypto::DecryptFallback;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Field encryption configuration
    pub crypto: CryptoConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Account lockout configuration
    pub lockout: LockoutConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// Field encryption configuration
#[derive(Debug, Clone)]
pub struct CryptoConfig {
    /// Base64-encoded 256-bit key for AES-256-GCM field encryption
    pub key_base64: String,
    /// What decrypt does with values it cannot authenticate:
    /// - "legacy-plaintext": return the stored value as-is (pre-encryption rows)
    /// - "reject": propagate the error
    pub decrypt_fallback: DecryptFallback,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Requests allowed per window
    pub max_requests: u64,
    /// Window size in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Account lockout configuration
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Failed attempts before the account locks
    pub max_attempts: u32,
    /// How long a lock lasts, in seconds
    pub duration_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            duration_secs: 1800,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log output format: "text" or "json"
    pub log_format: String,
    /// Whether the Prometheus /metrics endpoint is exposed
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "clinigate".to_string()),
                access_token_ttl_secs: env::var("JWT_ACCESS_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .unwrap_or(900),
                refresh_token_ttl_secs: env::var("JWT_REFRESH_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "604800".to_string())
                    .parse()
                    .unwrap_or(604800),
            },
            crypto: CryptoConfig {
                key_base64: env::var("FIELD_ENCRYPTION_KEY")
                    .context("FIELD_ENCRYPTION_KEY is required")?,
                decrypt_fallback: env::var("FIELD_DECRYPT_FALLBACK")
                    .unwrap_or_else(|_| "legacy-plaintext".to_string())
                    .parse()
                    .context("Invalid FIELD_DECRYPT_FALLBACK")?,
            },
            rate_limit: RateLimitConfig {
                enabled: env::var("RATE_LIMIT_ENABLED")
                    .map(|s| s.to_lowercase() != "false")
                    .unwrap_or(true),
                max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
                window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
            lockout: LockoutConfig {
                max_attempts: env::var("LOCKOUT_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                duration_secs: env::var("LOCKOUT_DURATION_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "test".to_string(),
                access_token_ttl_secs: 900,
                refresh_token_ttl_secs: 604800,
            },
            crypto: CryptoConfig {
                key_base64: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string(),
                decrypt_fallback: DecryptFallback::LegacyPlaintext,
            },
            rate_limit: RateLimitConfig::default(),
            lockout: LockoutConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_config_http_addr() {
        let config = test_config();
        assert_eq!(config.http_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_http_addr_custom() {
        let mut config = test_config();
        config.http_host = "0.0.0.0".to_string();
        config.http_port = 3000;

        assert_eq!(config.http_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_config_clone() {
        let config1 = test_config();
        let config2 = config1.clone();

        assert_eq!(config1.http_host, config2.http_host);
        assert_eq!(config1.jwt.secret, config2.jwt.secret);
        assert_eq!(config1.rate_limit.max_requests, config2.rate_limit.max_requests);
    }

    #[test]
    fn test_config_debug() {
        let config = test_config();
        let debug_str = format!("{:?}", config);

        assert!(debug_str.contains("Config"));
        assert!(debug_str.contains("http_host"));
        assert!(debug_str.contains("127.0.0.1"));
    }

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_lockout_config_default() {
        let config = LockoutConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.duration_secs, 1800);
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_format, "text");
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_jwt_config_ttls() {
        let config = test_config();
        assert!(config.jwt.access_token_ttl_secs < config.jwt.refresh_token_ttl_secs);
    }
}
