use std::env;

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use se_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_SPE_HOST: &str = "127.0.0.1";
const DEFAULT_SPE_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/splitease.db";
const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);
const DEFAULT_EVENT_BUFFER_SIZE: usize = 50;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Outbound expense-notification email settings. When absent, notifications are logged and dropped.
    pub smtp: SmtpConfig,
    /// Queue depth for each event hook before producers start backing off.
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPE_HOST.to_string(),
            port: DEFAULT_SPE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            smtp: SmtpConfig::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPE_HOST").ok().unwrap_or_else(|| DEFAULT_SPE_HOST.into());
        let port = env::var("SPE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for SPE_PORT. {e} Using the default, {DEFAULT_SPE_PORT}");
                    DEFAULT_SPE_PORT
                })
            })
            .unwrap_or(DEFAULT_SPE_PORT);
        let database_url = env::var("SPE_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("SPE_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let event_buffer_size = env::var("SPE_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            auth: AuthConfig::from_env_or_default(),
            smtp: SmtpConfig::from_env_or_default(),
            event_buffer_size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC key for signing and verifying access tokens.
    pub jwt_secret: Secret<String>,
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️ SPE_JWT_SECRET is not set. I'm using a random secret for this session; access tokens will not \
             survive a restart. Set SPE_JWT_SECRET in production."
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret), token_ttl: DEFAULT_TOKEN_TTL }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let token_ttl = env::var("SPE_JWT_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        match env::var("SPE_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => Self { jwt_secret: Secret::new(secret), token_ttl },
            _ => Self { token_ttl, ..Default::default() },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    /// The From address on outbound notifications.
    pub sender: String,
    pub enabled: bool,
}

impl SmtpConfig {
    pub fn from_env_or_default() -> Self {
        let username = env::var("SPE_SMTP_USER").unwrap_or_default();
        let password = env::var("SPE_SMTP_PASS").unwrap_or_default();
        let configured = !username.is_empty() && !password.is_empty();
        let enabled = configured && parse_boolean_flag(env::var("SPE_SMTP_ENABLED").ok(), true);
        if !configured {
            info!("📧️ SPE_SMTP_USER / SPE_SMTP_PASS are not set. Email notifications are disabled.");
        }
        Self {
            host: env::var("SPE_SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: env::var("SPE_SMTP_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(587),
            sender: env::var("SPE_SMTP_FROM").unwrap_or_else(|_| username.clone()),
            username,
            password: Secret::new(password),
            enabled,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_SPE_HOST);
        assert_eq!(config.port, DEFAULT_SPE_PORT);
        assert!(!config.smtp.is_configured());
        assert_eq!(config.auth.token_ttl, Duration::hours(24));
    }

    #[test]
    fn random_secrets_differ_between_sessions() {
        let a = AuthConfig::default();
        let b = AuthConfig::default();
        assert_ne!(a.jwt_secret.reveal(), b.jwt_secret.reveal());
    }
}
