use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Redis
    pub redis_url: String,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Auth
    pub jwt_secret: String,

    // Progress sweep
    pub progress_sweep_interval_hours: u64,
    pub progress_sweep_on_startup: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Database
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10);

        // Redis
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string());
        let redis_cache_ttl_seconds = parse_or("REDIS_CACHE_TTL_SECONDS", 3600); // 1 hour default

        // CORS
        let cors_allow_origins = parse_origins(
            &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
        );

        // Auth
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        // Progress sweep (daily by default)
        let progress_sweep_interval_hours =
            parse_or("PROGRESS_SWEEP_INTERVAL_HOURS", 24_u64).max(1);
        let progress_sweep_on_startup = parse_or("PROGRESS_SWEEP_ON_STARTUP", false);

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            jwt_secret,
            progress_sweep_interval_hours,
            progress_sweep_on_startup,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
