use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use smartdecision_ai::ProviderSettings;
use smartdecision_core::knowledge::DEFAULT_INGEST_WORKERS;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    /// Applies to every route except the streaming chat endpoint.
    pub request_timeout: Duration,
    pub upload_dir: String,
    pub ingest_workers: usize,
    pub providers: ProviderSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("SD_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid SD_LISTEN_ADDR")?;
        let db_path = env_or("SD_DB_PATH", "./db/app.db");
        let cors_allow = env_or("SD_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = env_or("SD_REQUEST_TIMEOUT_MS", "30000")
            .parse()
            .unwrap_or(30000);
        let upload_dir = env_or("SD_UPLOAD_DIR", "./uploads/knowledge");
        let ingest_workers = std::env::var("SD_INGEST_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INGEST_WORKERS);
        let providers = ProviderSettings {
            deepseek_api_key: std::env::var("SD_DEEPSEEK_API_KEY").ok(),
            deepseek_base_url: std::env::var("SD_DEEPSEEK_BASE_URL").ok(),
            kimi_api_key: std::env::var("SD_KIMI_API_KEY").ok(),
            kimi_base_url: std::env::var("SD_KIMI_BASE_URL").ok(),
        };
        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            upload_dir,
            ingest_workers,
            providers,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
