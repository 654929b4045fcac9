//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, service registry address and the
//! cross-origin policy.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    pub service_name: String,
    pub service_ip: String,
    /// Base URL of the Nacos server. Registry integration is disabled when unset.
    pub nacos_server_addr: Option<String>,
    pub nacos_namespace: Option<String>,
    pub nacos_group: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let service_name = env::var("SERVICE_NAME").unwrap_or_else(|_| "login-service".to_string());
        let service_ip = env::var("SERVICE_IP").unwrap_or_else(|_| "127.0.0.1".to_string());

        let nacos_server_addr = non_empty_var("NACOS_SERVER_ADDR");
        let nacos_namespace = non_empty_var("NACOS_NAMESPACE");
        let nacos_group = env::var("NACOS_GROUP").unwrap_or_else(|_| "DEFAULT_GROUP".to_string());

        let cors_allowed_origins = parse_origins(
            &env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://micro.roliyal.com".to_string()),
        );

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            service_name,
            service_ip,
            nacos_server_addr,
            nacos_namespace,
            nacos_group,
            cors_allowed_origins,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Splits a comma-separated origin list, dropping blank entries.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
