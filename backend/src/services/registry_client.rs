//! Client for the Nacos naming service.
//!
//! Registers this instance under its service name at startup, keeps the
//! ephemeral registration alive with periodic heartbeats and deregisters
//! it on shutdown. Uses the Nacos v1 open API over HTTP.

use crate::config::Config;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The naming server could not be reached.
    #[error("Network error: {0}")]
    NetworkError(String),
    /// The naming server answered with a non-success status.
    #[error("Registry rejected {operation}: {status} {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },
}

/// Address of this instance as advertised to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub service_name: String,
    pub group_name: String,
    pub namespace_id: Option<String>,
    pub ip: String,
    pub port: u16,
}

impl ServiceInstance {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_name: config.service_name.clone(),
            group_name: config.nacos_group.clone(),
            namespace_id: config.nacos_namespace.clone(),
            ip: config.service_ip.clone(),
            port: config.server_port,
        }
    }

    /// Query parameters identifying this instance.
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("serviceName", self.service_name.clone()),
            ("groupName", self.group_name.clone()),
            ("ip", self.ip.clone()),
            ("port", self.port.to_string()),
            ("ephemeral", "true".to_string()),
        ];
        if let Some(namespace_id) = &self.namespace_id {
            params.push(("namespaceId", namespace_id.clone()));
        }
        params
    }

    /// Heartbeat payload in the form the v1 beat endpoint expects.
    fn beat(&self) -> String {
        json!({
            "serviceName": format!("{}@@{}", self.group_name, self.service_name),
            "ip": self.ip,
            "port": self.port,
            "cluster": "DEFAULT",
            "weight": 1.0,
            "metadata": {},
        })
        .to_string()
    }
}

pub struct NacosRegistry {
    client: reqwest::Client,
    server_addr: String,
    instance: ServiceInstance,
}

impl NacosRegistry {
    const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(server_addr: impl Into<String>, instance: ServiceInstance) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_addr: server_addr.into().trim_end_matches('/').to_string(),
            instance,
        }
    }

    fn instance_url(&self) -> String {
        format!("{}/nacos/v1/ns/instance", self.server_addr)
    }

    /// Registers this instance as healthy and enabled.
    pub async fn register(&self) -> Result<(), RegistryError> {
        let mut params = self.instance.params();
        params.extend([
            ("healthy", "true".to_string()),
            ("enabled", "true".to_string()),
            ("weight", "1".to_string()),
        ]);

        let request = self.client.post(self.instance_url()).query(&params);
        self.send(request, "register").await?;

        info!(
            service = %self.instance.service_name,
            ip = %self.instance.ip,
            port = self.instance.port,
            "Registered service instance"
        );
        Ok(())
    }

    /// Removes this instance from the registry.
    pub async fn deregister(&self) -> Result<(), RegistryError> {
        let request = self
            .client
            .delete(self.instance_url())
            .query(&self.instance.params());
        self.send(request, "deregister").await?;

        info!(service = %self.instance.service_name, "Deregistered service instance");
        Ok(())
    }

    /// Sends one heartbeat for this instance.
    pub async fn heartbeat(&self) -> Result<(), RegistryError> {
        let mut params = self.instance.params();
        params.push(("beat", self.instance.beat()));

        let request = self
            .client
            .put(format!("{}/beat", self.instance_url()))
            .query(&params);
        self.send(request, "heartbeat").await
    }

    /// Sends heartbeats until the returned task is aborted.
    pub fn spawn_heartbeat(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Self::HEARTBEAT_INTERVAL);
            loop {
                interval.tick().await;
                match self.heartbeat().await {
                    Ok(()) => debug!("Registry heartbeat sent"),
                    Err(e) => warn!(error = %e, "Registry heartbeat failed"),
                }
            }
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<(), RegistryError> {
        let response = request
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RegistryError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
