//! Remote worker identity and connection information.

use serde::{Deserialize, Serialize};

fn default_capacity() -> usize {
    1
}

fn default_status() -> String {
    "Active".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfiguration {
    pub server_host: String,
    pub server_port: u16,
}

/// A registered worker of one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerBean {
    #[serde(default)]
    pub name: String,
    pub family: String,
    #[serde(default)]
    pub worker_id: String,
    /// Number of calls the worker accepts concurrently
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub configuration: WorkerConfiguration,
}

impl WorkerBean {
    pub fn new(
        family: impl Into<String>,
        worker_id: impl Into<String>,
        server_host: impl Into<String>,
        server_port: u16,
    ) -> Self {
        let worker_id = worker_id.into();
        Self {
            name: worker_id.clone(),
            family: family.into(),
            worker_id,
            capacity: default_capacity(),
            status: default_status(),
            configuration: WorkerConfiguration {
                server_host: server_host.into(),
                server_port,
            },
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// `host:port` of the worker endpoint
    pub fn address(&self) -> String {
        format!(
            "{}:{}",
            self.configuration.server_host, self.configuration.server_port
        )
    }
}
