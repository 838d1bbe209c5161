//! Simulated Outpost panel.
//!
//! Stands in for the real panel stub in tests: every call returns a
//! [`Promise`] backed by a blocking producer, with configurable latency
//! jitter and failure injection, so promise-driven call flows can be
//! exercised without a running panel.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use outpost_promise::{CallError, Outcome, Promise};

/// Lifecycle state the panel reports for a managed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Running,
    Stopped,
    Starting,
}

/// Status record the panel returns for one managed instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub id: String,
    pub state: InstanceState,
    pub cpu_percent: f64,
    pub memory_mb: u64,
    pub uptime_seconds: u64,
}

impl InstanceStatus {
    /// Canned fixture for a running instance.
    pub fn running(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: InstanceState::Running,
            cpu_percent: 12.5,
            memory_mb: 2048,
            uptime_seconds: 86_400,
        }
    }

    /// Canned fixture for a stopped instance.
    pub fn stopped(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: InstanceState::Stopped,
            cpu_percent: 0.0,
            memory_mb: 0,
            uptime_seconds: 0,
        }
    }
}

/// Builder-configured panel stand-in.
///
/// Instances are keyed in a sorted map so listings come out deterministic.
pub struct PanelSimulator {
    instances: BTreeMap<String, InstanceStatus>,
    latency_ms: (u64, u64),
    failure_rate: f64,
}

impl PanelSimulator {
    /// Creates an empty panel with zero latency and no injected failures.
    pub fn new() -> Self {
        Self {
            instances: BTreeMap::new(),
            latency_ms: (0, 0),
            failure_rate: 0.0,
        }
    }

    /// Seeds one instance fixture.
    pub fn with_instance(mut self, status: InstanceStatus) -> Self {
        self.instances.insert(status.id.clone(), status);
        self
    }

    /// Sets the per-call latency window in milliseconds.
    pub fn with_latency_ms(mut self, min: u64, max: u64) -> Self {
        self.latency_ms = (min.min(max), max.max(min));
        self
    }

    /// Sets the probability that any call fails with an unreachable error.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        // gen_bool panics outside [0, 1]
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Fetches the status of one instance.
    pub fn status(&self, id: impl Into<String>) -> Promise<InstanceStatus> {
        let id = id.into();
        debug!(%id, "simulated status call");
        let response = match self.instances.get(&id) {
            Some(status) => Ok(status.clone()),
            None => Err(CallError::RemoteCallFailed(format!(
                "unknown instance: {id}"
            ))),
        };
        self.deliver(response)
    }

    /// Lists the ids of every managed instance, sorted.
    pub fn list_instances(&self) -> Promise<Vec<String>> {
        debug!(count = self.instances.len(), "simulated list call");
        let ids: Vec<String> = self.instances.keys().cloned().collect();
        self.deliver(Ok(ids))
    }

    /// Raw JSON endpoint, mirroring the panel's generic HTTP surface.
    ///
    /// Routes: `/api/overview` and `/api/instances/{id}`; anything else
    /// fails like a 404 would.
    pub fn http(&self, path: impl Into<String>) -> Promise<Value> {
        let path = path.into();
        debug!(%path, "simulated http call");
        let response = self.route(&path);
        self.deliver(response)
    }

    fn route(&self, path: &str) -> Outcome<Value> {
        if path == "/api/overview" {
            return Ok(json!({
                "version": env!("CARGO_PKG_VERSION"),
                "instances": self.instances.len(),
            }));
        }
        if let Some(id) = path.strip_prefix("/api/instances/") {
            return match self.instances.get(id) {
                Some(status) => serde_json::to_value(status)
                    .map_err(|e| CallError::RemoteCallFailed(e.to_string())),
                None => Err(CallError::RemoteCallFailed(format!("404: {path}"))),
            };
        }
        Err(CallError::RemoteCallFailed(format!("404: {path}")))
    }

    /// Wraps a precomputed response in a promise with the configured
    /// latency and failure behavior.
    fn deliver<T: Clone + Send + 'static>(&self, response: Outcome<T>) -> Promise<T> {
        let (min, max) = self.latency_ms;
        let failure_rate = self.failure_rate;
        Promise::new(move || {
            let mut rng = rand::thread_rng();
            let delay = rng.gen_range(min..=max);
            if delay > 0 {
                thread::sleep(Duration::from_millis(delay));
            }
            if failure_rate > 0.0 && rng.gen_bool(failure_rate) {
                return Err(CallError::RemoteCallFailed("panel unreachable".to_string()));
            }
            response
        })
    }
}

impl Default for PanelSimulator {
    fn default() -> Self {
        Self::new()
    }
}
