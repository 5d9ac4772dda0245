//! Application state management.

use blinkstick_hw::{DeviceFinder, DeviceInfo};
use blinkstick_node::{spawn_node, NodeConfig, NodeHandle, NodeStatus, TracingLog};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// How long shutdown waits for running animations to finish.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Running nodes plus a finder for device listings.
pub struct AppState {
    nodes: BTreeMap<String, NodeHandle>,
    finder: Box<dyn DeviceFinder + Sync>,
}

impl AppState {
    /// Spawns one node per configuration. Must be called inside a runtime.
    pub fn start<F>(configs: &[NodeConfig], finder: F) -> Self
    where
        F: DeviceFinder + Clone + Sync + 'static,
    {
        let nodes = configs
            .iter()
            .map(|config| {
                info!(
                    "Starting node {} (task={}, serial={})",
                    config.name,
                    config.task,
                    config.serial_filter().unwrap_or("any")
                );
                let log = TracingLog::new(config.name.clone());
                let handle = spawn_node(config.clone(), Box::new(finder.clone()), Box::new(log));
                (config.name.clone(), handle)
            })
            .collect();

        Self {
            nodes,
            finder: Box::new(finder),
        }
    }

    /// Looks up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeHandle> {
        self.nodes.get(name)
    }

    /// Status of every node, ordered by name.
    pub fn statuses(&self) -> Vec<NodeStatus> {
        self.nodes.values().map(NodeHandle::status).collect()
    }

    /// BlinkSticks currently on the bus.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.finder.find_all()
    }

    /// Closes every node and waits briefly for running animations to end.
    pub async fn close_all(&self) {
        let mut closing = Vec::with_capacity(self.nodes.len());
        for (name, handle) in &self.nodes {
            let handled = handle.status().handled;
            handle.close();
            closing.push((name, handle, handled));
        }

        for (name, handle, handled) in closing {
            match tokio::time::timeout(CLOSE_GRACE, handle.settled(handled)).await {
                Ok(_) => info!("Node {} closed", name),
                Err(_) => warn!("Node {} still animating at shutdown", name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blinkstick_hw::mock::{MockBus, Operation};
    use blinkstick_node::Message;

    fn configs(names: &[&str]) -> Vec<NodeConfig> {
        names
            .iter()
            .map(|name| NodeConfig {
                name: name.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_start_spawns_named_nodes() {
        let bus = MockBus::with_devices(&["A"]);
        let state = AppState::start(&configs(&["b", "a"]), bus.finder());

        let names: Vec<_> = state.statuses().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(state.node("a").is_some());
        assert!(state.node("c").is_none());
        assert_eq!(state.devices().len(), 1);
    }

    #[tokio::test]
    async fn test_close_all_closes_devices() {
        let bus = MockBus::with_devices(&["A"]);
        let state = AppState::start(&configs(&["a"]), bus.finder());

        state.close_all().await;
        assert!(state.statuses()[0].closed);
        assert_eq!(bus.operations(), vec![Operation::Close]);
        assert!(state
            .node("a")
            .unwrap()
            .input(Message::new("red"))
            .is_err());
    }
}
