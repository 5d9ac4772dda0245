//! Runs a node on its own task.
//!
//! Inputs, completions and close all arrive on one channel and are handled
//! in order by a single task, so the node needs no locking.

use blinkstick_hw::DeviceFinder;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::host::{Message, NodeLog};
use crate::node::{AnimationState, BlinkStickNode, NodeEvent, NodeStatus};

/// Handle for feeding a running node and watching its status.
///
/// Dropping the last clone closes the node.
#[derive(Clone)]
pub struct NodeHandle {
    events: mpsc::UnboundedSender<NodeEvent>,
    status: watch::Receiver<NodeStatus>,
    _close: Arc<CloseOnDrop>,
}

/// Sends [`NodeEvent::Close`] when the last handle goes away.
struct CloseOnDrop(mpsc::UnboundedSender<NodeEvent>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        let _ = self.0.send(NodeEvent::Close);
    }
}

/// Creates a node and spawns its event loop on the current runtime.
///
/// The loop ends once the node is closed and its last animation is over.
pub fn spawn_node(
    config: NodeConfig,
    finder: Box<dyn DeviceFinder>,
    log: Box<dyn NodeLog>,
) -> NodeHandle {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut node = BlinkStickNode::new(config, finder, log, events_tx.clone());
    let (status_tx, status_rx) = watch::channel(node.status());

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            node.handle(event);
            status_tx.send_replace(node.status());

            if node.is_closed() && node.state() == AnimationState::Idle {
                break;
            }
        }
        debug!(node = %node.config().name, "Node loop finished");
    });

    NodeHandle {
        events: events_tx.clone(),
        status: status_rx,
        _close: Arc::new(CloseOnDrop(events_tx)),
    }
}

impl NodeHandle {
    /// Delivers a message to the node.
    pub fn input(&self, msg: Message) -> Result<()> {
        if self.status.borrow().closed {
            return Err(NodeError::Closed);
        }
        self.events
            .send(NodeEvent::Input(msg))
            .map_err(|_| NodeError::Closed)
    }

    /// Asks the node to close. Closing twice is harmless.
    pub fn close(&self) {
        let _ = self.events.send(NodeEvent::Close);
    }

    /// Latest status snapshot.
    pub fn status(&self) -> NodeStatus {
        self.status.borrow().clone()
    }

    /// Waits until the node has handled more than `handled` events and is
    /// idle with nothing queued.
    ///
    /// Read `status().handled` before sending input and pass it here to wait
    /// for that input's animations to finish.
    pub async fn settled(&self, handled: u64) -> Result<NodeStatus> {
        let mut status = self.status.clone();
        let settled = status
            .wait_for(|s| {
                s.handled > handled && s.state == AnimationState::Idle && s.pending.is_none()
            })
            .await
            .map_err(|_| NodeError::Closed)?;
        Ok(settled.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Task;
    use crate::host::testing::RecordingLog;
    use blinkstick_hw::mock::{MockBus, Operation};
    use crate::encoder::Color;
    use blinkstick_hw::{AnimationError, BlinkOptions, FadeOptions};
    use std::time::Duration;

    fn spawn(config: NodeConfig, bus: &MockBus) -> NodeHandle {
        spawn_node(
            config,
            Box::new(bus.finder()),
            Box::new(RecordingLog::default()),
        )
    }

    async fn wait_in_flight(bus: &MockBus, count: usize) {
        while bus.in_flight() != count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_input_runs_through_loop() {
        let bus = MockBus::with_devices(&["A"]);
        let config = NodeConfig {
            task: Task::Blink,
            repeats: 3,
            delay: 100,
            ..Default::default()
        };
        let handle = spawn(config, &bus);

        let before = handle.status().handled;
        handle.input(Message::new("255,0,0")).unwrap();
        wait_in_flight(&bus, 1).await;
        assert!(bus.complete_next(Ok(())));

        let status = handle.settled(before).await.unwrap();
        assert_eq!(status.state, AnimationState::Idle);
        assert_eq!(
            bus.operations(),
            vec![Operation::Blink {
                color: "#ff0000".into(),
                options: BlinkOptions {
                    repeats: 3,
                    delay_ms: 100
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_queued_color_applied_after_completion() {
        let bus = MockBus::with_devices(&["A"]);
        let handle = spawn(NodeConfig::default(), &bus);

        let before = handle.status().handled;
        handle.input(Message::new("red")).unwrap();
        handle.input(Message::new("green")).unwrap();
        handle.input(Message::new("blue")).unwrap();
        wait_in_flight(&bus, 1).await;
        assert!(bus.complete_next(Ok(())));
        wait_in_flight(&bus, 1).await;
        assert!(bus.complete_next(Ok(())));

        handle.settled(before).await.unwrap();
        assert_eq!(
            bus.operations(),
            vec![
                Operation::SetColor {
                    color: "red".into()
                },
                Operation::SetColor {
                    color: "blue".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_input_rejected_after_close() {
        let bus = MockBus::with_devices(&["A"]);
        let handle = spawn(NodeConfig::default(), &bus);

        handle.close();
        let mut status = handle.status.clone();
        status.wait_for(|s| s.closed).await.unwrap();

        assert!(matches!(
            handle.input(Message::new("red")),
            Err(NodeError::Closed)
        ));
        assert_eq!(bus.operations(), vec![Operation::Close]);
    }

    #[tokio::test]
    async fn test_settled_when_device_missing() {
        let bus = MockBus::new();
        let handle = spawn(NodeConfig::default(), &bus);

        let before = handle.status().handled;
        handle.input(Message::new("red")).unwrap();
        let status = handle.settled(before).await.unwrap();
        assert_eq!(status.device, None);
        assert!(bus.operations().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_color_reported_in_status() {
        let bus = MockBus::with_devices(&["A"]);
        let handle = spawn(NodeConfig::default(), &bus);

        let before = handle.status().handled;
        handle.input(Message::new("notacolor")).unwrap();
        let status = handle.settled(before).await.unwrap();

        assert_eq!(status.device.as_deref(), Some("A"));
        assert!(status.last_color.is_none());
        assert!(status
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("notacolor")));
        assert!(bus.operations().is_empty());
    }

    #[tokio::test]
    async fn test_communication_error_reported_in_status() {
        let bus = MockBus::with_devices(&["A"]);
        let handle = spawn(NodeConfig::default(), &bus);

        let before = handle.status().handled;
        handle.input(Message::new("red")).unwrap();
        wait_in_flight(&bus, 1).await;
        assert!(bus.complete_next(Err(AnimationError::Communication(
            blinkstick_hw::Error::NotFound
        ))));

        let status = handle.settled(before).await.unwrap();
        assert_eq!(status.device, None);
        assert_eq!(status.last_color.as_ref().map(Color::as_str), Some("red"));
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_close_while_running_waits_for_completion() {
        let bus = MockBus::with_devices(&["A"]);
        let config = NodeConfig {
            task: Task::Pulse,
            repeat: true,
            ..Default::default()
        };
        let handle = spawn(config, &bus);

        handle.input(Message::new("red")).unwrap();
        wait_in_flight(&bus, 1).await;
        handle.close();

        let mut status = handle.status.clone();
        status
            .wait_for(|s| s.closed && s.state == AnimationState::Running)
            .await
            .unwrap();
        assert!(!handle.events.is_closed());

        assert!(bus.complete_next(Ok(())));
        handle.events.closed().await;

        let status = handle.status();
        assert_eq!(status.state, AnimationState::Idle);
        assert!(status.pending.is_none());
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(
            bus.operations(),
            vec![
                Operation::Pulse {
                    color: "red".into(),
                    options: FadeOptions::default(),
                },
                Operation::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_dropping_last_handle_closes_node() {
        let bus = MockBus::with_devices(&["A"]);
        let handle = spawn(NodeConfig::default(), &bus);
        let events = handle.events.clone();
        let other = handle.clone();

        drop(handle);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(bus.operations().is_empty());

        drop(other);
        events.closed().await;
        assert_eq!(bus.operations(), vec![Operation::Close]);
    }
}
