//! Node state machine.
//!
//! A node is either idle or running one animation. Inputs start an
//! animation when idle and are queued (or dropped) while running; the
//! completion of the running animation returns the node to idle and starts
//! the queued color, if any. All transitions go through [`BlinkStickNode::handle`].

use blinkstick_hw::{AnimationResult, Completion, DeviceFinder, LedDevice};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{BusyPolicy, NodeConfig, Task};
use crate::encoder::{encode, Color};
use crate::error::NodeError;
use crate::host::{Message, NodeLog};
use crate::queue::PendingColor;
use crate::resolver;

/// Identifies one started animation.
pub type DispatchId = u64;

/// Whether an animation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationState {
    Idle,
    Running,
}

/// Everything that can happen to a node.
#[derive(Debug)]
pub enum NodeEvent {
    /// A message from the host.
    Input(Message),
    /// The animation started as `dispatch` ended.
    Completed {
        dispatch: DispatchId,
        result: AnimationResult,
    },
    /// The host is shutting the node down.
    Close,
}

/// Snapshot of a node for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub name: String,
    pub task: Task,
    pub state: AnimationState,
    /// Serial of the open device
    pub device: Option<String>,
    pub pending: Option<Color>,
    pub last_color: Option<Color>,
    /// Latest failure since the last input
    pub last_error: Option<String>,
    pub closed: bool,
    /// Events handled so far
    pub handled: u64,
}

/// One BlinkStick node instance.
pub struct BlinkStickNode {
    config: NodeConfig,
    finder: Box<dyn DeviceFinder>,
    log: Box<dyn NodeLog>,
    /// Completions are posted here as [`NodeEvent::Completed`]
    events: mpsc::UnboundedSender<NodeEvent>,
    device: Option<Box<dyn LedDevice>>,
    in_flight: Option<DispatchId>,
    next_dispatch: DispatchId,
    pending: PendingColor,
    last_color: Option<Color>,
    last_error: Option<String>,
    closing: bool,
    handled: u64,
}

impl BlinkStickNode {
    /// Creates the node and looks for its device.
    ///
    /// A missing device is logged and looked for again on the next input.
    pub fn new(
        config: NodeConfig,
        finder: Box<dyn DeviceFinder>,
        log: Box<dyn NodeLog>,
        events: mpsc::UnboundedSender<NodeEvent>,
    ) -> Self {
        let mut node = Self {
            config,
            finder,
            log,
            events,
            device: None,
            in_flight: None,
            next_dispatch: 0,
            pending: PendingColor::new(),
            last_color: None,
            last_error: None,
            closing: false,
            handled: 0,
        };
        node.resolve();
        node
    }

    /// Applies one event.
    pub fn handle(&mut self, event: NodeEvent) {
        self.handled += 1;
        match event {
            NodeEvent::Input(msg) => self.on_input(msg),
            NodeEvent::Completed { dispatch, result } => self.on_completed(dispatch, result),
            NodeEvent::Close => self.on_close(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> AnimationState {
        if self.in_flight.is_some() {
            AnimationState::Running
        } else {
            AnimationState::Idle
        }
    }

    /// True while a device handle is held.
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn pending(&self) -> Option<&Color> {
        self.pending.peek()
    }

    pub fn is_closed(&self) -> bool {
        self.closing
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            name: self.config.name.clone(),
            task: self.config.task,
            state: self.state(),
            device: self.device.as_ref().map(|d| d.serial().to_string()),
            pending: self.pending.peek().cloned(),
            last_color: self.last_color.clone(),
            last_error: self.last_error.clone(),
            closed: self.closing,
            handled: self.handled,
        }
    }

    fn on_input(&mut self, msg: Message) {
        if self.closing {
            debug!(node = %self.config.name, "Ignoring input after close");
            return;
        }
        self.last_error = None;

        let color = match encode(&msg.payload) {
            Ok(color) => color,
            Err(e) => {
                self.warn(e.to_string());
                return;
            }
        };

        if self.state() == AnimationState::Running {
            match self.config.busy {
                BusyPolicy::Queue => {
                    debug!(node = %self.config.name, "Queued {}", color);
                    self.pending.set(color);
                }
                BusyPolicy::Drop => {
                    self.warn(format!("BlinkStick busy, dropping color {}", color));
                }
            }
            return;
        }

        if !self.has_device() && !self.resolve() {
            return;
        }
        self.dispatch(color);
    }

    fn on_completed(&mut self, dispatch: DispatchId, result: AnimationResult) {
        if self.in_flight != Some(dispatch) {
            debug!(node = %self.config.name, dispatch, "Ignoring stale completion");
            return;
        }
        self.in_flight = None;

        let reapply = match result {
            Ok(()) => true,
            Err(e) if e.is_reference() => {
                self.warn(e.to_string());
                // Only a changed color is tried again
                self.pending.peek() != self.last_color.as_ref()
            }
            Err(e) => {
                self.warn(e.to_string());
                if let Some(mut device) = self.device.take() {
                    device.close();
                }
                false
            }
        };

        debug!(node = %self.config.name, dispatch, "Animation complete");

        if self.closing || !reapply {
            self.pending.clear();
            return;
        }
        if let Some(color) = self.pending.take_and_clear() {
            self.dispatch(color);
        }
    }

    fn on_close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.pending.clear();
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        info!(node = %self.config.name, "Node closed");
    }

    /// Looks for the device, replacing the current handle.
    fn resolve(&mut self) -> bool {
        self.device = None;
        match resolver::resolve(self.finder.as_ref(), self.config.serial_filter()) {
            Ok(device) => {
                info!(node = %self.config.name, "Using BlinkStick {}", device.serial());
                self.device = Some(device);
                true
            }
            Err(e) => {
                self.error(e.to_string());
                false
            }
        }
    }

    /// Starts the configured animation with `color`. Requires an idle node.
    fn dispatch(&mut self, color: Color) {
        let id = self.next_dispatch;
        let done = self.completion(id);
        let Some(device) = self.device.as_mut() else {
            return;
        };

        let started = match self.config.task {
            Task::Set => device.set_color(color.as_str(), done),
            Task::Pulse => device.pulse(color.as_str(), self.config.fade_options(), done),
            Task::Morph => device.morph(color.as_str(), self.config.fade_options(), done),
            Task::Blink => device.blink(color.as_str(), self.config.blink_options(), done),
        };

        match started {
            Ok(()) => {
                debug!(
                    node = %self.config.name,
                    dispatch = id,
                    "Started {} with {}",
                    self.config.task,
                    color
                );
                self.next_dispatch += 1;
                self.in_flight = Some(id);
                self.last_color = Some(color.clone());
                if self.config.keeps_color() {
                    self.pending.set(color);
                } else {
                    self.pending.clear();
                }
            }
            Err(e) => {
                self.warn(NodeError::Dispatch(e).to_string());
                self.in_flight = None;
                self.pending.clear();
                self.resolve();
            }
        }
    }

    fn warn(&mut self, message: String) {
        self.log.warn(&message);
        self.last_error = Some(message);
    }

    fn error(&mut self, message: String) {
        self.log.error(&message);
        self.last_error = Some(message);
    }

    fn completion(&self, dispatch: DispatchId) -> Completion {
        let events = self.events.clone();
        Completion::new(move |result| {
            let _ = events.send(NodeEvent::Completed { dispatch, result });
        })
    }
}
