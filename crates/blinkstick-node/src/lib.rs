//! BlinkStick flow node.
//!
//! Turns host messages into BlinkStick animations. One [`BlinkStickNode`]
//! owns one device handle and allows at most one animation in flight; a
//! [`runner`] task feeds it inputs and completions on a single context.

pub mod config;
pub mod encoder;
pub mod error;
pub mod host;
pub mod node;
pub mod queue;
pub mod resolver;
pub mod runner;

pub use config::{BusyPolicy, NodeConfig, Task};
pub use encoder::{encode, Color};
pub use error::{NodeError, Result};
pub use host::{Message, NodeLog, TracingLog};
pub use node::{AnimationState, BlinkStickNode, DispatchId, NodeEvent, NodeStatus};
pub use runner::{spawn_node, NodeHandle};
