//! Per-node configuration.

use blinkstick_hw::{BlinkOptions, FadeOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NodeError;

/// Animation performed for each color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Show the color at once.
    #[default]
    Set,
    /// Fade to the color and back to black.
    Pulse,
    /// Fade to the color and hold it.
    Morph,
    /// Flash the color on and off.
    Blink,
}

impl Task {
    /// Pulse and blink can be re-run with the last color when `repeat` is set.
    pub fn is_repeatable(self) -> bool {
        matches!(self, Task::Pulse | Task::Blink)
    }
}

impl FromStr for Task {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "set" => Ok(Task::Set),
            "pulse" => Ok(Task::Pulse),
            "morph" => Ok(Task::Morph),
            "blink" => Ok(Task::Blink),
            _ => Err(NodeError::UnknownTask(s.to_string())),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Set => write!(f, "set"),
            Task::Pulse => write!(f, "pulse"),
            Task::Morph => write!(f, "morph"),
            Task::Blink => write!(f, "blink"),
        }
    }
}

/// What to do with input that arrives while an animation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Keep the newest color and apply it when the animation ends.
    #[default]
    Queue,
    /// Discard the color with a warning.
    Drop,
}

/// Settings of one node instance, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name, used in logs and routes
    #[serde(default = "default_name")]
    pub name: String,

    /// Serial number of the device to drive (unset = first found)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    /// Animation to perform
    #[serde(default)]
    pub task: Task,

    /// Pulse/morph duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Pulse/morph step count
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Blink repeat count
    #[serde(default = "default_repeats")]
    pub repeats: u32,

    /// Blink on/off delay in milliseconds
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Keep re-running pulse/blink with the last color
    #[serde(default)]
    pub repeat: bool,

    /// Input handling while busy
    #[serde(default)]
    pub busy: BusyPolicy,
}

fn default_name() -> String {
    "blinkstick".to_string()
}

fn default_duration() -> u64 {
    1000
}

fn default_steps() -> u32 {
    50
}

fn default_repeats() -> u32 {
    1
}

fn default_delay() -> u64 {
    500
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            serial: None,
            task: Task::default(),
            duration: default_duration(),
            steps: default_steps(),
            repeats: default_repeats(),
            delay: default_delay(),
            repeat: false,
            busy: BusyPolicy::default(),
        }
    }
}

impl NodeConfig {
    /// The serial to search for, if one is configured.
    ///
    /// A serial made only of whitespace counts as unset.
    pub fn serial_filter(&self) -> Option<&str> {
        self.serial
            .as_deref()
            .filter(|s| s.chars().any(|c| !c.is_whitespace()))
    }

    /// Whether the applied color stays queued for another run.
    pub fn keeps_color(&self) -> bool {
        self.repeat && self.task.is_repeatable()
    }

    /// Options for pulse and morph.
    pub fn fade_options(&self) -> FadeOptions {
        FadeOptions {
            duration_ms: self.duration,
            steps: self.steps,
        }
    }

    /// Options for blink.
    pub fn blink_options(&self) -> BlinkOptions {
        BlinkOptions {
            repeats: self.repeats,
            delay_ms: self.delay,
        }
    }
}
