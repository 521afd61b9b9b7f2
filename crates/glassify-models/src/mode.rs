//! Pipeline operating modes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Operating mode of the overlay pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Nothing running, no capture resource held.
    #[default]
    Stopped,

    /// Continuous detection on a live capture stream.
    Streaming,

    /// One detection-and-render pass over a still image.
    SingleShot,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Stopped => "stopped",
            PipelineMode::Streaming => "streaming",
            PipelineMode::SingleShot => "single_shot",
        }
    }

    /// Returns true if the mode is running any pipeline work.
    pub fn is_active(&self) -> bool {
        !matches!(self, PipelineMode::Stopped)
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stopped" => Ok(PipelineMode::Stopped),
            "streaming" | "stream" | "webcam" => Ok(PipelineMode::Streaming),
            "single_shot" | "single-shot" | "still" | "upload" => Ok(PipelineMode::SingleShot),
            _ => Err(ModelError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("stream".parse::<PipelineMode>().unwrap(), PipelineMode::Streaming);
        assert_eq!("webcam".parse::<PipelineMode>().unwrap(), PipelineMode::Streaming);
        assert_eq!("still".parse::<PipelineMode>().unwrap(), PipelineMode::SingleShot);
        assert_eq!("Single-Shot".parse::<PipelineMode>().unwrap(), PipelineMode::SingleShot);
        assert!("video".parse::<PipelineMode>().is_err());
    }

    #[test]
    fn test_mode_display_and_activity() {
        assert_eq!(PipelineMode::SingleShot.to_string(), "single_shot");
        assert!(!PipelineMode::Stopped.is_active());
        assert!(PipelineMode::Streaming.is_active());
    }
}
