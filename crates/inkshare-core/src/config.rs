//! Board configuration.

use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_WHEEL_INTENSITY, DEFAULT_ZOOM_STEP};
use crate::error::ConfigError;
use crate::render::DEFAULT_STROKE_WIDTH;

/// Topic every board publishes strokes on.
pub const DEFAULT_TOPIC: &str = "draw";

/// Relay endpoint used when none is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:3001/ws";

/// Settings for one board client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// WebSocket URL of the relay.
    pub relay_url: String,
    /// Relay topic strokes are exchanged on.
    pub topic: String,
    /// Factor used by the zoom in / zoom out commands.
    pub zoom_step: f64,
    /// Exponent per wheel notch.
    pub wheel_intensity: f64,
    /// Stroke width at zoom 1.0.
    pub stroke_width: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            zoom_step: DEFAULT_ZOOM_STEP,
            wheel_intensity: DEFAULT_WHEEL_INTENSITY,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl BoardConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the transform engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(ConfigError::Invalid {
                field: "zoom_step",
                reason: format!("must be greater than 1, got {}", self.zoom_step),
            });
        }
        if !(self.wheel_intensity.is_finite() && self.wheel_intensity > 0.0) {
            return Err(ConfigError::Invalid {
                field: "wheel_intensity",
                reason: format!("must be positive, got {}", self.wheel_intensity),
            });
        }
        if !(self.stroke_width.is_finite() && self.stroke_width > 0.0) {
            return Err(ConfigError::Invalid {
                field: "stroke_width",
                reason: format!("must be positive, got {}", self.stroke_width),
            });
        }
        if self.topic.is_empty() {
            return Err(ConfigError::Invalid {
                field: "topic",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
