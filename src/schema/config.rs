//! Configuration for replaying an archive into a host scene.

use serde::{Deserialize, Serialize};

fn default_skip_frames() -> u32 {
    ReplayConfig::DEFAULT_SKIP_FRAMES
}

fn default_max_frames() -> i64 {
    ReplayConfig::UNLIMITED
}

/// Decimation and truncation settings for reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Keep every Nth recorded sample (1 = every sample).
    #[serde(default = "default_skip_frames")]
    pub skip_frames: u32,
    /// Last recorded frame index that may reach the host (-1 = unlimited).
    #[serde(default = "default_max_frames")]
    pub max_frames: i64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            skip_frames: Self::DEFAULT_SKIP_FRAMES,
            max_frames: Self::UNLIMITED,
        }
    }
}

impl ReplayConfig {
    pub const DEFAULT_SKIP_FRAMES: u32 = 10;
    pub const MAX_SKIP_FRAMES: u32 = 100;
    pub const UNLIMITED: i64 = -1;
    pub const MAX_FRAMES_LIMIT: i64 = 100_000;

    pub fn new(skip_frames: u32, max_frames: i64) -> Self {
        Self {
            skip_frames,
            max_frames,
        }
    }

    /// Truncation limit as an optional frame index.
    #[inline]
    pub fn frame_limit(&self) -> Option<u64> {
        u64::try_from(self.max_frames).ok()
    }

    /// Whether a recorded sample at `frame_index` produces a keyframe.
    #[inline]
    pub fn keeps(&self, frame_index: u64) -> bool {
        frame_index % u64::from(self.skip_frames.max(1)) == 0
    }

    /// Host timeline frame for a kept sample.
    #[inline]
    pub fn host_frame(&self, frame_index: u64) -> u64 {
        frame_index / u64::from(self.skip_frames.max(1))
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_frames == 0 || self.skip_frames > Self::MAX_SKIP_FRAMES {
            return Err(ConfigError::InvalidSkipFrames(self.skip_frames));
        }
        if self.max_frames < Self::UNLIMITED || self.max_frames > Self::MAX_FRAMES_LIMIT {
            return Err(ConfigError::InvalidMaxFrames(self.max_frames));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("skip_frames must be in [1, 100], got {0}")]
    InvalidSkipFrames(u32),
    #[error("max_frames must be -1 (unlimited) or in [0, 100000], got {0}")]
    InvalidMaxFrames(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ReplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.skip_frames, 10);
        assert_eq!(config.frame_limit(), None);
    }

    #[test]
    fn test_bounds() {
        assert!(ReplayConfig::new(0, -1).validate().is_err());
        assert!(ReplayConfig::new(101, -1).validate().is_err());
        assert!(ReplayConfig::new(100, 100_000).validate().is_ok());
        assert!(ReplayConfig::new(1, 100_001).validate().is_err());
        assert!(ReplayConfig::new(1, -2).validate().is_err());
        assert_eq!(ReplayConfig::new(1, 0).frame_limit(), Some(0));
    }

    #[test]
    fn test_keeps_and_host_frame() {
        let config = ReplayConfig::new(3, -1);
        let kept: Vec<u64> = (0..10).filter(|&i| config.keeps(i)).collect();
        assert_eq!(kept, vec![0, 3, 6, 9]);
        assert_eq!(config.host_frame(9), 3);
    }

    #[test]
    fn test_serialization_defaults() {
        let parsed: ReplayConfig = serde_json::from_str(r#"{"skip_frames": 2}"#).unwrap();
        assert_eq!(parsed, ReplayConfig::new(2, -1));

        let json = serde_json::to_string(&ReplayConfig::default()).unwrap();
        let back: ReplayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ReplayConfig::default());
    }
}
