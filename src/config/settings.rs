//! Configuration sections
//!
//! - [`ProducerConfig`] - How to launch the data-producing co-process
//! - [`PlaybackConfig`] - Animation rate and world layout
//! - [`HandoffConfig`] - Bounded waits of the create handoff
//! - [`LoggingConfig`] - Optional log file directory

use crate::scene::WorldMode;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Lowest accepted playback rate
pub const MIN_FPS: u32 = 1;

/// Highest accepted playback rate
pub const MAX_FPS: u32 = 60;

/// How the producer process is launched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Program to execute
    pub program: PathBuf,
    /// Leading arguments (typically the producer script)
    pub args: Vec<String>,
    /// Dataset forwarded to the producer, if any
    pub data_file: Option<PathBuf>,
    /// Flag that precedes `data_file`
    pub data_flag: String,
    /// Let the producer write diagnostics to our stderr
    pub inherit_stderr: bool,
    /// Largest block length accepted from the producer
    pub max_block_bytes: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            args: vec!["plugin_mikr.py".to_string()],
            data_file: None,
            data_flag: "--data".to_string(),
            inherit_stderr: true,
            max_block_bytes: 1 << 30,
        }
    }
}

impl ProducerConfig {
    /// Program and argument vector used to spawn the producer
    pub fn command_line(&self) -> (PathBuf, Vec<OsString>) {
        (self.program.clone(), self.command_args())
    }

    /// Full argument vector: `args`, then `data_flag data_file` when set
    pub fn command_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        if let Some(ref data) = self.data_file {
            args.push(OsString::from(&self.data_flag));
            args.push(data.clone().into_os_string());
        }
        args
    }
}

/// Animation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Timesteps per second, clamped to `[MIN_FPS, MAX_FPS]`
    pub fps: u32,
    pub world_mode: WorldMode,
    /// Start playing as soon as the create phase completes
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            world_mode: WorldMode::SameWorld,
            autoplay: false,
        }
    }
}

impl PlaybackConfig {
    pub fn clamped_fps(&self) -> u32 {
        self.fps.clamp(MIN_FPS, MAX_FPS)
    }
}

/// Create-phase handoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Bounded wait on either side of the baton
    pub step_timeout_ms: u64,
    /// Build steps serviced per `pump` call; unset drains until finished
    pub max_steps_per_pump: Option<usize>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 10_000,
            max_steps_per_pump: None,
        }
    }
}

impl HandoffConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms.max(1))
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a daily rolling log file here in addition to stderr
    pub directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_without_data() {
        let config = ProducerConfig::default();
        assert_eq!(config.command_args(), vec![OsString::from("plugin_mikr.py")]);
    }

    #[test]
    fn test_command_args_with_data() {
        let config = ProducerConfig {
            data_file: Some(PathBuf::from("bridge.zip")),
            ..ProducerConfig::default()
        };
        assert_eq!(
            config.command_args(),
            vec![
                OsString::from("plugin_mikr.py"),
                OsString::from("--data"),
                OsString::from("bridge.zip"),
            ]
        );
    }

    #[test]
    fn test_command_line_program() {
        let (program, args) = ProducerConfig::default().command_line();
        assert_eq!(program, PathBuf::from("python3"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_fps_clamping() {
        let mut playback = PlaybackConfig::default();
        playback.fps = 0;
        assert_eq!(playback.clamped_fps(), MIN_FPS);
        playback.fps = 240;
        assert_eq!(playback.clamped_fps(), MAX_FPS);
    }

    #[test]
    fn test_step_timeout_never_zero() {
        let handoff = HandoffConfig {
            step_timeout_ms: 0,
            max_steps_per_pump: None,
        };
        assert_eq!(handoff.step_timeout(), Duration::from_millis(1));
    }
}
