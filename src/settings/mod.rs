use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::analyzer::DEFAULT_FFT_SIZE;
use crate::audio::engine::EngineParams;
use crate::eq::DEFAULT_Q;

impl std::fmt::Display for AudioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Capture Port: {}", self.capture_port)?;
        writeln!(f, "Output Left Port: {}", self.output_left_port)?;
        writeln!(f, "Output Right Port: {}", self.output_right_port)?;
        writeln!(f, "Buffer Size: {}", self.buffer_size)?;
        writeln!(f, "Sample Rate: {}", self.sample_rate)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Port the microphone source is read from.
    pub capture_port: String,
    pub output_left_port: String,
    pub output_right_port: String,
    pub buffer_size: u32,
    pub sample_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            capture_port: "system:capture_1".to_string(),
            output_left_port: "system:playback_1".to_string(),
            output_right_port: "system:playback_2".to_string(),
            buffer_size: 256,
            sample_rate: 48000,
        }
    }
}

impl std::fmt::Display for ConsoleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "FFT Size: {}", self.fft_size)?;
        writeln!(f, "Default Q: {}", self.default_q)?;
        writeln!(f, "Master Volume: {}", self.master_volume)?;
        writeln!(f, "Noise Level: {}", self.noise_level)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub fft_size: usize,
    pub default_q: f32,
    pub master_volume: f32,
    pub noise_level: f32,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        let params = EngineParams::default();
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            default_q: DEFAULT_Q,
            master_volume: params.master_volume,
            noise_level: params.noise_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub console: ConsoleSettings,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;

        writeln!(f, "Audio Settings:")?;
        writeln!(f, "{}", self.audio)?;

        writeln!(f, "Console Settings:")?;
        writeln!(f, "{}", self.console)?;
        Ok(())
    }
}

impl Settings {
    /// Read settings from `path`, or from the default location when `None`.
    /// A missing file yields defaults. The file is never written.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings_path = path.map_or_else(Self::get_settings_path, Path::to_path_buf);

        if settings_path.exists() {
            let contents = fs::read_to_string(&settings_path).with_context(|| {
                format!("Failed to read settings file {}", settings_path.display())
            })?;
            let settings: Self =
                serde_json::from_str(&contents).context("Failed to parse settings")?;
            debug!("Loaded settings from {settings_path:?}");
            Ok(settings)
        } else {
            info!("No settings file at {settings_path:?}, using defaults");
            Ok(Self::default())
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            q: self.console.default_q,
            master_volume: self.console.master_volume,
            noise_level: self.console.noise_level,
        }
    }

    fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        // Try to use XDG config directory on Linux
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("eqconsole")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("eqconsole")
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }

    /// PipeWire's JACK shim picks its quantum from the environment.
    pub fn apply_to_environment(&self) {
        unsafe {
            std::env::set_var("PIPEWIRE_LATENCY", self.get_pipewire_latency());
            if std::env::var("JACK_PROMISCUOUS_SERVER").is_err() {
                std::env::set_var("JACK_PROMISCUOUS_SERVER", "pipewire");
            }
        }
    }

    fn get_pipewire_latency(&self) -> String {
        format!("{}/{}", self.audio.buffer_size, self.audio.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("settings.json");

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings, Settings::default());
        assert!(!path.exists(), "settings must never be written");
        Ok(())
    }

    #[test]
    fn partial_file_fills_in_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "audio": { "capture_port": "usb:capture_2" }, "console": { "default_q": 2.5 } }"#,
        )?;

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.audio.capture_port, "usb:capture_2");
        assert_eq!(settings.audio.output_left_port, "system:playback_1");
        assert_eq!(settings.console.default_q, 2.5);
        assert_eq!(settings.console.fft_size, DEFAULT_FFT_SIZE);
        assert_eq!(settings.engine_params().q, 2.5);
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json")?;

        assert!(Settings::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn pipewire_latency_string() {
        let settings = Settings::default();
        assert_eq!(settings.get_pipewire_latency(), "256/48000");
    }
}
