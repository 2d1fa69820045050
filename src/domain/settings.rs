use crate::domain::payload::{DEFAULT_COMPANY_ID, DEFAULT_DEVICE_NAME};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "gps_beacon".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Radio stack implementation driven by the beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RadioBackend {
    /// Log the advertising data instead of transmitting it
    #[default]
    Log,
    /// Windows BluetoothLEAdvertisementPublisher
    WinRt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial device to read commands from; stdin/stdout when unset
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Line buffer size including the terminator slot
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            queue_capacity: default_queue_capacity(),
            max_line_length: default_max_line_length(),
        }
    }
}

fn default_baud_rate() -> u32 {
    115200
}
fn default_queue_capacity() -> usize {
    10
}
fn default_max_line_length() -> usize {
    48
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Payload Settings
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_company_id")]
    pub company_id: u16,

    #[serde(default)]
    pub radio_backend: RadioBackend,

    #[serde(default)]
    pub serial: SerialSettings,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            company_id: default_company_id(),
            radio_backend: RadioBackend::default(),
            serial: SerialSettings::default(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}
fn default_company_id() -> u16 {
    DEFAULT_COMPANY_ID
}

/// How the settings in memory were obtained
///
/// Settings load before the logger exists, so the caller reports this once
/// logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Read from the settings file
    Loaded,
    /// No file existed; defaults were written to it
    Created,
    /// The file could not be used; running on defaults
    Defaulted(String),
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
    status: LoadStatus,
}

impl SettingsService {
    /// Load settings from `path`, or from the per-user config directory
    ///
    /// A missing file is created with the defaults. An unreadable or
    /// malformed file is left alone and the defaults are used.
    pub fn new(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let settings_path = match path {
            Some(path) => path,
            None => Self::get_settings_path()?,
        };

        let mut service = Self {
            settings: Settings::default(),
            settings_path,
            status: LoadStatus::Loaded,
        };

        service.status = match Self::load_from_file(&service.settings_path) {
            Ok(settings) => {
                service.settings = settings;
                LoadStatus::Loaded
            }
            Err(e) if is_not_found(&e) => match service.save() {
                Ok(()) => LoadStatus::Created,
                Err(e) => LoadStatus::Defaulted(format!("{:#}", e)),
            },
            Err(e) => LoadStatus::Defaulted(format!("{:#}", e)),
        };

        Ok(service)
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("GpsBeacon");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings file {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)
            .with_context(|| format!("Failed to write {}", self.settings_path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}
