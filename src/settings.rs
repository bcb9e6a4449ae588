//! Configuration management for QModes.
//!
//! Program behaviour that is not tied to a particular run (log markers, parse
//! policy, report precision, log level) is read from INI files. Files are
//! layered, each one overriding only the keys it sets:
//!
//! 1. Local configuration (`./qmodes_config.cfg`)
//! 2. User configuration (`~/.config/qmodes/qmodes_config.cfg`)
//! 3. System configuration (`/etc/qmodes/qmodes_config.cfg`)
//! 4. Built-in defaults
//!
//! Input paths are never taken from here; they are supplied per run.
//!
//! # Configuration File Format
//!
//! ```ini
//! [markers]
//! convergence = OPTIMIZATION CONVERGED
//! geometry_header = Standard Nuclear Orientation
//!
//! [parsing]
//! policy = lenient
//!
//! [output]
//! q_precision = 6
//! frequency_precision = 2
//!
//! [logging]
//! level = info
//! ```

use crate::parser::{GeometryMarkers, ParseOptions, ParsePolicy};
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched in each location.
pub const CONFIG_FILE_NAME: &str = "qmodes_config.cfg";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading or writing configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

type Section = HashMap<String, Option<String>>;

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Optimization log markers
    pub markers: GeometryMarkers,
    /// Parser behaviour
    pub parsing: ParsingSettings,
    /// Report formatting
    pub output: OutputSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Parser behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParsingSettings {
    /// Malformed-line policy (default: lenient)
    pub policy: ParsePolicy,
}

/// Report formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    /// Digits after the decimal point of Q in scientific notation (default: 6)
    pub q_precision: usize,
    /// Digits after the decimal point of frequencies (default: 2)
    pub frequency_precision: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            q_precision: 6,
            frequency_precision: 2,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: error, warn, info, debug or trace (default: info)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Level filter for the logger, falling back to `Info` on unknown names.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level '{}', using info", self.level);
            log::LevelFilter::Info
        })
    }
}

impl Settings {
    /// Parser options derived from the markers and parsing sections.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            policy: self.parsing.policy,
            markers: self.markers.clone(),
        }
    }

    /// Overrides the keys present in `content` (INI text).
    ///
    /// ```
    /// use qmodes::parser::ParsePolicy;
    /// use qmodes::settings::Settings;
    ///
    /// let mut settings = Settings::default();
    /// settings.apply_ini_str("[parsing]\npolicy = strict\n").unwrap();
    /// assert_eq!(settings.parsing.policy, ParsePolicy::Strict);
    /// assert_eq!(settings.output.q_precision, 6);
    /// ```
    pub fn apply_ini_str(&mut self, content: &str) -> Result<(), ConfigError> {
        let mut ini = Ini::new();
        let map = ini
            .read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        if let Some(section) = map.get("markers") {
            self.apply_markers(section);
        }
        if let Some(section) = map.get("parsing") {
            self.apply_parsing(section)?;
        }
        if let Some(section) = map.get("output") {
            self.apply_output(section)?;
        }
        if let Some(section) = map.get("logging") {
            if let Some(Some(level)) = section.get("level") {
                level.parse::<log::LevelFilter>().map_err(|_| {
                    ConfigError::InvalidValue(format!("Unknown log level: {}", level))
                })?;
                self.logging.level = level.clone();
            }
        }
        Ok(())
    }

    fn apply_markers(&mut self, section: &Section) {
        if let Some(Some(convergence)) = section.get("convergence") {
            self.markers.convergence = convergence.clone();
        }
        if let Some(Some(header)) = section.get("geometry_header") {
            self.markers.header = header.clone();
        }
    }

    fn apply_parsing(&mut self, section: &Section) -> Result<(), ConfigError> {
        if let Some(Some(policy)) = section.get("policy") {
            self.parsing.policy = policy.parse().map_err(ConfigError::InvalidValue)?;
        }
        Ok(())
    }

    fn apply_output(&mut self, section: &Section) -> Result<(), ConfigError> {
        if let Some(Some(value)) = section.get("q_precision") {
            self.output.q_precision = parse_precision("q_precision", value)?;
        }
        if let Some(Some(value)) = section.get("frequency_precision") {
            self.output.frequency_precision = parse_precision("frequency_precision", value)?;
        }
        Ok(())
    }
}

fn parse_precision(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("Invalid {}: {}", key, value)))
}

/// Configuration manager that handles loading and accessing program settings.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
    skipped: Vec<String>,
}

impl SettingsManager {
    /// Loads configuration from the standard locations.
    ///
    /// A file that exists but fails to parse is skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        paths.extend(Self::get_system_config_path());
        paths.extend(Self::get_user_config_path());
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        Ok(Self::load_layers(&paths))
    }

    /// Applies each existing file in `paths` in order; later files win.
    ///
    /// Files that fail to load are left out and listed by
    /// [`SettingsManager::skipped_layers`].
    pub fn load_layers(paths: &[PathBuf]) -> Self {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();
        let mut skipped = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            let mut layered = settings.clone();
            match Self::apply_file(&mut layered, path) {
                Ok(()) => {
                    settings = layered;
                    config_source = path.display().to_string();
                    debug!("Loaded configuration from: {}", path.display());
                }
                Err(e) => {
                    let message = format!("Failed to load config from {}: {}", path.display(), e);
                    warn!("{}", message);
                    skipped.push(message);
                }
            }
        }

        Self {
            settings,
            config_source,
            skipped,
        }
    }

    /// One message per configuration file that was found but not applied.
    pub fn skipped_layers(&self) -> &[String] {
        &self.skipped
    }

    fn apply_file(settings: &mut Settings, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        settings.apply_ini_str(&content)
    }

    /// Returns the last configuration file applied, or "built-in defaults".
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the output settings.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/qmodes").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("qmodes").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("qmodes")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("qmodes").join(CONFIG_FILE_NAME))
        }
    }

    /// Writes a commented configuration template holding the built-in defaults.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let defaults = Settings::default();
        format!(
            r#"# QModes Configuration File
#
# Files are applied in this order, later ones overriding earlier ones:
#
# 1. System config (/etc/qmodes/{name})
# 2. User config (~/.config/qmodes/{name})
# 3. Current working directory (./{name})
#
# Keys left out keep their built-in default, shown below.

[markers]
# Line fragment printed once the geometry optimization has converged
convergence = {convergence}

# Line fragment that opens a Cartesian geometry block
geometry_header = {header}

[parsing]
# What to do with numeric lines that fail to parse
# lenient = skip the line with a warning
# strict  = stop with an error naming the line
policy = {policy}

[output]
# Digits after the decimal point of Q (scientific notation)
q_precision = {q_precision}

# Digits after the decimal point of frequencies (cm^-1)
frequency_precision = {frequency_precision}

[logging]
# error, warn, info, debug or trace (RUST_LOG overrides this)
level = {level}
"#,
            name = CONFIG_FILE_NAME,
            convergence = defaults.markers.convergence,
            header = defaults.markers.header,
            policy = defaults.parsing.policy,
            q_precision = defaults.output.q_precision,
            frequency_precision = defaults.output.frequency_precision,
            level = defaults.logging.level,
        )
    }
}
