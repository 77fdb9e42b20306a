//! Configuration file management for skytrack.
//!
//! Reads/writes `~/.skytrack/config.yaml` with the Beast feed source and
//! display settings. Command-line flags override anything loaded here.

use std::path::PathBuf;

use crate::types::SkytrackError;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub display: DisplayConfig,
}

/// Where to read the Beast byte stream from.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Position trail capacity per aircraft
    pub trail_length: usize,
    /// Seconds without a message before a track is evicted
    pub ttl_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: SourceConfig {
                host: "localhost".into(),
                port: 30005,
            },
            display: DisplayConfig {
                trail_length: 50,
                ttl_seconds: 30,
            },
        }
    }
}

/// Get the config directory path (`~/.skytrack/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".skytrack")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.skytrack/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text).unwrap_or_default()
}

/// Save config to `~/.skytrack/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, SkytrackError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| SkytrackError::Config(e.to_string()))?;

    let path = config_file();
    let text = serialize_config(config);
    std::fs::write(&path, text).map_err(|e| SkytrackError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text.
fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                if val.is_empty() {
                    current_section = Some(key.to_string());
                } else {
                    current_section = None;
                }
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "source" => match key {
                        "host" => {
                            if let Some(v) = parse_string_value(val) {
                                config.source.host = v;
                            }
                        }
                        "port" => {
                            if let Ok(v) = val.parse::<u16>() {
                                config.source.port = v;
                            }
                        }
                        _ => {}
                    },
                    "display" => match key {
                        "trail_length" => {
                            if let Ok(v) = val.parse::<usize>() {
                                config.display.trail_length = v;
                            }
                        }
                        "ttl_seconds" => {
                            if let Ok(v) = val.parse::<u64>() {
                                config.display.ttl_seconds = v;
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    Some(config)
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if (val.starts_with('"') && val.ends_with('"'))
        || (val.starts_with('\'') && val.ends_with('\''))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# skytrack configuration".to_string(), String::new()];

    lines.push("source:".into());
    lines.push(format!("  host: \"{}\"", config.source.host));
    lines.push(format!("  port: {}", config.source.port));
    lines.push(String::new());

    lines.push("display:".into());
    lines.push(format!("  trail_length: {}", config.display.trail_length));
    lines.push(format!("  ttl_seconds: {}", config.display.ttl_seconds));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
