use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ===== SNAPSHOT TYPES =====

/// One named telemetry quantity as published by the acquisition process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub value: ChannelValue,
}

/// Channel values arrive either as preformatted text (`"13.52 V"`) or as
/// bare JSON numbers. Both are displayed verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ChannelValue {
    Number(f64),
    Text(String),
}

impl ChannelValue {
    /// Numeric reading used for plotting. Text is parsed by its leading
    /// numeric prefix, so units are ignored; anything else is NaN.
    pub fn as_sample(&self) -> f64 {
        match self {
            ChannelValue::Number(value) => *value,
            ChannelValue::Text(text) => parse_leading_number(text),
        }
    }
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelValue::Number(value) => write!(f, "{}", value),
            ChannelValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for ChannelValue {
    fn from(text: &str) -> Self {
        ChannelValue::Text(text.to_string())
    }
}

impl From<f64> for ChannelValue {
    fn from(value: f64) -> Self {
        ChannelValue::Number(value)
    }
}

/// Complete set of channel values at one instant.
///
/// Channel order only matters the first time a viewer sees a snapshot;
/// afterwards channels are matched by name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub channels: Vec<Channel>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|channel| channel.name.clone())
            .collect()
    }
}

// ===== UTILITY FUNCTIONS =====

/// Parses the longest numeric prefix of `text` after leading whitespace.
///
/// Accepts an optional sign, digits with at most one decimal point and an
/// optional exponent, plus `Infinity`. Returns NaN when no digits lead.
pub fn parse_leading_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    if trimmed[end..].starts_with("Infinity") {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                end += 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return f64::NAN;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len() && matches!(bytes[exponent_end], b'+' | b'-') {
            exponent_end += 1;
        }
        let exponent_digits = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits {
            end = exponent_end;
        }
    }

    trimmed[..end].parse::<f64>().unwrap_or(f64::NAN)
}

// ===== CONFIG TYPES =====

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub server: ServerSection,
    pub viewer: ViewerSection,
}

impl TelemetryConfig {
    pub const DEFAULT_FILE: &'static str = "telemetry.toml";

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub snapshot_path: String,
    pub bind_addr: String,
    pub retry_delay_ms: u64,
    pub debounce_ms: u64,
    pub replay_last_snapshot: bool,
    pub session_queue: usize,
}

impl ServerSection {
    /// Debounce windows shorter than this are raised to it.
    pub const MIN_DEBOUNCE_MS: u64 = 50;

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.max(Self::MIN_DEBOUNCE_MS))
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            snapshot_path: "../acquire/telemChannels.json".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            retry_delay_ms: 1000,
            debounce_ms: Self::MIN_DEBOUNCE_MS,
            replay_last_snapshot: true,
            session_queue: 16,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerSection {
    pub server_url: String,
    pub cadence_ms: u64,
    pub retention_secs: f64,
    pub reconnect_delay_ms: u64,
    pub summary_interval_ms: u64,
    pub charts: Vec<ChartSection>,
}

impl ViewerSection {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms.max(1))
    }
}

impl Default for ViewerSection {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_string(),
            cadence_ms: 100,
            retention_secs: 30.0,
            reconnect_delay_ms: 1000,
            summary_interval_ms: 1000,
            charts: Vec::new(),
        }
    }
}

/// One line chart bound to a single channel.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChartSection {
    pub channel: String,
    #[serde(default)]
    pub retention_secs: Option<f64>,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

impl ChartSection {
    pub fn for_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    /// Configured vertical range, only when both ends are present.
    pub fn initial_bounds(&self) -> Option<(f64, f64)> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => Some((lower, upper)),
            _ => None,
        }
    }
}
