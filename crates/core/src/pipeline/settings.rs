//! Pipeline-wide encoder settings.

use serde::{Deserialize, Serialize};

/// x264/x265 speed/quality preset ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPreset {
    VerySlow,
    Slower,
    Slow,
    Medium,
    Fast,
    Faster,
    VeryFast,
    SuperFast,
    UltraFast,
}

impl ConversionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerySlow => "veryslow",
            Self::Slower => "slower",
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
            Self::Faster => "faster",
            Self::VeryFast => "veryfast",
            Self::SuperFast => "superfast",
            Self::UltraFast => "ultrafast",
        }
    }
}

impl std::str::FromStr for ConversionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "veryslow" => Ok(Self::VerySlow),
            "slower" => Ok(Self::Slower),
            "slow" => Ok(Self::Slow),
            "medium" => Ok(Self::Medium),
            "fast" => Ok(Self::Fast),
            "faster" => Ok(Self::Faster),
            "veryfast" => Ok(Self::VeryFast),
            "superfast" => Ok(Self::SuperFast),
            "ultrafast" => Ok(Self::UltraFast),
            other => Err(format!("unknown preset: {}", other)),
        }
    }
}

/// How many threads the tool is told to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPolicy {
    /// No `-threads` flag; the tool decides.
    #[default]
    Default,
    /// `-threads 1`
    Single,
    /// One thread per logical CPU.
    Multi,
    /// An explicit count.
    Fixed(usize),
}

impl ThreadPolicy {
    pub(crate) fn flag(&self) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Single => Some("-threads 1".to_string()),
            Self::Multi => Some(format!("-threads {}", num_cpus::get())),
            Self::Fixed(n) => Some(format!("-threads {}", n)),
        }
    }
}

/// Video sync method (`-vsync`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSyncMethod {
    Passthrough,
    Cfr,
    Vfr,
    Drop,
    Auto,
}

impl VideoSyncMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Cfr => "cfr",
            Self::Vfr => "vfr",
            Self::Drop => "drop",
            Self::Auto => "auto",
        }
    }
}

/// Hardware decoding/encoding setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAcceleration {
    /// Accelerator name passed to `-hwaccel` (e.g. `cuda`, `vaapi`, `auto`).
    pub accelerator: String,
    /// Decoder forced for the input (e.g. `h264_cuvid`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoder: Option<String>,
    /// Encoder for the output (e.g. `h264_nvenc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,
    /// Device number or path for `-hwaccel_device`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl HardwareAcceleration {
    pub fn new(accelerator: impl Into<String>) -> Self {
        Self {
            accelerator: accelerator.into(),
            decoder: None,
            encoder: None,
            device: None,
        }
    }

    pub fn with_decoder(mut self, decoder: impl Into<String>) -> Self {
        self.decoder = Some(decoder.into());
        self
    }

    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = Some(encoder.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub(crate) fn pre_input(&self) -> String {
        let mut parts = vec![format!("-hwaccel {}", self.accelerator)];
        if let Some(device) = &self.device {
            parts.push(format!("-hwaccel_device {}", device));
        }
        if let Some(decoder) = &self.decoder {
            parts.push(format!("-c:v {}", decoder));
        }
        parts.join(" ")
    }
}
