//! Named filter assignments and the helpers that compute their values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::converter::ConverterError;
use crate::timecode::format_decimal;

/// Slowest accepted speed multiplier.
pub const MIN_SPEED: f64 = 0.5;
/// Fastest accepted speed multiplier.
pub const MAX_SPEED: f64 = 2.0;

/// Filter family; each family becomes one filter-graph clause per pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    /// `-filter_complex`
    Complex,
    /// `-filter:a`
    Audio,
}

impl FilterCategory {
    /// The ffmpeg flag that introduces this category's clause.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Complex => "-filter_complex",
            Self::Audio => "-filter:a",
        }
    }
}

/// One `name=value` filter entry. An empty value renders as the bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAssignment {
    pub name: String,
    pub value: String,
}

impl FilterAssignment {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn render(&self) -> String {
        if self.value.is_empty() {
            self.name.clone()
        } else {
            format!("{}={}", self.name, self.value)
        }
    }
}

/// The filters one stream contributes to one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfiguration {
    pub category: FilterCategory,
    pub stream_index: usize,
    pub filters: Vec<FilterAssignment>,
}

/// A stream's private filter map. Last write per name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FilterSet {
    entries: Vec<(FilterCategory, FilterAssignment)>,
}

impl FilterSet {
    pub(crate) fn set(
        &mut self,
        category: FilterCategory,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let assignment = FilterAssignment::new(name, value);
        match self
            .entries
            .iter_mut()
            .find(|(_, existing)| existing.name == assignment.name)
        {
            Some(entry) => *entry = (category, assignment),
            None => self.entries.push((category, assignment)),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups entries by category, categories in first-seen order.
    pub(crate) fn configurations(&self, stream_index: usize) -> Vec<FilterConfiguration> {
        let mut configurations: Vec<FilterConfiguration> = Vec::new();
        for (category, assignment) in &self.entries {
            match configurations.iter_mut().find(|c| c.category == *category) {
                Some(config) => config.filters.push(assignment.clone()),
                None => configurations.push(FilterConfiguration {
                    category: *category,
                    stream_index,
                    filters: vec![assignment.clone()],
                }),
            }
        }
        configurations
    }
}

/// Rejects multipliers outside `[MIN_SPEED, MAX_SPEED]` (and NaN).
pub fn validate_speed(multiplier: f64) -> Result<(), ConverterError> {
    if (MIN_SPEED..=MAX_SPEED).contains(&multiplier) {
        Ok(())
    } else {
        Err(ConverterError::out_of_range(
            "speed",
            format!(
                "multiplier {} out of [{}, {}]",
                multiplier, MIN_SPEED, MAX_SPEED
            ),
        ))
    }
}

/// Presentation timestamp scale for a speed multiplier.
///
/// `m >= 1` compresses linearly down to 0.5 at 2x; `m < 1` stretches up to
/// 2.0 at 0.5x.
pub fn video_speed_scale(multiplier: f64) -> Result<f64, ConverterError> {
    validate_speed(multiplier)?;
    let scale = if multiplier >= 1.0 {
        1.0 - (multiplier - 1.0) / 2.0
    } else {
        1.0 + (multiplier - 1.0) * -2.0
    };
    Ok(scale)
}

/// `setpts` value for a speed multiplier, e.g. `"0.75*PTS"` for 1.5x.
pub fn video_speed_filter(multiplier: f64) -> Result<String, ConverterError> {
    Ok(format!("{}*PTS", format_decimal(video_speed_scale(multiplier)?)))
}

/// `atempo` value for a speed multiplier.
pub fn audio_speed_filter(multiplier: f64) -> Result<String, ConverterError> {
    validate_speed(multiplier)?;
    Ok(format_decimal(multiplier))
}

/// Where a watermark image is overlaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPosition {
    UpperLeft,
    Up,
    UpperRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl WatermarkPosition {
    /// `overlay` coordinates, inset by five pixels from the edges.
    pub fn overlay_expression(&self) -> &'static str {
        match self {
            Self::UpperLeft => "5:5",
            Self::Up => "(main_w-overlay_w)/2:5",
            Self::UpperRight => "main_w-overlay_w-5:5",
            Self::Left => "5:(main_h-overlay_h)/2",
            Self::Center => "(main_w-overlay_w)/2:(main_h-overlay_h)/2",
            Self::Right => "main_w-overlay_w-5:(main_h-overlay_h)/2",
            Self::BottomLeft => "5:main_h-overlay_h-5",
            Self::Bottom => "(main_w-overlay_w)/2:main_h-overlay_h-5",
            Self::BottomRight => "main_w-overlay_w-5:main_h-overlay_h-5",
        }
    }
}

/// Rotation through the `transpose` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    CounterClockwiseAndFlip,
    Clockwise,
    CounterClockwise,
    ClockwiseAndFlip,
}

impl Rotation {
    pub fn transpose_value(&self) -> u8 {
        match self {
            Self::CounterClockwiseAndFlip => 0,
            Self::Clockwise => 1,
            Self::CounterClockwise => 2,
            Self::ClockwiseAndFlip => 3,
        }
    }
}

/// Quotes a path for use as a filter argument (`subtitles='...'`).
pub(crate) fn filter_path(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'");
    format!("'{}'", escaped)
}
