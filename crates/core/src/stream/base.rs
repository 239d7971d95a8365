//! State shared by every stream kind.

use std::path::PathBuf;
use std::time::Duration;

use crate::converter::ConverterError;
use crate::timecode::format_timestamp;

use super::filter::{FilterConfiguration, FilterSet};
use super::parameter::{Parameter, ParameterList, ParameterPosition};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StreamBase {
    pub(crate) source: PathBuf,
    pub(crate) index: usize,
    pub(crate) duration: Option<Duration>,
    pub(crate) codec: Option<String>,
    pub(crate) parameters: ParameterList,
    pub(crate) filters: FilterSet,
}

impl StreamBase {
    pub(crate) fn new(source: PathBuf, index: usize) -> Self {
        Self {
            source,
            index,
            duration: None,
            codec: None,
            parameters: ParameterList::default(),
            filters: FilterSet::default(),
        }
    }

    pub(crate) fn set_codec(&mut self, flag: &str, codec: String) {
        self.parameters
            .set("codec", Parameter::post_input(format!("{} {}", flag, codec)));
        self.codec = Some(codec);
    }

    /// Bitrate in bits per second, rendered in `k` units when exact.
    pub(crate) fn set_bitrate(&mut self, flag: &str, bits_per_second: u64) -> Result<(), ConverterError> {
        if bits_per_second == 0 {
            return Err(ConverterError::out_of_range(
                "bitrate",
                "bitrate must be greater than zero",
            ));
        }
        self.parameters.set(
            "bitrate",
            Parameter::post_input(format!("{} {}", flag, format_bitrate(bits_per_second))),
        );
        Ok(())
    }

    /// Input seek; fails when the seek lands past a known duration.
    pub(crate) fn set_seek(&mut self, seek: Duration) -> Result<(), ConverterError> {
        if let Some(duration) = self.duration {
            if seek > duration {
                return Err(ConverterError::out_of_range(
                    "seek",
                    format!(
                        "seek position {} exceeds stream duration {}",
                        format_timestamp(seek),
                        format_timestamp(duration)
                    ),
                ));
            }
        }
        self.parameters.set(
            "seek",
            Parameter::pre_input(format!("-ss {}", format_timestamp(seek))),
        );
        Ok(())
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.parameters.set(
            "duration",
            Parameter::post_input(format!("-t {}", format_timestamp(duration))),
        );
    }

    pub(crate) fn build_parameters(&self, position: ParameterPosition) -> String {
        self.parameters.build(position)
    }

    pub(crate) fn filter_configurations(&self) -> Vec<FilterConfiguration> {
        if self.filters.is_empty() {
            return Vec::new();
        }
        self.filters.configurations(self.index)
    }
}

pub(crate) fn format_bitrate(bits_per_second: u64) -> String {
    if bits_per_second % 1000 == 0 {
        format!("{}k", bits_per_second / 1000)
    } else {
        bits_per_second.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bitrate() {
        assert_eq!(format_bitrate(128_000), "128k");
        assert_eq!(format_bitrate(128_500), "128500");
    }

    #[test]
    fn test_seek_within_unknown_duration_is_accepted() {
        let mut base = StreamBase::new(PathBuf::from("in.mp4"), 0);
        assert!(base.set_seek(Duration::from_secs(99_999)).is_ok());
        assert_eq!(
            base.build_parameters(ParameterPosition::PreInput),
            "-ss 27:46:39.000"
        );
    }

    #[test]
    fn test_seek_past_duration_fails() {
        let mut base = StreamBase::new(PathBuf::from("in.mp4"), 0);
        base.duration = Some(Duration::from_secs(10));
        let err = base.set_seek(Duration::from_secs(11)).unwrap_err();
        assert!(matches!(err, ConverterError::ArgumentOutOfRange { .. }));
        assert!(base.build_parameters(ParameterPosition::PreInput).is_empty());
    }
}
