//! Subtitle stream builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::ConverterError;
use crate::probe::SubtitleStreamInfo;

use super::base::StreamBase;
use super::filter::FilterConfiguration;
use super::parameter::ParameterPosition;
use super::{Stream, StreamKind};

/// A subtitle stream carried into the output (not burned in).
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStream {
    base: StreamBase,
    info: Option<SubtitleStreamInfo>,
    language: Option<String>,
    title: Option<String>,
}

impl SubtitleStream {
    pub fn new(source: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            base: StreamBase::new(source.into(), index),
            info: None,
            language: None,
            title: None,
        }
    }

    pub fn from_info(source: impl AsRef<Path>, info: &SubtitleStreamInfo) -> Self {
        Self {
            base: StreamBase::new(source.as_ref().to_path_buf(), info.index),
            info: Some(info.clone()),
            language: None,
            title: None,
        }
    }

    pub fn info(&self) -> Option<&SubtitleStreamInfo> {
        self.info.as_ref()
    }

    pub fn set_codec(mut self, codec: impl Into<String>) -> Self {
        self.base.set_codec("-codec:s", codec.into());
        self
    }

    /// Language tag written to the output stream's metadata.
    pub fn set_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn set_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn set_seek(mut self, seek: Duration) -> Result<Self, ConverterError> {
        self.base.set_seek(seek)?;
        Ok(self)
    }
}

impl Stream for SubtitleStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Subtitle
    }

    fn source(&self) -> &Path {
        &self.base.source
    }

    fn index(&self) -> usize {
        self.base.index
    }

    fn codec(&self) -> Option<&str> {
        self.base
            .codec
            .as_deref()
            .or_else(|| self.info.as_ref().map(|i| i.codec.as_str()))
    }

    fn duration(&self) -> Option<Duration> {
        self.base.duration
    }

    fn build_parameters(&self, position: ParameterPosition) -> String {
        self.base.build_parameters(position)
    }

    fn filters(&self) -> Vec<FilterConfiguration> {
        self.base.filter_configurations()
    }

    fn build_metadata(&self, ordinal: usize) -> String {
        let mut entries: Vec<String> = Vec::new();
        if let Some(language) = &self.language {
            entries.push(format!("-metadata:s:s:{} language={}", ordinal, language));
        }
        if let Some(title) = &self.title {
            entries.push(format!(
                "-metadata:s:s:{} title=\"{}\"",
                ordinal,
                title.replace('"', "\\\"")
            ));
        }
        entries.join(" ")
    }
}
