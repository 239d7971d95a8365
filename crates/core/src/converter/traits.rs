//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ConverterError;
use super::run::RunOptions;
use super::types::ConversionResult;
use crate::pipeline::Pipeline;
use crate::probe::MediaInfo;

/// Something that can execute pipelines.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Runs a pipeline to completion.
    ///
    /// Progress and raw diagnostic lines go to the senders in `options`;
    /// cancelling `options.cancel` stops this run only.
    async fn run(
        &self,
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<ConversionResult, ConverterError>;

    /// Runs a pipeline without hooks.
    async fn convert(&self, pipeline: &Pipeline) -> Result<ConversionResult, ConverterError> {
        self.run(pipeline, RunOptions::default()).await
    }

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
