//! Ready-made pipelines for common jobs, built from probe results.

use std::path::Path;
use std::time::Duration;

use crate::converter::ConverterError;
use crate::pipeline::Pipeline;
use crate::probe::MediaInfo;
use crate::stream::{AudioStream, VideoStream, WatermarkPosition};

fn first_video(info: &MediaInfo) -> Result<VideoStream, ConverterError> {
    info.video().into_iter().next().ok_or_else(|| {
        ConverterError::configuration(format!("{} has no video stream", info.path.display()))
    })
}

fn first_audio(info: &MediaInfo) -> Result<AudioStream, ConverterError> {
    info.audio().into_iter().next().ok_or_else(|| {
        ConverterError::configuration(format!("{} has no audio stream", info.path.display()))
    })
}

/// The first audio stream alone.
pub fn extract_audio(info: &MediaInfo, output: impl AsRef<Path>) -> Result<Pipeline, ConverterError> {
    Ok(Pipeline::new()
        .add_stream(first_audio(info)?)
        .set_output(output.as_ref()))
}

/// The first video stream alone, without sound.
pub fn extract_video(info: &MediaInfo, output: impl AsRef<Path>) -> Result<Pipeline, ConverterError> {
    Ok(Pipeline::new()
        .add_stream(first_video(info)?)
        .set_output(output.as_ref()))
}

/// The picture of `video` with the sound of `audio`.
pub fn add_audio(
    video: &MediaInfo,
    audio: &MediaInfo,
    output: impl AsRef<Path>,
) -> Result<Pipeline, ConverterError> {
    Ok(Pipeline::new()
        .add_stream(first_video(video)?)
        .add_stream(first_audio(audio)?)
        .set_output(output.as_ref()))
}

/// One frame taken at `at`, written as an image.
pub fn snapshot(
    info: &MediaInfo,
    output: impl AsRef<Path>,
    at: Duration,
) -> Result<Pipeline, ConverterError> {
    let video = first_video(info)?.set_seek(at)?.set_output_frames_count(1);
    Ok(Pipeline::new().add_stream(video).set_output(output.as_ref()))
}

/// `duration` of video and sound starting at `start`.
pub fn split(
    info: &MediaInfo,
    output: impl AsRef<Path>,
    start: Duration,
    duration: Duration,
) -> Result<Pipeline, ConverterError> {
    let mut pipeline = Pipeline::new();
    for video in info.video() {
        pipeline = pipeline.add_stream(video.set_seek(start)?);
    }
    for audio in info.audio() {
        pipeline = pipeline.add_stream(audio.set_seek(start)?);
    }
    if pipeline.streams().is_empty() {
        return Err(ConverterError::configuration(format!(
            "{} has no video or audio stream",
            info.path.display()
        )));
    }
    Ok(pipeline
        .set_output_time(duration)
        .set_output(output.as_ref()))
}

/// Speeds video and sound up (or down) by `multiplier`, in [0.5, 2.0].
pub fn change_speed(
    info: &MediaInfo,
    output: impl AsRef<Path>,
    multiplier: f64,
) -> Result<Pipeline, ConverterError> {
    let mut pipeline = Pipeline::new().add_stream(first_video(info)?.change_speed(multiplier)?);
    if let Ok(audio) = first_audio(info) {
        pipeline = pipeline.add_stream(audio.change_speed(multiplier)?);
    }
    Ok(pipeline.set_output(output.as_ref()))
}

/// Renders a subtitle file into the picture; sound is carried over.
pub fn burn_subtitles(
    info: &MediaInfo,
    subtitles: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<Pipeline, ConverterError> {
    let video = first_video(info)?.add_subtitles(subtitles, None, None);
    Ok(Pipeline::new()
        .add_stream(video)
        .add_streams(info.audio())
        .set_output(output.as_ref()))
}

/// Overlays `image` on the picture at `position`; sound is carried over.
pub fn set_watermark(
    info: &MediaInfo,
    image: impl AsRef<Path>,
    position: WatermarkPosition,
    output: impl AsRef<Path>,
) -> Result<Pipeline, ConverterError> {
    let video = first_video(info)?.set_watermark(image.as_ref(), position);
    Ok(Pipeline::new()
        .add_stream(video)
        .add_streams(info.audio())
        .set_output(output.as_ref()))
}

/// Re-encodes the first video and audio stream into a new container.
pub fn transcode(
    info: &MediaInfo,
    output: impl AsRef<Path>,
    video_codec: &str,
    audio_codec: &str,
) -> Result<Pipeline, ConverterError> {
    let mut pipeline = Pipeline::new();
    if let Ok(video) = first_video(info) {
        pipeline = pipeline.add_stream(video.set_codec(video_codec));
    }
    if let Ok(audio) = first_audio(info) {
        pipeline = pipeline.add_stream(audio.set_codec(audio_codec));
    }
    if pipeline.streams().is_empty() {
        return Err(ConverterError::configuration(format!(
            "{} has no video or audio stream",
            info.path.display()
        )));
    }
    Ok(pipeline.set_output(output.as_ref()))
}
