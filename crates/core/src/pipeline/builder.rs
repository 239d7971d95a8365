//! The pipeline: streams plus global settings, compiled into one command line.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::ConverterError;
use crate::stream::{
    MediaStream, Parameter, ParameterList, ParameterPosition, Stream, StreamKind,
};
use crate::timecode::{format_decimal, format_timestamp};

use super::args::{quote, split_arguments};
use super::filter_graph::build_filter_graph;
use super::settings::{ConversionPreset, HardwareAcceleration, ThreadPolicy, VideoSyncMethod};

/// A complete conversion job.
///
/// Building is a pure function of the current streams and settings: it never
/// mutates the pipeline or the streams it holds, so it can be called any
/// number of times and always yields the same string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    streams: Vec<MediaStream>,
    output: Option<PathBuf>,
    overwrite: bool,
    preset: Option<ConversionPreset>,
    threads: ThreadPolicy,
    shortest: bool,
    parameters: ParameterList,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stream(mut self, stream: impl Into<MediaStream>) -> Self {
        self.streams.push(stream.into());
        self
    }

    pub fn add_streams<I, S>(mut self, streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MediaStream>,
    {
        self.streams.extend(streams.into_iter().map(Into::into));
        self
    }

    /// Drops every stream that reads `index` from `source`.
    pub fn remove_stream(mut self, source: &Path, index: usize) -> Self {
        self.streams
            .retain(|s| !(s.source() == source && s.index() == index));
        self
    }

    pub fn streams(&self) -> &[MediaStream] {
        &self.streams
    }

    pub fn set_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// `-y` when true, `-n` otherwise.
    pub fn set_overwrite_output(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn set_preset(mut self, preset: ConversionPreset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn set_threads(mut self, threads: ThreadPolicy) -> Result<Self, ConverterError> {
        if threads == ThreadPolicy::Fixed(0) {
            return Err(ConverterError::out_of_range(
                "threads",
                "thread count must be greater than zero",
            ));
        }
        self.threads = threads;
        Ok(self)
    }

    /// One thread per CPU when enabled, a single thread otherwise.
    pub fn use_multi_thread(mut self, enabled: bool) -> Self {
        self.threads = if enabled {
            ThreadPolicy::Multi
        } else {
            ThreadPolicy::Single
        };
        self
    }

    pub fn use_shortest(mut self, shortest: bool) -> Self {
        self.shortest = shortest;
        self
    }

    /// Appends a raw parameter; it is split on whitespace (quotes honoured)
    /// when the process is spawned.
    pub fn add_parameter(mut self, text: impl Into<String>, position: ParameterPosition) -> Self {
        self.parameters.push(Parameter::new(text, position));
        self
    }

    /// Output seek (`-ss` after the inputs; decodes and discards up to `seek`).
    pub fn set_seek(mut self, seek: Duration) -> Self {
        self.parameters.set(
            "seek",
            Parameter::post_input(format!("-ss {}", format_timestamp(seek))),
        );
        self
    }

    /// Limits how much of the inputs is read.
    pub fn set_input_time(mut self, time: Duration) -> Self {
        self.parameters.set(
            "input_time",
            Parameter::pre_input(format!("-t {}", format_timestamp(time))),
        );
        self
    }

    /// Limits the output length.
    pub fn set_output_time(mut self, time: Duration) -> Self {
        self.parameters.set(
            "output_time",
            Parameter::post_input(format!("-t {}", format_timestamp(time))),
        );
        self
    }

    /// Frame rate assumed for raw or image-sequence inputs.
    pub fn set_frame_rate(mut self, fps: f64) -> Result<Self, ConverterError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConverterError::out_of_range(
                "framerate",
                format!("{} is not a positive frame rate", fps),
            ));
        }
        self.parameters.set(
            "input_frame_rate",
            Parameter::pre_input(format!("-framerate {}", format_decimal(fps))),
        );
        Ok(self)
    }

    pub fn set_pixel_format(mut self, format: impl Into<String>) -> Self {
        self.parameters.set(
            "pixel_format",
            Parameter::post_input(format!("-pix_fmt {}", format.into())),
        );
        self
    }

    pub fn set_input_format(mut self, format: impl Into<String>) -> Self {
        self.parameters.set(
            "input_format",
            Parameter::pre_input(format!("-f {}", format.into())),
        );
        self
    }

    pub fn set_output_format(mut self, format: impl Into<String>) -> Self {
        self.parameters.set(
            "output_format",
            Parameter::post_input(format!("-f {}", format.into())),
        );
        self
    }

    pub fn set_video_sync_method(mut self, method: VideoSyncMethod) -> Self {
        self.parameters.set(
            "vsync",
            Parameter::post_input(format!("-vsync {}", method.as_str())),
        );
        self
    }

    pub fn use_hardware_acceleration(mut self, hardware: &HardwareAcceleration) -> Self {
        self.parameters
            .set("hwaccel", Parameter::pre_input(hardware.pre_input()));
        if let Some(encoder) = &hardware.encoder {
            self.parameters.set(
                "hwaccel_encoder",
                Parameter::post_input(format!("-c:v {}", encoder)),
            );
        }
        self
    }

    /// Distinct stream sources in first-seen order.
    ///
    /// The position of a source in this list is its input index; it is
    /// recomputed on every build.
    fn sources(&self) -> Result<Vec<&Path>, ConverterError> {
        let mut seen_streams: HashSet<(&Path, usize)> = HashSet::new();
        let mut sources: Vec<&Path> = Vec::new();

        for stream in &self.streams {
            if !seen_streams.insert((stream.source(), stream.index())) {
                return Err(ConverterError::configuration(format!(
                    "stream {} of {} is declared more than once",
                    stream.index(),
                    stream.source().display()
                )));
            }
            if !sources.contains(&stream.source()) {
                sources.push(stream.source());
            }
        }

        Ok(sources)
    }

    /// Renders the argument string.
    ///
    /// Section order is fixed: pre-input extras, per-source pre-input stream
    /// parameters with their `-i`, extra inputs, overwrite flag, threads,
    /// preset, shortest, stream post-input parameters, filter graph, `-map`
    /// entries, post-input extras, output.
    pub fn build(&self) -> Result<String, ConverterError> {
        let sources = self.sources()?;
        let mut sections: Vec<String> = Vec::new();

        sections.push(self.parameters.build(ParameterPosition::PreInput));

        for source in &sources {
            let mut input_parameters: Vec<String> = Vec::new();
            for stream in self.streams.iter().filter(|s| s.source() == *source) {
                let text = stream.build_parameters(ParameterPosition::PreInput);
                if !text.is_empty() && !input_parameters.contains(&text) {
                    input_parameters.push(text);
                }
            }
            sections.extend(input_parameters);
            sections.push(format!("-i {}", quote(source)));
        }

        let mut extra_inputs: Vec<&Path> = Vec::new();
        for path in self.streams.iter().flat_map(|s| s.extra_inputs()) {
            if !sources.contains(&path) && !extra_inputs.contains(&path) {
                extra_inputs.push(path);
            }
        }
        for path in extra_inputs {
            sections.push(format!("-i {}", quote(path)));
        }

        sections.push(if self.overwrite { "-y" } else { "-n" }.to_string());

        if let Some(flag) = self.threads.flag() {
            sections.push(flag);
        }

        if let Some(preset) = self.preset {
            sections.push(format!("-preset {}", preset.as_str()));
        }

        if self.shortest {
            sections.push("-shortest".to_string());
        }

        let mut ordinals: HashMap<StreamKind, usize> = HashMap::new();
        for stream in &self.streams {
            sections.push(stream.build_parameters(ParameterPosition::PostInput));
            let ordinal = ordinals.entry(stream.kind()).or_insert(0);
            sections.push(stream.build_metadata(*ordinal));
            *ordinal += 1;
        }

        sections.push(build_filter_graph(&self.streams));

        for stream in &self.streams {
            let input_index = sources
                .iter()
                .position(|s| *s == stream.source())
                .ok_or_else(|| {
                    ConverterError::configuration(format!(
                        "no input declared for {}",
                        stream.source().display()
                    ))
                })?;
            sections.push(format!("-map {}:{}", input_index, stream.index()));
        }

        sections.push(self.parameters.build(ParameterPosition::PostInput));

        if let Some(output) = &self.output {
            sections.push(quote(output));
        }

        Ok(sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// The argument vector to spawn, i.e. [`build`](Self::build) split with
    /// quotes honoured.
    pub fn build_args(&self) -> Result<Vec<String>, ConverterError> {
        Ok(split_arguments(&self.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AudioStream, SubtitleStream, VideoStream, WatermarkPosition};

    #[test]
    fn test_audio_codec_and_bitrate_appear_once() {
        let pipeline = Pipeline::new()
            .add_stream(
                AudioStream::new("song.wav", 0)
                    .set_codec("aac")
                    .set_bitrate(128_000)
                    .unwrap(),
            )
            .set_output("song.m4a");

        let args = pipeline.build().unwrap();
        assert_eq!(args.matches("-codec:a aac").count(), 1);
        assert_eq!(args.matches("-b:a 128k").count(), 1);
        assert_eq!(
            args,
            "-i \"song.wav\" -n -codec:a aac -b:a 128k -map 0:0 \"song.m4a\""
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0).change_speed(1.5).unwrap())
            .add_stream(AudioStream::new("a.mp4", 1).change_speed(1.5).unwrap())
            .set_preset(ConversionPreset::Fast)
            .set_overwrite_output(true)
            .set_output("out.mp4");

        assert_eq!(pipeline.build().unwrap(), pipeline.build().unwrap());
    }

    #[test]
    fn test_inputs_in_first_seen_order_and_maps_match() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("b.mkv", 0))
            .add_stream(AudioStream::new("a.mka", 0))
            .add_stream(AudioStream::new("b.mkv", 1))
            .add_stream(SubtitleStream::new("c.srt", 0))
            .set_output("out.mkv");

        let args = pipeline.build().unwrap();
        assert_eq!(
            args,
            "-i \"b.mkv\" -i \"a.mka\" -i \"c.srt\" -n \
             -map 0:0 -map 1:0 -map 0:1 -map 2:0 \"out.mkv\""
        );
        assert_eq!(args.matches("-i ").count(), 3);
    }

    #[test]
    fn test_subtitle_metadata_addresses_output_position() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("film.mkv", 0))
            .add_stream(SubtitleStream::new("film.mkv", 4).set_language("eng"))
            .add_stream(
                SubtitleStream::new("film.mkv", 2)
                    .set_language("ger")
                    .set_title("Deutsch"),
            )
            .set_output("out.mkv");

        assert_eq!(
            pipeline.build().unwrap(),
            "-i \"film.mkv\" -n -metadata:s:s:0 language=eng \
             -metadata:s:s:1 language=ger -metadata:s:s:1 title=\"Deutsch\" \
             -map 0:0 -map 0:4 -map 0:2 \"out.mkv\""
        );
    }

    #[test]
    fn test_section_order_ignores_setter_call_order() {
        let a = Pipeline::new()
            .set_output("o.mp4")
            .use_shortest(true)
            .set_preset(ConversionPreset::Slow)
            .set_threads(ThreadPolicy::Fixed(4))
            .unwrap()
            .set_overwrite_output(true)
            .add_stream(VideoStream::new("i.mp4", 0).set_codec("libx264"));
        let b = Pipeline::new()
            .add_stream(VideoStream::new("i.mp4", 0).set_codec("libx264"))
            .set_overwrite_output(true)
            .set_threads(ThreadPolicy::Fixed(4))
            .unwrap()
            .set_preset(ConversionPreset::Slow)
            .use_shortest(true)
            .set_output("o.mp4");

        let expected = "-i \"i.mp4\" -y -threads 4 -preset slow -shortest \
                        -codec:v libx264 -map 0:0 \"o.mp4\"";
        assert_eq!(a.build().unwrap(), expected);
        assert_eq!(b.build().unwrap(), expected);
    }

    #[test]
    fn test_extra_parameters_bracket_the_command() {
        let pipeline = Pipeline::new()
            .add_parameter("-hide_banner", ParameterPosition::PreInput)
            .add_parameter("-movflags +faststart", ParameterPosition::PostInput)
            .add_stream(VideoStream::new("i.mp4", 0))
            .set_output("o.mp4");

        assert_eq!(
            pipeline.build().unwrap(),
            "-hide_banner -i \"i.mp4\" -n -map 0:0 -movflags +faststart \"o.mp4\""
        );
    }

    #[test]
    fn test_stream_pre_input_parameters_precede_their_input() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0))
            .add_stream(
                AudioStream::new("b.mp3", 0)
                    .set_seek(Duration::from_secs(3))
                    .unwrap(),
            )
            .set_output("o.mp4");

        assert_eq!(
            pipeline.build().unwrap(),
            "-i \"a.mp4\" -ss 00:00:03.000 -i \"b.mp3\" -n -map 0:0 -map 1:0 \"o.mp4\""
        );
    }

    #[test]
    fn test_filters_and_watermark_input() {
        let pipeline = Pipeline::new()
            .add_stream(
                VideoStream::new("a.mp4", 0).set_watermark("logo.png", WatermarkPosition::UpperLeft),
            )
            .set_output("o.mp4");

        assert_eq!(
            pipeline.build().unwrap(),
            "-i \"a.mp4\" -i \"logo.png\" -n -filter_complex \"[0] overlay=5:5 \" -map 0:0 \"o.mp4\""
        );
    }

    #[test]
    fn test_duplicate_stream_is_configuration_error() {
        let stream = VideoStream::new("a.mp4", 0);
        let pipeline = Pipeline::new()
            .add_stream(stream.clone())
            .add_stream(stream)
            .set_output("o.mp4");

        let err = pipeline.build().unwrap_err();
        assert!(matches!(err, ConverterError::Configuration { .. }));
    }

    #[test]
    fn test_input_map_recomputed_after_removal() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0))
            .add_stream(AudioStream::new("b.mp3", 0))
            .set_output("o.mp4");
        assert!(pipeline.build().unwrap().contains("-map 1:0"));

        let pipeline = pipeline.remove_stream(Path::new("a.mp4"), 0);
        assert_eq!(
            pipeline.build().unwrap(),
            "-i \"b.mp3\" -n -map 0:0 \"o.mp4\""
        );
    }

    #[test]
    fn test_shared_stream_builds_identically_in_two_pipelines() {
        let audio = AudioStream::new("a.wav", 0).set_codec("libopus");
        let first = Pipeline::new().add_stream(audio.clone()).set_output("1.opus");
        let second = Pipeline::new()
            .add_stream(VideoStream::new("v.mp4", 0))
            .add_stream(audio.clone())
            .set_output("2.mkv");

        first.build().unwrap();
        second.build().unwrap();
        assert_eq!(
            audio.build_parameters(ParameterPosition::PostInput),
            "-codec:a libopus"
        );
        assert!(second.build().unwrap().contains("-map 1:0"));
    }

    #[test]
    fn test_global_time_settings() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0))
            .set_input_time(Duration::from_secs(20))
            .set_seek(Duration::from_secs(2))
            .set_output_time(Duration::from_secs(10))
            .set_output("o.mp4");

        assert_eq!(
            pipeline.build().unwrap(),
            "-t 00:00:20.000 -i \"a.mp4\" -n -map 0:0 -ss 00:00:02.000 -t 00:00:10.000 \"o.mp4\""
        );
    }

    #[test]
    fn test_hardware_acceleration() {
        let hw = HardwareAcceleration::new("cuda")
            .with_decoder("h264_cuvid")
            .with_encoder("h264_nvenc");
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0))
            .use_hardware_acceleration(&hw)
            .set_output("o.mp4");

        assert_eq!(
            pipeline.build().unwrap(),
            "-hwaccel cuda -c:v h264_cuvid -i \"a.mp4\" -n -map 0:0 -c:v h264_nvenc \"o.mp4\""
        );
    }

    #[test]
    fn test_build_args_unquotes_paths() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("my clip.mp4", 0))
            .set_output("out dir/o.mp4");
        assert_eq!(
            pipeline.build_args().unwrap(),
            vec!["-i", "my clip.mp4", "-n", "-map", "0:0", "out dir/o.mp4"]
        );
    }

    #[test]
    fn test_input_format_is_pre_input() {
        let pipeline = Pipeline::new()
            .add_stream(VideoStream::new("frames.raw", 0))
            .set_input_format("rawvideo")
            .set_output_format("matroska")
            .set_output("o.mkv");

        assert_eq!(
            pipeline.build().unwrap(),
            "-f rawvideo -i \"frames.raw\" -n -map 0:0 -f matroska \"o.mkv\""
        );
    }

    #[test]
    fn test_multi_thread_toggle() {
        let single = Pipeline::new()
            .add_stream(VideoStream::new("a.mp4", 0))
            .use_multi_thread(false)
            .set_output("o.mp4");
        assert_eq!(
            single.build().unwrap(),
            "-i \"a.mp4\" -n -threads 1 -map 0:0 \"o.mp4\""
        );

        let multi = single.use_multi_thread(true).build().unwrap();
        assert!(multi.contains(&format!("-threads {}", num_cpus::get())));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = Pipeline::new().set_threads(ThreadPolicy::Fixed(0)).unwrap_err();
        assert!(matches!(err, ConverterError::ArgumentOutOfRange { .. }));
    }
}
