//! Conversion lifecycle integration tests.
//!
//! These run the real supervisor against a shell script standing in for
//! ffmpeg:
//! - Progress and raw output delivery
//! - Failure classification from the diagnostic log
//! - Cancellation (quit request and forced kill)
//! - Timeouts, including with an unread output channel

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ffpipe_core::{
    AudioStream, ConversionProgress, Converter, ConverterConfig, ConverterError, FfmpegConverter,
    Pipeline, RunOptions, RunState, VideoStream,
};

/// A temp dir holding a fake ffmpeg script.
struct FakeFfmpeg {
    dir: TempDir,
    script: PathBuf,
}

impl FakeFfmpeg {
    fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let script = dir.path().join("ffmpeg.sh");
        std::fs::write(&script, body).expect("Failed to write script");
        Self { dir, script }
    }

    /// The script is run through `sh`, passed as the first global argument.
    fn config(&self) -> ConverterConfig {
        let mut config = ConverterConfig::with_paths(PathBuf::from("sh"), PathBuf::from("ffprobe"))
            .with_cancel_grace(200);
        config.extra_args = vec![self.script.display().to_string()];
        config
    }

    fn converter(&self) -> FfmpegConverter {
        FfmpegConverter::new(self.config())
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out.mp4")
    }
}

fn pipeline(output: &Path) -> Pipeline {
    Pipeline::new()
        .add_stream(VideoStream::new("in.mp4", 0))
        .add_stream(AudioStream::new("in.mp4", 1).set_codec("aac"))
        .set_output(output)
}

const PROGRESS_SCRIPT: &str = r#"
printf '  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s\n' >&2
printf 'frame=  125 fps=50 time=00:00:05.00 bitrate=800.0kbits/s speed=2.0x\r' >&2
printf 'frame=  250 fps=50 time=00:00:10.00 bitrate=800.0kbits/s speed=2.0x\n' >&2
exit 0
"#;

#[tokio::test]
async fn test_successful_run_reports_progress() {
    let fake = FakeFfmpeg::new(PROGRESS_SCRIPT);
    let converter = fake.converter();

    let (progress_tx, mut progress_rx) = mpsc::channel(16);
    let (output_tx, mut output_rx) = mpsc::channel(16);
    let options = RunOptions::default()
        .with_progress(progress_tx)
        .with_output(output_tx);

    let handle = converter
        .start(&pipeline(&fake.output()), options)
        .expect("pipeline should build");
    assert!(handle.arguments().contains("-codec:a aac"));

    let result = handle.wait().await.expect("run should succeed");
    assert_eq!(result.output(), Some(fake.output().as_path()));
    assert!(result.log.contains("time=00:00:10.00"));

    let mut events: Vec<ConversionProgress> = Vec::new();
    while let Some(progress) = progress_rx.recv().await {
        events.push(progress);
    }
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].position, Duration::from_secs(5));
    assert_eq!(events[0].total, Duration::from_secs(10));
    assert_eq!(events[0].speed, Some(2.0));
    assert_eq!(events[1].percent(), Some(100.0));

    let mut lines = Vec::new();
    while let Some(line) = output_rx.recv().await {
        lines.push(line);
    }
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Duration:"));
}

#[tokio::test]
async fn test_handle_state_ends_succeeded() {
    let fake = FakeFfmpeg::new(PROGRESS_SCRIPT);
    let handle = fake
        .converter()
        .start(&pipeline(&fake.output()), RunOptions::default())
        .unwrap();

    let mut state = handle.subscribe();
    state
        .wait_for(|s| s.is_finished())
        .await
        .expect("state channel open");
    assert_eq!(*state.borrow(), RunState::Succeeded);
    assert!(handle.wait().await.is_ok());
}

#[tokio::test]
async fn test_failure_signature_is_classified() {
    let fake = FakeFfmpeg::new(
        r#"
printf 'Unknown decoder '"'"'foo'"'"'\n' >&2
exit 1
"#,
    );

    let err = fake
        .converter()
        .run(&pipeline(&fake.output()), RunOptions::default())
        .await
        .unwrap_err();

    match err {
        ConverterError::UnknownDecoder {
            message, arguments, ..
        } => {
            assert_eq!(message, "Unknown decoder 'foo'");
            assert!(arguments.contains("-map 0:1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_zero_exit_is_conversion_failed() {
    let fake = FakeFfmpeg::new(
        r#"
printf 'in.mp4: No such file or directory\n' >&2
exit 2
"#,
    );

    let err = fake
        .converter()
        .convert(&pipeline(&fake.output()))
        .await
        .unwrap_err();

    match &err {
        ConverterError::ConversionFailed { exit_code, .. } => assert_eq!(*exit_code, Some(2)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.diagnostics().unwrap().contains("No such file or directory"));
    assert!(!err.to_string().contains("No such file or directory"));
}

#[tokio::test]
async fn test_cancel_sends_quit_request() {
    // Exits as soon as anything arrives on stdin, like ffmpeg does on `q`.
    let fake = FakeFfmpeg::new(
        r#"
printf 'frame=1 time=00:00:01.00 speed=1.0x\n' >&2
read -r answer
exit 255
"#,
    );

    let cancel = CancellationToken::new();
    let (progress_tx, mut progress_rx) = mpsc::channel(4);
    let handle = fake
        .converter()
        .start(
            &pipeline(&fake.output()),
            RunOptions::default()
                .with_progress(progress_tx)
                .with_cancel(cancel.clone()),
        )
        .unwrap();

    // Wait until the process is up and talking.
    assert!(progress_rx.recv().await.is_some());
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancellation should finish promptly")
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancel_kills_unresponsive_process() {
    let fake = FakeFfmpeg::new(
        r#"
printf 'frame=1 time=00:00:01.00 speed=1.0x\n' >&2
exec sleep 30
"#,
    );

    let (progress_tx, mut progress_rx) = mpsc::channel(4);
    let handle = fake
        .converter()
        .start(
            &pipeline(&fake.output()),
            RunOptions::default().with_progress(progress_tx),
        )
        .unwrap();

    assert!(progress_rx.recv().await.is_some());
    let mut state = handle.subscribe();
    handle.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("kill should finish promptly")
        .unwrap_err();
    assert!(matches!(err, ConverterError::Cancelled));

    state.wait_for(|s| s.is_finished()).await.unwrap();
    assert_eq!(*state.borrow(), RunState::Cancelled);
}

#[tokio::test]
async fn test_timeout_kills_process() {
    let fake = FakeFfmpeg::new("exec sleep 30\n");
    let converter = FfmpegConverter::new(fake.config().with_timeout(1));

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        converter.convert(&pipeline(&fake.output())),
    )
    .await
    .expect("timeout should fire")
    .unwrap_err();

    match err {
        ConverterError::Timeout {
            timeout_secs,
            arguments,
        } => {
            assert_eq!(timeout_secs, 1);
            assert!(arguments.contains("\"in.mp4\""));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_build_error_prevents_spawn() {
    let fake = FakeFfmpeg::new("exit 0\n");
    let converter = fake.converter();

    let duplicate = Pipeline::new()
        .add_stream(VideoStream::new("in.mp4", 0))
        .add_stream(VideoStream::new("in.mp4", 0).set_codec("libx264"))
        .set_output(fake.output());

    let err = converter.start(&duplicate, RunOptions::default()).unwrap_err();
    assert!(matches!(err, ConverterError::Configuration { .. }));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let fake = FakeFfmpeg::new(PROGRESS_SCRIPT);
    let converter = fake.converter();

    let outputs: Vec<PathBuf> = (0..3)
        .map(|i| fake.dir.path().join(format!("out{}.mp4", i)))
        .collect();
    let pipelines: Vec<Pipeline> = outputs.iter().map(|o| pipeline(o)).collect();

    let results = futures::future::join_all(pipelines.iter().map(|p| converter.convert(p))).await;

    for (result, output) in results.into_iter().zip(&outputs) {
        let result = result.expect("run should succeed");
        assert_eq!(result.output(), Some(output.as_path()));
    }
}

const CHATTY_SCRIPT: &str = r#"
i=0
while [ $i -lt 50 ]; do
    printf 'frame=%d time=00:00:01.00 speed=1.0x\n' $i >&2
    i=$((i + 1))
done
exec sleep 30
"#;

#[tokio::test]
async fn test_cancel_while_output_channel_is_full() {
    let fake = FakeFfmpeg::new(CHATTY_SCRIPT);

    // Never read: the supervisor blocks on the second line.
    let (output_tx, _output_rx) = mpsc::channel(1);
    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let handle = fake
        .converter()
        .start(
            &pipeline(&fake.output()),
            RunOptions::default()
                .with_output(output_tx)
                .with_progress(progress_tx),
        )
        .unwrap();

    assert!(progress_rx.recv().await.is_some());
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancellation should not wait for the output reader")
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_timeout_while_output_channel_is_full() {
    let fake = FakeFfmpeg::new(CHATTY_SCRIPT);
    let converter = FfmpegConverter::new(fake.config().with_timeout(1));

    let (output_tx, _output_rx) = mpsc::channel(1);
    let err = tokio::time::timeout(
        Duration::from_secs(10),
        converter.run(
            &pipeline(&fake.output()),
            RunOptions::default().with_output(output_tx),
        ),
    )
    .await
    .expect("timeout should not wait for the output reader")
    .unwrap_err();

    assert!(matches!(err, ConverterError::Timeout { timeout_secs: 1, .. }));
}

#[tokio::test]
async fn test_cancel_after_exit_is_noop() {
    let fake = FakeFfmpeg::new(PROGRESS_SCRIPT);
    let handle = fake
        .converter()
        .start(&pipeline(&fake.output()), RunOptions::default())
        .unwrap();

    let mut state = handle.subscribe();
    state.wait_for(|s| s.is_finished()).await.unwrap();

    handle.cancel();
    handle.cancel();
    assert_eq!(handle.state(), RunState::Succeeded);

    let result = handle.wait().await.expect("finished run stays successful");
    assert!(result.log.contains("time=00:00:10.00"));
    assert_eq!(*state.borrow(), RunState::Succeeded);
}
