mod args;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ffpipe_core::{
    load_config, load_config_from_env, snippets, validate_config, Config, ConversionQueue,
    Converter, ConverterError, FfmpegConverter, MediaInfo, Pipeline, QueueMode, RunOptions,
    ThreadPolicy,
};

use args::{BatchArgs, Cli, Commands, ConvertArgs};

/// Minimum time between two progress log lines
const PROGRESS_LOG_INTERVAL_MS: u128 = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            cli.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_from_env().context("Failed to load configuration")?,
    };
    validate_config(&config).context("Configuration validation failed")?;

    let converter = FfmpegConverter::new(config.converter.clone());

    match cli.command {
        Commands::Probe { input } => {
            let info = converter
                .probe(&input)
                .await
                .with_context(|| format!("Failed to probe {:?}", input))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Convert(args) => convert(&converter, &config, args).await?,
        Commands::Batch(args) => batch(converter, &config, args).await?,
        Commands::CheckTools => {
            converter.validate().await.context("Tool check failed")?;
            info!(
                ffmpeg = %config.converter.ffmpeg_path.display(),
                ffprobe = %config.converter.ffprobe_path.display(),
                "ffmpeg and ffprobe are available"
            );
        }
    }

    Ok(())
}

/// Builds the pipeline for the convert command from the probed input.
fn convert_pipeline(info: &MediaInfo, args: &ConvertArgs) -> Result<Pipeline, ConverterError> {
    let mut pipeline = Pipeline::new();

    if !args.no_video {
        if let Some(mut video) = info.video().into_iter().next() {
            if let Some(codec) = &args.video_codec {
                video = video.set_codec(codec);
            }
            if let Some(bitrate) = args.video_bitrate {
                video = video.set_bitrate(bitrate)?;
            }
            if let Some(speed) = args.speed {
                video = video.change_speed(speed)?;
            }
            if let Some(seek) = args.seek {
                video = video.set_seek(seek)?;
            }
            if let Some(duration) = args.duration {
                video = video.set_duration(duration);
            }
            pipeline = pipeline.add_stream(video);
        }
    }

    if !args.no_audio {
        if let Some(mut audio) = info.audio().into_iter().next() {
            if let Some(codec) = &args.audio_codec {
                audio = audio.set_codec(codec);
            }
            if let Some(bitrate) = args.audio_bitrate {
                audio = audio.set_bitrate(bitrate)?;
            }
            if let Some(speed) = args.speed {
                audio = audio.change_speed(speed)?;
            }
            if let Some(seek) = args.seek {
                audio = audio.set_seek(seek)?;
            }
            if let Some(duration) = args.duration {
                audio = audio.set_duration(duration);
            }
            pipeline = pipeline.add_stream(audio);
        }
    }

    if pipeline.streams().is_empty() {
        return Err(ConverterError::configuration(format!(
            "nothing to convert in {}",
            info.path.display()
        )));
    }

    let threads = match args.threads {
        Some(n) => ThreadPolicy::Fixed(n),
        None => ThreadPolicy::Multi,
    };
    let mut pipeline = pipeline
        .set_threads(threads)?
        .set_overwrite_output(args.overwrite)
        .set_output(&args.output);
    if let Some(preset) = args.preset {
        pipeline = pipeline.set_preset(preset);
    }

    Ok(pipeline)
}

async fn convert(converter: &FfmpegConverter, config: &Config, args: ConvertArgs) -> Result<()> {
    let info = converter
        .probe(&args.input)
        .await
        .with_context(|| format!("Failed to probe {:?}", args.input))?;
    let pipeline = convert_pipeline(&info, &args).context("Invalid conversion options")?;

    let cancel = CancellationToken::new();
    let (progress_tx, mut progress_rx) = mpsc::channel(config.converter.progress_buffer);
    let options = RunOptions::default()
        .with_progress(progress_tx)
        .with_cancel(cancel.clone());

    let handle = converter.start(&pipeline, options)?;
    info!(arguments = handle.arguments(), "Conversion started");

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling conversion");
            interrupt.cancel();
        }
    });

    let reporter = tokio::spawn(async move {
        let mut last_log: Option<Instant> = None;
        while let Some(progress) = progress_rx.recv().await {
            if last_log.is_some_and(|t| t.elapsed().as_millis() < PROGRESS_LOG_INTERVAL_MS) {
                continue;
            }
            last_log = Some(Instant::now());
            match progress.percent() {
                Some(percent) => info!(
                    percent = (percent * 10.0).round() / 10.0,
                    position = ?progress.position,
                    speed = ?progress.speed,
                    "Converting"
                ),
                None => info!(position = ?progress.position, "Converting"),
            }
        }
    });

    let result = handle.wait().await;
    let _ = reporter.await;

    let result = result.context("Conversion failed")?;
    info!(
        output = ?result.output(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "Conversion finished"
    );
    Ok(())
}

async fn batch(converter: FfmpegConverter, config: &Config, args: BatchArgs) -> Result<()> {
    let mut queue_config = config.queue.clone();
    if args.parallel {
        queue_config.mode = QueueMode::Parallel;
    }
    if args.workers.is_some() {
        queue_config.max_workers = args.workers;
    }

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {:?}", args.output_dir))?;

    let converter = Arc::new(converter);
    let queue = ConversionQueue::with_shared(Arc::clone(&converter), queue_config);

    queue.on_converted(|item| {
        info!(
            number = item.number,
            total = item.total,
            completed = item.completed,
            output = ?item.result.output(),
            "Converted"
        );
    });
    queue.on_exception(|item| {
        warn!(
            number = item.number,
            total = item.total,
            error = %item.error,
            "Conversion failed"
        );
    });

    for input in &args.inputs {
        let info = match converter.probe(input).await {
            Ok(info) => info,
            Err(e) => {
                warn!(input = ?input, error = %e, "Skipping input");
                continue;
            }
        };

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let output = args.output_dir.join(format!("{}.{}", stem, args.extension));

        let pipeline = match snippets::transcode(&info, &output, &args.video_codec, &args.audio_codec) {
            Ok(pipeline) => pipeline.set_overwrite_output(args.overwrite),
            Err(e) => {
                warn!(input = ?input, error = %e, "Skipping input");
                continue;
            }
        };
        queue.add(pipeline)?;
    }

    if queue.total() == 0 {
        bail!("No convertible inputs");
    }

    queue.start()?;
    tokio::select! {
        _ = queue.drain() => {}
        _ = signal::ctrl_c() => {
            warn!("Interrupted, cancelling batch");
            queue.dispose();
        }
    }

    let status = queue.status();
    info!(
        total = status.total,
        completed = status.completed,
        failed = status.failed,
        "Batch finished"
    );

    if status.unsucceeded() > 0 {
        bail!(
            "{} of {} conversions did not succeed",
            status.unsucceeded(),
            status.total
        );
    }

    Ok(())
}
