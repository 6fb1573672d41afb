use anyhow::{Context, bail};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, IsTerminal};
use vocseg::capture::{CaptureSource, WavCaptureSource};
use vocseg::cli::Cli;
use vocseg::config::{DetectorMode, PipelineConfig};
use vocseg::encoder::{EncodedSegment, SegmentMeta};
use vocseg::pipeline::{Pipeline, PipelineState};
use vocseg::sink::{SegmentSink, WavDirSink};

/// Sink wrapper that prints a one-line summary per dispatched segment.
struct SummarySink {
    inner: WavDirSink,
    quiet: bool,
}

impl SegmentSink for SummarySink {
    fn dispatch(&mut self, segment: EncodedSegment, meta: SegmentMeta) -> vocseg::Result<()> {
        if !self.quiet {
            eprintln!(
                "vocseg: segment {} ({} ms, {} bytes)",
                meta.sequence,
                meta.duration_ms,
                segment.bytes.len()
            );
        }
        self.inner.dispatch(segment, meta)
    }

    fn finish(&mut self) {
        self.inner.finish();
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(vocseg::cli::Commands::Devices)) {
        #[cfg(feature = "cpal-audio")]
        {
            for name in vocseg::capture_cpal::list_devices()? {
                println!("{}", name);
            }
            return Ok(());
        }
        #[cfg(not(feature = "cpal-audio"))]
        bail!("this build has no live-capture support (cpal-audio feature disabled)");
    }

    let config = load_config(&cli)?;

    let sink = SummarySink {
        inner: WavDirSink::new(&cli.out_dir)
            .with_context(|| {
                format!("failed to create output directory {}", cli.out_dir.display())
            })?
            .with_prefix(&cli.prefix),
        quiet: cli.quiet,
    };

    let (source, live) = open_source(&cli, &config)?;

    let pipeline = Pipeline::new(config)?;
    let handle = pipeline.start(source, Box::new(sink))?;

    let state = if live {
        if !cli.quiet {
            eprintln!("vocseg: listening — press Enter to stop");
        }
        wait_for_enter();
        handle.stop()
    } else {
        handle.wait()
    };

    match state {
        PipelineState::Stopped | PipelineState::Running => {
            if !cli.quiet {
                eprintln!("vocseg: done, segments written to {}", cli.out_dir.display());
            }
            Ok(())
        }
        PipelineState::Failed(message) => bail!("capture failed: {}", message),
    }
}

/// Resolve configuration: file (explicit or default path), then environment,
/// then command-line flags, most specific last.
fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match PipelineConfig::default_path() {
            Some(path) => PipelineConfig::load_or_default(&path)?,
            None => PipelineConfig::default(),
        },
    }
    .with_env_overrides();

    if cli.model_vad {
        config.detector = DetectorMode::Model;
    }
    if let Some(threshold) = cli.threshold {
        config.energy_threshold = threshold;
    }
    if let Some(ms) = cli.min_silence {
        config.min_silence_ms = ms;
    }
    if let Some(ms) = cli.min_utterance {
        config.min_utterance_ms = ms;
    }
    if let Some(ms) = cli.max_utterance {
        config.max_utterance_ms = ms;
    }
    if cli.flush_partial {
        config.flush_partial_on_stop = true;
    }
    Ok(config)
}

/// Pick the capture source: an explicit file or stdin when given, piped
/// stdin otherwise, and the microphone only on an interactive terminal.
fn open_source(
    cli: &Cli,
    config: &PipelineConfig,
) -> anyhow::Result<(Box<dyn CaptureSource>, bool)> {
    if let Some(input) = &cli.input {
        let source: Box<dyn CaptureSource> = if input == "-" {
            Box::new(WavCaptureSource::from_stdin(config.sample_rate)?)
        } else {
            let file = File::open(input).with_context(|| format!("failed to open {}", input))?;
            Box::new(WavCaptureSource::from_reader(
                Box::new(file),
                config.sample_rate,
            )?)
        };
        return Ok((source, false));
    }

    if !std::io::stdin().is_terminal() {
        return Ok((
            Box::new(WavCaptureSource::from_stdin(config.sample_rate)?),
            false,
        ));
    }

    #[cfg(feature = "cpal-audio")]
    {
        let source = vocseg::capture_cpal::CpalCaptureSource::new(
            cli.device.as_deref(),
            config.sample_rate,
        )?;
        Ok((Box::new(source), true))
    }

    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = &cli.device;
        bail!(
            "no input: pass --input FILE, pipe WAV data on stdin, \
             or build with the cpal-audio feature for live capture"
        )
    }
}

fn wait_for_enter() {
    let mut line = String::new();
    let _unused = std::io::stdin().lock().read_line(&mut line);
}
