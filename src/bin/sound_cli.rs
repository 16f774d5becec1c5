use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use spatial_sound::audio::{decode_wav, BufferFormat, SampleEncoding};
use spatial_sound::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "sound_cli", about = "Inspect and play WAV files through the sound layer")]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the decoded header of a WAV file as JSON
    Info { file: PathBuf },
    /// Play a WAV file on the default output device
    Play {
        file: PathBuf,
        #[arg(long)]
        looping: bool,
        /// Stop after this many seconds instead of waiting for the end
        #[arg(long)]
        seconds: Option<f32>,
        /// Play through a spatial source at (x, y) instead of the sound's own source
        #[arg(long, requires = "y", allow_negative_numbers = true)]
        x: Option<f32>,
        #[arg(long, requires = "x", allow_negative_numbers = true)]
        y: Option<f32>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli
        .config
        .as_deref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Play {
            file,
            looping,
            seconds,
            x,
            y,
        } => {
            let position = x.zip(y);
            run_play(&config, &file, looping, seconds, position)
        }
    }
}

fn run_info(path: &Path) -> Result<ExitCode> {
    let decoded = match decode_wav(path) {
        Ok(decoded) => decoded,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(1));
        }
    };

    let report = InfoReport {
        channels: decoded.info.channels,
        sample_rate: decoded.info.sample_rate,
        bits_per_sample: decoded.info.bits_per_sample,
        sample_format: decoded.info.sample_format,
        frames: decoded.frames(),
        duration_ms: decoded.duration_ms(),
        buffer_format: BufferFormat::from_wav(&decoded.info).ok(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

#[cfg(not(target_os = "android"))]
fn run_play(
    config: &AppConfig,
    path: &Path,
    looping: bool,
    seconds: Option<f32>,
    position: Option<(f32, f32)>,
) -> Result<ExitCode> {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::Context;
    use spatial_sound::engine::{AudioBackend, CpalOutput, MixerBackend};
    use spatial_sound::sound::{create_spatial_source_with_config, Sound};
    use spatial_sound::Vec3;

    let (backend, mixer) = MixerBackend::new(&config.mixer);
    let output = CpalOutput::start(mixer, &config.output).context("opening output device")?;
    eprintln!(
        "Output: {} ({} ch, {} Hz)",
        output.device_name(),
        output.format().channels,
        output.format().sample_rate
    );

    let backend: Arc<dyn AudioBackend> = Arc::new(backend);
    let sound = Sound::load_with_config(backend, path, &config.source)
        .with_context(|| format!("loading {}", path.display()))?;

    let spatial = match position {
        Some((x, y)) => Some(
            create_spatial_source_with_config(&sound, Vec3::new(x, y, 0.0), &config.spatial)
                .context("creating spatial source")?,
        ),
        None => None,
    };

    let is_playing = || match &spatial {
        Some(source) => source.is_playing(),
        None => sound.is_playing(),
    };

    match (&spatial, looping) {
        (Some(source), true) => source.play_looping(),
        (Some(source), false) => source.play(),
        (None, true) => sound.play_looping(),
        (None, false) => sound.play(),
    }

    let deadline = seconds.map(playback_deadline).transpose()?;
    loop {
        std::thread::sleep(Duration::from_millis(20));
        if deadline.is_some_and(|d| Instant::now() >= d) || !is_playing() {
            break;
        }
    }

    // Sources go before the output stream
    drop(spatial);
    drop(sound);
    drop(output);
    Ok(ExitCode::from(0))
}

/// Instant at which `--seconds` playback ends.
#[cfg(not(target_os = "android"))]
fn playback_deadline(seconds: f32) -> Result<std::time::Instant> {
    let duration = std::time::Duration::try_from_secs_f32(seconds)
        .map_err(|err| anyhow::anyhow!("invalid --seconds {seconds}: {err}"))?;
    std::time::Instant::now()
        .checked_add(duration)
        .ok_or_else(|| anyhow::anyhow!("--seconds {seconds} is too far in the future"))
}

#[cfg(target_os = "android")]
fn run_play(
    _config: &AppConfig,
    _path: &Path,
    _looping: bool,
    _seconds: Option<f32>,
    _position: Option<(f32, f32)>,
) -> Result<ExitCode> {
    anyhow::bail!("playback needs a desktop output device")
}

#[derive(Serialize)]
struct InfoReport {
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: SampleEncoding,
    frames: usize,
    duration_ms: u64,
    buffer_format: Option<BufferFormat>,
}

#[cfg(all(test, not(target_os = "android")))]
mod tests {
    use super::*;

    #[test]
    fn test_playback_deadline_accepts_finite_seconds() {
        assert!(playback_deadline(0.0).is_ok());
        assert!(playback_deadline(1.5).is_ok());
    }

    #[test]
    fn test_playback_deadline_rejects_unrepresentable_seconds() {
        assert!(playback_deadline(f32::INFINITY).is_err());
        assert!(playback_deadline(f32::NAN).is_err());
        assert!(playback_deadline(-1.0).is_err());
        assert!(playback_deadline(f32::MAX).is_err());
    }
}
