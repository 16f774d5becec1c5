//! CPAL output for desktop platforms (Linux, macOS, Windows)
//!
//! Opens the default output device and drives a [`Mixer`] from the device
//! callback. The callback only renders into a scratch block and converts to
//! the device sample type; it never touches the control side's lock.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::OutputConfig;
use crate::engine::backend::{Mixer, OutputFormat};
use crate::error::SoundError;

/// Running output stream. Dropping it stops playback.
pub struct CpalOutput {
    _stream: cpal::Stream,
    format: OutputFormat,
    device_name: String,
}

impl CpalOutput {
    /// Open the default output device and start rendering `mixer` into it.
    ///
    /// # Errors
    /// `SoundError::StreamOpenFailed` when no device is available, the device
    /// sample format is not F32/I16/U16, or the stream cannot be built or
    /// started.
    pub fn start(mixer: Mixer, config: &OutputConfig) -> Result<Self, SoundError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SoundError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| SoundError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        let mut stream_config: cpal::StreamConfig = supported.config();
        if let Some(frames) = config.buffer_frames {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let format = OutputFormat {
            channels: stream_config.channels,
            sample_rate: stream_config.sample_rate.0,
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, mixer, format)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, mixer, format)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, mixer, format)?
            }
            other => {
                return Err(SoundError::StreamOpenFailed {
                    reason: format!("Unsupported device sample format: {:?}", other),
                })
            }
        };

        stream.play().map_err(|e| SoundError::StreamOpenFailed {
            reason: format!("Failed to start stream: {}", e),
        })?;

        log::info!(
            "[Output] Streaming to {} ({} ch, {} Hz)",
            device_name,
            format.channels,
            format.sample_rate
        );

        Ok(Self {
            _stream: stream,
            format,
            device_name,
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
    format: OutputFormat,
) -> Result<cpal::Stream, SoundError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Grows only until it reaches the device block size
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                let block = &mut scratch[..data.len()];
                mixer.render(block, format);

                for (out, &sample) in data.iter_mut().zip(block.iter()) {
                    *out = T::from_sample(sample);
                }
            },
            |err| log::error!("[Output] Stream error: {}", err),
            None,
        )
        .map_err(|e| SoundError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })
}
