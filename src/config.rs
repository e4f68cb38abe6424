//! Render configuration and the encoder options table.
//!
//! Both records are plain serde data so they can be loaded from JSON files by the CLI or built in
//! code by embedders. Field names follow the camelCase option names of the settings file
//! (`outputWidth`, `outputVideoCodec`, ...).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, sample_window_for_fps};
use crate::foundation::error::{AvError, AvResult};

const DEFAULT_ENCODER_OPTIONS: &str = include_str!("encode/encoder-options.json");

/// Frame-loop threading controls.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadingConfig {
    /// Composite frames on a worker pool instead of the render thread.
    pub parallel: bool,
    /// Worker thread count for parallel compositing.
    pub workers: usize,
    /// Bounded queue capacity between workers and the pipe writer.
    pub queue_capacity: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: 3,
            queue_capacity: 20,
        }
    }
}

/// Output settings for one render.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Frame width in pixels.
    pub output_width: u32,
    /// Frame height in pixels.
    pub output_height: u32,
    /// Frames per second.
    pub output_frame_rate: u32,
    /// Container label, matched against [`EncoderOptions::containers`].
    pub output_container: String,
    /// Logical video codec name.
    pub output_video_codec: String,
    /// Logical audio codec name.
    pub output_audio_codec: String,
    /// Video bitrate in kbit/s.
    pub output_video_bitrate: u32,
    /// Audio bitrate in kbit/s.
    pub output_audio_bitrate: u32,
    /// Output pixel format passed to the encoder.
    pub output_video_format: String,
    /// Encoder preset passed verbatim.
    pub output_preset: String,
    /// Explicit transcoder binary, bypassing discovery.
    pub transcoder_path: Option<PathBuf>,
    /// Frame-loop threading.
    pub threading: ThreadingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_width: 1280,
            output_height: 720,
            output_frame_rate: 30,
            output_container: "MP4".to_owned(),
            output_video_codec: "H264".to_owned(),
            output_audio_codec: "AAC".to_owned(),
            output_video_bitrate: 2500,
            output_audio_bitrate: 192,
            output_video_format: "yuv420p".to_owned(),
            output_preset: "medium".to_owned(),
            transcoder_path: None,
            threading: ThreadingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn from_path(path: &Path) -> AvResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read render config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse render config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Output raster dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.output_width,
            height: self.output_height,
        }
    }

    /// PCM samples per output frame.
    pub fn sample_window(&self) -> AvResult<usize> {
        sample_window_for_fps(self.output_frame_rate)
    }

    /// Reject settings the encoder or the frame loop cannot honour.
    pub fn validate(&self) -> AvResult<()> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(AvError::validation(
                "outputWidth/outputHeight must be non-zero",
            ));
        }
        if !self.output_width.is_multiple_of(2) || !self.output_height.is_multiple_of(2) {
            return Err(AvError::validation(
                "outputWidth/outputHeight must be even (required for yuv420p output)",
            ));
        }
        self.sample_window()?;
        if self.output_video_bitrate == 0 || self.output_audio_bitrate == 0 {
            return Err(AvError::validation("output bitrates must be non-zero"));
        }
        if self.output_preset.trim().is_empty() || self.output_video_format.trim().is_empty() {
            return Err(AvError::validation(
                "outputPreset and outputVideoFormat must be set",
            ));
        }
        if self.threading.parallel
            && (self.threading.workers == 0 || self.threading.queue_capacity == 0)
        {
            return Err(AvError::validation(
                "threading workers and queueCapacity must be >= 1 in parallel mode",
            ));
        }
        Ok(())
    }
}

/// One output container and the logical codecs it accepts.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerEntry {
    /// Label shown to users and matched by `outputContainer`.
    pub name: String,
    /// Transcoder muxer name passed to `-f`.
    pub format: String,
    /// Conventional file extension (without dot).
    pub extension: String,
    /// Logical video codecs allowed in this container.
    pub video_codecs: Vec<String>,
    /// Logical audio codecs allowed in this container.
    pub audio_codecs: Vec<String>,
}

/// Container list plus, per logical codec, the ordered encoder identifiers to try.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EncoderOptions {
    /// Known containers.
    pub containers: Vec<ContainerEntry>,
    /// Logical video codec name -> encoder identifiers in preference order.
    pub video_codecs: BTreeMap<String, Vec<String>>,
    /// Logical audio codec name -> encoder identifiers in preference order.
    pub audio_codecs: BTreeMap<String, Vec<String>>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        // The embedded table is covered by unit tests.
        serde_json::from_str(DEFAULT_ENCODER_OPTIONS).unwrap_or_else(|_| Self {
            containers: Vec::new(),
            video_codecs: BTreeMap::new(),
            audio_codecs: BTreeMap::new(),
        })
    }
}

impl EncoderOptions {
    /// Load an encoder options table from a JSON file.
    pub fn from_path(path: &Path) -> AvResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read encoder options '{}'", path.display()))?;
        let opts = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse encoder options '{}'", path.display()))?;
        Ok(opts)
    }

    /// Look up a container by its label (case-insensitive).
    pub fn container(&self, name: &str) -> AvResult<&ContainerEntry> {
        self.containers
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                AvError::validation(format!(
                    "unknown output container '{name}' (known: {})",
                    self.containers
                        .iter()
                        .map(|c| c.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// Encoder identifiers to try for a logical video codec.
    pub fn video_candidates(&self, codec: &str) -> AvResult<&[String]> {
        lookup_codec(&self.video_codecs, codec, "video")
    }

    /// Encoder identifiers to try for a logical audio codec.
    pub fn audio_candidates(&self, codec: &str) -> AvResult<&[String]> {
        lookup_codec(&self.audio_codecs, codec, "audio")
    }
}

fn lookup_codec<'a>(
    table: &'a BTreeMap<String, Vec<String>>,
    codec: &str,
    kind: &str,
) -> AvResult<&'a [String]> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(codec))
        .map(|(_, v)| v.as_slice())
        .ok_or_else(|| AvError::validation(format!("unknown {kind} codec '{codec}'")))
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
