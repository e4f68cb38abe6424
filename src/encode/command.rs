use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::component::AudioContribution;
use crate::config::{EncoderOptions, RenderConfig};
use crate::encode::filter_graph;
use crate::encode::transcoder::EncoderCatalog;
use crate::foundation::core::Canvas;
use crate::foundation::error::{AvError, AvResult};

/// Input duration cap added to every piped or primary input, in seconds.
const INPUT_TAIL_SECS: f64 = 0.1;
/// Auxiliary inputs are cut slightly short so the first mix input stays authoritative.
const AUXILIARY_TRIM_SECS: f64 = 0.05;

/// Concrete muxer and encoder identifiers for one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderChoice {
    /// Muxer passed to `-f`.
    pub container_format: String,
    /// Encoder passed to `-vcodec`.
    pub video_encoder: String,
    /// Encoder passed to `-acodec`.
    pub audio_encoder: String,
}

impl EncoderChoice {
    /// Resolve `cfg`'s container and logical codecs against `options` and the transcoder's
    /// encoder `catalog`.
    pub fn resolve(
        cfg: &RenderConfig,
        options: &EncoderOptions,
        catalog: &EncoderCatalog,
    ) -> AvResult<Self> {
        let container = options.container(&cfg.output_container)?;
        for (codec, allowed, kind) in [
            (&cfg.output_video_codec, &container.video_codecs, "video"),
            (&cfg.output_audio_codec, &container.audio_codecs, "audio"),
        ] {
            if !allowed.iter().any(|c| c.eq_ignore_ascii_case(codec)) {
                return Err(AvError::validation(format!(
                    "{} does not accept {kind} codec '{codec}'",
                    container.name
                )));
            }
        }

        let video = options.video_candidates(&cfg.output_video_codec)?;
        let audio = options.audio_candidates(&cfg.output_audio_codec)?;
        let video_encoder = catalog.pick(video).ok_or_else(|| {
            AvError::no_compatible_encoder(format!(
                "none of [{}] is available for video codec {}",
                video.join(", "),
                cfg.output_video_codec
            ))
        })?;
        let audio_encoder = catalog.pick(audio).ok_or_else(|| {
            AvError::no_compatible_encoder(format!(
                "none of [{}] is available for audio codec {}",
                audio.join(", "),
                cfg.output_audio_codec
            ))
        })?;

        tracing::debug!(
            container = %container.format,
            video = video_encoder,
            audio = audio_encoder,
            "selected encoders"
        );
        Ok(Self {
            container_format: container.format.clone(),
            video_encoder: video_encoder.to_owned(),
            audio_encoder: audio_encoder.to_owned(),
        })
    }
}

/// Immutable description of one transcoder run.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscoderInvocation {
    /// Raw frame dimensions on stdin.
    pub canvas: Canvas,
    /// Raw frame rate on stdin.
    pub frame_rate: u32,
    /// Primary audio duration in seconds.
    pub duration: f64,
    /// Primary audio input.
    pub primary_audio: PathBuf,
    /// Extra audio inputs, in the order they are passed to the transcoder.
    pub auxiliary: Vec<AudioContribution>,
    /// Selected encoders and muxer.
    pub encoders: EncoderChoice,
    /// Video bitrate in kbit/s.
    pub video_bitrate: u32,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: u32,
    /// Output pixel format.
    pub pixel_format: String,
    /// Encoder preset.
    pub preset: String,
    /// Output file.
    pub output: PathBuf,
}

impl TranscoderInvocation {
    /// Assemble an invocation from the render settings.
    pub fn new(
        cfg: &RenderConfig,
        encoders: EncoderChoice,
        duration: f64,
        primary_audio: &Path,
        auxiliary: Vec<AudioContribution>,
        output: &Path,
    ) -> Self {
        Self {
            canvas: cfg.canvas(),
            frame_rate: cfg.output_frame_rate,
            duration,
            primary_audio: primary_audio.to_path_buf(),
            auxiliary,
            encoders,
            video_bitrate: cfg.output_video_bitrate,
            audio_bitrate: cfg.output_audio_bitrate,
            pixel_format: cfg.output_video_format.clone(),
            preset: cfg.output_preset.clone(),
            output: output.to_path_buf(),
        }
    }

    /// The audio `-filter_complex` graph, if any auxiliary audio is mixed in.
    pub fn filter_graph(&self) -> Option<String> {
        filter_graph::compose(&self.auxiliary)
    }

    /// Bytes of one raw frame on stdin.
    pub fn frame_bytes(&self) -> usize {
        self.canvas.frame_bytes()
    }

    /// Full argument vector (without the binary itself).
    pub fn to_args(&self) -> Vec<OsString> {
        let input_cap = format!("{:.3}", self.duration + INPUT_TAIL_SECS);
        let aux_cap = format!("{:.3}", (self.duration - AUXILIARY_TRIM_SECS).max(0.0));
        let graph = self.filter_graph();

        let mut args: Vec<OsString> = Vec::new();
        let mut push = |parts: &[&str]| args.extend(parts.iter().map(OsString::from));
        push(&["-thread_queue_size", "512", "-y"]);
        push(&["-f", "rawvideo", "-vcodec", "rawvideo"]);
        push(&[
            "-s",
            format!("{}x{}", self.canvas.width, self.canvas.height).as_str(),
            "-pix_fmt",
            "rgba",
            "-r",
            self.frame_rate.to_string().as_str(),
        ]);
        push(&["-t", input_cap.as_str(), "-i", "-"]);
        push(&["-an", "-t", input_cap.as_str(), "-i"]);
        args.push(self.primary_audio.clone().into_os_string());
        for aux in &self.auxiliary {
            args.extend(["-t", aux_cap.as_str(), "-i"].map(OsString::from));
            args.push(aux.source.clone().into_os_string());
        }

        let mut push = |parts: &[&str]| args.extend(parts.iter().map(OsString::from));
        if let Some(graph) = &graph {
            push(&["-filter_complex", graph.as_str()]);
        }
        push(&[
            "-map",
            "0:v",
            "-map",
            filter_graph::audio_map(graph.is_some()).as_str(),
        ]);
        push(&[
            "-vcodec",
            self.encoders.video_encoder.as_str(),
            "-acodec",
            self.encoders.audio_encoder.as_str(),
        ]);
        push(&[
            "-b:v",
            format!("{}k", self.video_bitrate).as_str(),
            "-b:a",
            format!("{}k", self.audio_bitrate).as_str(),
        ]);
        push(&["-pix_fmt", self.pixel_format.as_str(), "-preset", self.preset.as_str()]);
        push(&["-f", self.encoders.container_format.as_str()]);
        if self.encoders.audio_encoder == "aac" {
            push(&["-strict", "-2"]);
        }
        args.push(self.output.clone().into_os_string());
        args
    }

    /// Argument vector rendered as one loggable line.
    pub fn display_args(&self) -> String {
        self.to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/command.rs"]
mod tests;
