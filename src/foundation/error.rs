use std::fmt;

/// Convenience result type used across avrender.
pub type AvResult<T> = Result<T, AvError>;

/// Pipeline phase in which a component call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentPhase {
    /// `properties()` query.
    Properties,
    /// `error()` query.
    Error,
    /// `pre_frame_render(ctx)`.
    PreFrameRender,
    /// `frame_render(idx)` or `composite_render(idx, below)`.
    FrameRender,
    /// `post_frame_render()`.
    PostFrameRender,
    /// `audio()` query.
    Audio,
}

impl ComponentPhase {
    /// Short human-readable label used in error summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Properties => "reading properties",
            Self::Error => "reading error message",
            Self::PreFrameRender => "preparing to render",
            Self::FrameRender => "rendering a frame",
            Self::PostFrameRender => "cleaning up after render",
            Self::Audio => "reading audio settings",
        }
    }
}

impl fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A component raised an error or panicked inside one of its hooks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentFailure {
    /// Display name of the component.
    pub name: String,
    /// Stack position (0 is the bottom layer).
    pub position: usize,
    /// Which hook failed.
    pub phase: ComponentPhase,
    /// Error chain or panic message plus backtrace.
    pub detail: String,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (layer {}) failed while {}",
            self.name, self.position, self.phase
        )
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum AvError {
    /// A component reported itself as misconfigured.
    #[error("configuration error: {summary}")]
    Configuration {
        /// One-line message.
        summary: String,
        /// Optional longer explanation.
        detail: Option<String>,
    },

    /// Invalid render configuration or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// No usable transcoder binary was found.
    #[error("transcoder unavailable: {0}")]
    TranscoderUnavailable(String),

    /// None of the configured encoder identifiers are supported by the transcoder.
    #[error("no compatible encoder: {0}")]
    NoCompatibleEncoder(String),

    /// The transcoder exited non-zero or its stdin broke unexpectedly.
    #[error("transcoder crashed: {message}")]
    TranscoderCrashed {
        /// What the pipeline was doing when the crash was observed.
        message: String,
        /// Captured transcoder stderr.
        stderr: String,
    },

    /// A component failed in one of its hooks.
    #[error("component failure: {0}")]
    Component(ComponentFailure),

    /// Audio duration could not be determined or decoding produced nothing.
    #[error("audio decode failure: {0}")]
    AudioDecode(String),

    /// The render was cancelled cooperatively.
    #[error("export cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AvError {
    /// Build an [`AvError::Configuration`] value.
    pub fn configuration(summary: impl Into<String>, detail: Option<String>) -> Self {
        Self::Configuration {
            summary: summary.into(),
            detail,
        }
    }

    /// Build an [`AvError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`AvError::TranscoderUnavailable`] value.
    pub fn transcoder_unavailable(msg: impl Into<String>) -> Self {
        Self::TranscoderUnavailable(msg.into())
    }

    /// Build an [`AvError::NoCompatibleEncoder`] value.
    pub fn no_compatible_encoder(msg: impl Into<String>) -> Self {
        Self::NoCompatibleEncoder(msg.into())
    }

    /// Build an [`AvError::TranscoderCrashed`] value.
    pub fn transcoder_crashed(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::TranscoderCrashed {
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    /// Build an [`AvError::AudioDecode`] value.
    pub fn audio_decode(msg: impl Into<String>) -> Self {
        Self::AudioDecode(msg.into())
    }

    /// `true` for cooperative cancellation, which is reported distinctly from failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Split the error into the `(summary, detail)` pair surfaced to callers.
    ///
    /// The summary is always a single line.
    pub fn report(&self) -> (String, String) {
        match self {
            Self::Configuration { summary, detail } => (
                first_line(summary),
                detail.clone().unwrap_or_else(|| summary.clone()),
            ),
            Self::TranscoderCrashed { message, stderr } => {
                (format!("Transcoder crashed: {}", first_line(message)), stderr.clone())
            }
            Self::Component(failure) => (failure.to_string(), failure.detail.clone()),
            Self::Other(err) => (first_line(&err.to_string()), format!("{err:?}")),
            other => (first_line(&other.to_string()), other.to_string()),
        }
    }
}

impl From<ComponentFailure> for AvError {
    fn from(value: ComponentFailure) -> Self {
        Self::Component(value)
    }
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or_default().trim().to_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
