use thiserror::Error;

/// Invalid combination of signal length, frame length, hop size and frame count.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("frame length must be non-zero")]
    ZeroFrameLength,

    #[error("hop size must be non-zero")]
    ZeroHop,

    #[error("frame count must be non-zero")]
    ZeroFrames,

    #[error("frame length {frame_len} exceeds signal length {signal_len}")]
    FrameLongerThanSignal { frame_len: usize, signal_len: usize },

    #[error(
        "{requested} frames of {frame_len} samples at hop {hop} need {needed} samples, \
         but the signal has {signal_len} (at most {max} frames fit)"
    )]
    TooManyFrames {
        requested: usize,
        max: usize,
        frame_len: usize,
        hop: usize,
        needed: usize,
        signal_len: usize,
    },

    #[error("frame {index} spans samples {start}..{end}, but the signal has {len}")]
    FrameOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("{name} interval must be non-zero")]
    ZeroInterval { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("cannot transform an empty frame")]
    EmptyFrame,

    #[error("frame has {actual} samples, transform was planned for {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Failures talking to the plotting program.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to spawn `{program}`. Is gnuplot installed?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write plot commands")]
    Write(#[source] std::io::Error),

    /// The pipe failed partway through a script, so the program may be
    /// waiting inside an unterminated data block.
    #[error("plot stream broken mid-script")]
    Stream(#[source] std::io::Error),

    #[error("plotting program exited ({0})")]
    Exited(String),
}

impl RenderError {
    /// Whether the collaborator is gone for good, as opposed to a single
    /// failed cycle.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::Spawn { .. } | RenderError::Stream(_) | RenderError::Exited(_) => true,
            RenderError::Write(err) => matches!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::WriteZero
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
