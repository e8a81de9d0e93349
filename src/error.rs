use std::fmt;

use thiserror::Error;

/// Pipeline stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    FrameMatrix,
    ExactSvd,
    RandomizedSvd,
    Background,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::FrameMatrix => "frame matrix",
            Stage::ExactSvd => "exact svd",
            Stage::RandomizedSvd => "randomized svd",
            Stage::Background => "background",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input ({stage}): {reason}")]
    InvalidInput { stage: Stage, reason: String },

    #[error("numeric degeneracy ({stage}): {reason}")]
    NumericDegeneracy { stage: Stage, reason: String },

    #[error("frame source failed at t={time:.3}s")]
    Source {
        time: f64,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(stage: Stage, reason: impl Into<String>) -> Self {
        Error::NumericDegeneracy {
            stage,
            reason: reason.into(),
        }
    }

    /// Stage the error originated from, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::InvalidInput { stage, .. } | Error::NumericDegeneracy { stage, .. } => {
                Some(*stage)
            }
            Error::Source { .. } => Some(Stage::FrameMatrix),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
