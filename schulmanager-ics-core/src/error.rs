use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Upstream call that failed while building a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Periods,
    Schedule,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periods => f.write_str("period table"),
            Self::Schedule => f.write_str("schedule"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid upstream data: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("No student is linked to this account")]
    MissingStudent,

    #[error("Failed to fetch {stage}: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("Lesson on {date} references unknown period {period_id}")]
    PeriodNotFound { period_id: i64, date: NaiveDate },

    #[error("Network timeout")]
    Timeout,
}

impl Error {
    /// Tags an upstream failure with the pipeline stage it happened in.
    pub fn at(self, stage: Stage) -> Self {
        Self::Upstream {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
