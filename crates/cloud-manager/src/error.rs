use thiserror::Error;

use crate::plan::Action;
use crate::resource::ResourceKey;

#[derive(Debug, Error)]
pub enum CloudError {
    /// Malformed or incomplete local configuration. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// A "should never happen" invariant failed: truncated listing,
    /// double initialization, duplicate registry key.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("AWS error: {message}")]
    Aws {
        code: Option<String>,
        message: String,
    },

    #[error("task {action} failed for {resource}: {source}")]
    Task {
        action: Action,
        resource: ResourceKey,
        #[source]
        source: Box<CloudError>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub fn aws(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Aws {
            code: code.map(String::from),
            message: message.into(),
        }
    }

    /// The AWS error code (e.g. `DeleteConflict`), looking through task wrappers.
    pub fn aws_code(&self) -> Option<&str> {
        match self {
            Self::Aws { code, .. } => code.as_deref(),
            Self::Task { source, .. } => source.aws_code(),
            _ => None,
        }
    }

    /// Fatal errors signal a programming or configuration mistake rather
    /// than a platform condition.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Invariant(_) => true,
            Self::Task { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
