//! SDK-backed implementations of [`crate::api`].

pub mod elb;
pub mod iam;

pub use elb::AwsElb;
pub use iam::AwsIam;

use aws_sdk_iam::error::ProvideErrorMetadata;

use crate::error::{format_err_chain, CloudError};

/// Keep the service error code so callers can match on it (`NoSuchEntity`,
/// `DeleteConflict`, ...).
pub(crate) fn sdk_error<E>(call: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    CloudError::aws(
        err.code(),
        format!("{call} failed: {}", format_err_chain(&err)),
    )
}

pub(crate) fn build_error(what: &str, err: impl std::fmt::Display) -> CloudError {
    CloudError::Config(format!("invalid {what}: {err}"))
}
