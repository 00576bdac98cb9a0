use thiserror::Error;

/// Run-level errors. Individual probe failures are never surfaced here;
/// they are folded into the per-resolver aggregates instead.
#[derive(Debug, Error)]
pub enum RunError {
	/// Invalid configuration detected before dispatch (non-positive pool
	/// width or deadline, zero sample count).
	#[error("invalid configuration: {0}")]
	Config(String),

	/// No resolver candidates remained after filtering and dedup.
	#[error("no resolver candidates to test")]
	EmptyResolvers,

	/// No test domains were configured.
	#[error("no test domains configured")]
	EmptyDomains,

	/// The resolver list could not be fetched or parsed.
	#[error("resolver source failure: {0}")]
	Source(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, RunError>;
