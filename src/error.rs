//! The crate error type.

/// Errors surfaced by strict helpers and constructors.
///
/// Adapters never return these during normal operation; they log and retry on
/// the next measurement instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A component was used before its element mounted.
	#[error("element reference is missing")]
	MissingElement,
	/// The element with this id left the document.
	#[error("element `{0}` is not attached to a document")]
	DetachedElement(String),
	/// The layout engine could not be started.
	#[error("layout engine unavailable: {0}")]
	EngineUnavailable(String),
	/// The layout engine shut down or its worker died.
	#[error("layout engine disconnected")]
	EngineDisconnected,
	/// A configuration document failed to parse.
	#[error("invalid configuration: {0}")]
	Config(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
