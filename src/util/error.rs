//! The workspace-wide error type.
//!
//! Every crate in ringstore returns `Result<_, Error>` at its public
//! boundary. The HTTP-facing crates (`ringstore_api`) map these variants to
//! status codes and response bodies; everything below that layer just
//! constructs and propagates them with `?`.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// The request body or query string was malformed or missing a
	/// required field.
	#[error(display = "{}", _0)]
	BadRequest(String),

	/// No queried replica returned a value for this key.
	#[error(display = "Key not found: {}", _0)]
	NotFound(String),

	/// A read at consistency `all` saw more than one distinct value
	/// across the replicas that answered.
	#[error(display = "Inconsistent data across replicas for key {}: {:?}", key, values)]
	Conflict {
		key: String,
		values: Vec<(String, String)>,
	},

	/// Fewer replicas succeeded than the consistency level requires.
	#[error(
		display = "Write failed: consistency '{}' requires all attempted replicas to succeed, got {}/{}",
		consistency,
		successful,
		attempted
	)]
	ConsistencyUnmet {
		consistency: String,
		successful: usize,
		attempted: usize,
		total_possible: usize,
		errors: Vec<String>,
	},

	/// Catch-all for errors that don't fit the categories above:
	/// unreachable peers, malformed peer responses, I/O failures.
	#[error(display = "{}", _0)]
	Message(String),

	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),

	#[error(display = "JSON error: {}", _0)]
	Json(#[error(source)] serde_json::Error),

	#[error(display = "HTTP error: {}", _0)]
	Hyper(#[error(source)] hyper::Error),

	#[error(display = "Invalid config: {}", _0)]
	TomlDe(#[error(source)] toml::de::Error),
}

impl From<&str> for Error {
	fn from(s: &str) -> Error {
		Error::Message(s.to_string())
	}
}

impl From<String> for Error {
	fn from(s: String) -> Error {
		Error::Message(s)
	}
}

/// Adds `.ok_or_message(...)` / `.err_context(...)` to any `Result`,
/// following the same ergonomics as the CLI's own error wrapping.
pub trait ErrorExt<T> {
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T, Error>;
	fn err_context<M: Into<String>>(self, msg: M) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> ErrorExt<T> for Result<T, E> {
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T, Error> {
		self.map_err(|_| Error::Message(msg.into()))
	}

	fn err_context<M: Into<String>>(self, msg: M) -> Result<T, Error> {
		self.map_err(|e| Error::Message(format!("{}: {}", msg.into(), e)))
	}
}
