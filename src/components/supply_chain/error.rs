use thiserror::Error;

use super::editing::FieldErrors;

/// Everything that can go wrong while loading, editing or saving a chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
	/// No response from the backend.
	#[error("network error: {0}")]
	Network(String),

	/// The session token was rejected.
	#[error("session expired, please log in again")]
	Unauthorized,

	/// Any other non-2xx response.
	#[error("server error {status}: {message}")]
	Server { status: u16, message: String },

	/// The response body did not have the expected shape.
	#[error("unexpected response: {0}")]
	Decode(String),

	#[error("{0}")]
	Validation(FieldErrors),

	#[error("every node needs at least one connection before saving ({} unconnected)", .0.len())]
	OrphanNodes(Vec<String>),

	#[error("finish editing node {0} first")]
	NodeMidEdit(String),

	#[error("invalid id: {0}")]
	InvalidId(String),

	/// The node is still waiting for the backend to assign its id.
	#[error("node {0} is still being created")]
	NodePending(String),

	#[error("a node cannot connect to itself")]
	SelfLoop,

	#[error("these nodes are already connected")]
	DuplicateEdge,

	#[error("switch to edit mode first")]
	EditModeRequired,
}

impl EditorError {
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, EditorError::Unauthorized)
	}
}
