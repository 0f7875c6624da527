//! Error type for the topology view.

use thiserror::Error;

/// Everything that can go wrong between the server and the canvas.
#[derive(Debug, Error)]
pub enum TopologyError {
	/// The request never produced a response (network, CORS, no window).
	#[error("request failed: {0}")]
	Request(String),

	/// The server answered with a non-success status.
	#[error("server answered HTTP {0}")]
	Http(u16),

	/// A body could not be decoded.
	#[error("malformed response: {0}")]
	Decode(#[from] serde_json::Error),

	/// A body decoded but breaks an invariant, such as a node without id.
	#[error("malformed topology: {0}")]
	Malformed(String),

	/// The drawing surface is missing or has no 2d context.
	#[error("drawing surface unavailable: {0}")]
	Surface(String),

	/// A live channel could not be opened or ended by itself.
	#[error("telemetry channel for {node} failed: {message}")]
	Channel {
		/// Node the channel belongs to.
		node: String,
		/// Reason reported by the socket.
		message: String,
	},

	/// The browser refused a timer.
	#[error("could not schedule timer: {0}")]
	Timer(String),

	/// A layout name matched no [`LayoutMode`](super::layout::LayoutMode).
	#[error("unknown layout mode `{0}`")]
	UnknownLayout(String),
}
