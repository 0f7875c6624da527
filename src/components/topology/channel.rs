//! Live telemetry channel over a WebSocket.

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use super::error::TopologyError;
use super::tasks::Cancel;
use super::types::Frame;

/// What a channel reports to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
	Frame(Frame),
	/// The socket errored or closed on its own.
	Ended(String),
}

/// An open socket plus the callbacks keeping it wired. Handlers are detached
/// before the socket is closed on cancel, so a cancelled channel reports
/// nothing further.
pub struct LiveChannel {
	node_id: String,
	socket: WebSocket,
	_on_message: Closure<dyn FnMut(MessageEvent)>,
	_on_error: Closure<dyn FnMut(Event)>,
	_on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl LiveChannel {
	pub fn open(
		url: &str,
		node_id: &str,
		on_event: impl Fn(ChannelEvent) + Clone + 'static,
	) -> Result<Self, TopologyError> {
		let socket = WebSocket::new(url).map_err(|e| TopologyError::Channel {
			node: node_id.to_string(),
			message: format!("{e:?}"),
		})?;

		let (node_msg, emit) = (node_id.to_string(), on_event.clone());
		let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
			let Some(text) = ev.data().as_string() else {
				debug!("channel {node_msg}: ignoring binary frame");
				return;
			};
			match Frame::parse(&text) {
				Ok(frame) => emit(ChannelEvent::Frame(frame)),
				Err(e) => debug!("channel {node_msg}: unreadable frame: {e}"),
			}
		});

		let (node_err, emit) = (node_id.to_string(), on_event.clone());
		let on_error = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
			warn!("channel {node_err}: socket error");
			emit(ChannelEvent::Ended("connection failed".into()));
		});

		let emit = on_event;
		let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |ev: CloseEvent| {
			let reason = match ev.reason() {
				r if r.is_empty() => format!("connection closed ({})", ev.code()),
				r => r,
			};
			emit(ChannelEvent::Ended(reason));
		});

		socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
		socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
		socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

		Ok(Self {
			node_id: node_id.to_string(),
			socket,
			_on_message: on_message,
			_on_error: on_error,
			_on_close: on_close,
		})
	}
}

impl Cancel for LiveChannel {
	fn cancel(self) {
		self.socket.set_onmessage(None);
		self.socket.set_onerror(None);
		self.socket.set_onclose(None);
		if let Err(e) = self.socket.close() {
			debug!("channel {}: close failed: {e:?}", self.node_id);
		}
	}
}
