//! Registries of cancellable handles (live channels, timers).
//!
//! Every long-lived resource the view opens is stored under a key so that
//! replacing, releasing and tearing down are explicit. Dropping a registry
//! without calling [`TaskRegistry::cancel_all`] leaks the resources it holds.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A resource that can be shut down.
pub trait Cancel {
	/// Stop the resource. Nothing it scheduled fires afterwards.
	fn cancel(self);
}

/// Handles keyed by `K`, at most one per key.
#[derive(Debug)]
pub struct TaskRegistry<K, H> {
	entries: HashMap<K, H>,
}

impl<K, H> Default for TaskRegistry<K, H> {
	fn default() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}
}

impl<K: Eq + Hash, H: Cancel> TaskRegistry<K, H> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store `handle`, cancelling whatever was held under `key` before.
	/// Returns whether a previous handle was replaced.
	pub fn insert(&mut self, key: K, handle: H) -> bool {
		match self.entries.insert(key, handle) {
			Some(previous) => {
				previous.cancel();
				true
			}
			None => false,
		}
	}

	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	/// Cancel and drop the handle under `key`.
	pub fn cancel(&mut self, key: &K) -> bool {
		match self.entries.remove(key) {
			Some(handle) => {
				handle.cancel();
				true
			}
			None => false,
		}
	}

	/// Drop the handle under `key` without cancelling it, for resources that
	/// already ended on their own.
	pub fn forget(&mut self, key: &K) -> Option<H> {
		self.entries.remove(key)
	}

	pub fn cancel_all(&mut self) -> usize {
		let count = self.entries.len();
		for (_, handle) in self.entries.drain() {
			handle.cancel();
		}
		count
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Periodic or deferred work scheduled by the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
	/// Re-fetch interfaces of every core node (polling overlay).
	TelemetryRefresh,
	/// Background mini-map redraw.
	MinimapSafety,
	/// Trailing mini-map redraw after a burst of view changes.
	MinimapDebounce,
	MetricsRecompute,
}

/// Who is keeping a live channel open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Holder {
	/// The edge telemetry overlay.
	Overlay,
	/// The detail panel of the selected node.
	Panel,
}

/// Live channels keyed by node id and shared between holders. A channel is
/// opened by its first holder and closed when its last holder releases it.
#[derive(Debug)]
pub struct ChannelRegistry<H> {
	channels: TaskRegistry<String, H>,
	holders: HashMap<String, HashSet<Holder>>,
}

impl<H> Default for ChannelRegistry<H> {
	fn default() -> Self {
		Self {
			channels: TaskRegistry::default(),
			holders: HashMap::new(),
		}
	}
}

impl<H: Cancel> ChannelRegistry<H> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `holder` for the channel of `node_id`, opening it with `open`
	/// when no channel exists yet. Returns whether a channel was opened.
	pub fn acquire<E>(
		&mut self,
		node_id: &str,
		holder: Holder,
		open: impl FnOnce(&str) -> Result<H, E>,
	) -> Result<bool, E> {
		let opened = if self.channels.contains(&node_id.to_string()) {
			false
		} else {
			let handle = open(node_id)?;
			self.channels.insert(node_id.to_string(), handle);
			true
		};
		self.holders
			.entry(node_id.to_string())
			.or_default()
			.insert(holder);
		Ok(opened)
	}

	/// Drop `holder`'s claim. Closes the channel when nobody else holds it and
	/// returns whether it was closed.
	pub fn release(&mut self, node_id: &str, holder: Holder) -> bool {
		let Entry::Occupied(mut entry) = self.holders.entry(node_id.to_string()) else {
			return false;
		};
		entry.get_mut().remove(&holder);
		if !entry.get().is_empty() {
			return false;
		}
		entry.remove();
		self.channels.cancel(&node_id.to_string())
	}

	/// Forget a channel that closed or failed by itself. Holders are dropped
	/// too so a later acquire opens a fresh channel.
	pub fn forget(&mut self, node_id: &str) -> Option<H> {
		self.holders.remove(node_id);
		self.channels.forget(&node_id.to_string())
	}

	pub fn is_open(&self, node_id: &str) -> bool {
		self.channels.contains(&node_id.to_string())
	}

	pub fn is_held_by(&self, node_id: &str, holder: Holder) -> bool {
		self.holders
			.get(node_id)
			.is_some_and(|set| set.contains(&holder))
	}

	pub fn len(&self) -> usize {
		self.channels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.channels.is_empty()
	}

	pub fn close_all(&mut self) -> usize {
		self.holders.clear();
		self.channels.cancel_all()
	}
}
