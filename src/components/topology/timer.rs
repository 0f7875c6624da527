//! Browser timers as cancellable handles.

use wasm_bindgen::prelude::*;

use super::error::TopologyError;
use super::tasks::Cancel;

enum Schedule {
	Interval,
	Timeout,
}

/// A scheduled `setInterval` or `setTimeout`. The callback lives as long as
/// the handle; cancelling clears the browser timer first.
pub struct Timer {
	id: i32,
	schedule: Schedule,
	_callback: Closure<dyn FnMut()>,
}

impl Timer {
	pub fn interval(ms: u32, callback: impl FnMut() + 'static) -> Result<Self, TopologyError> {
		let callback = Closure::<dyn FnMut()>::new(callback);
		let id = window()?
			.set_interval_with_callback_and_timeout_and_arguments_0(
				callback.as_ref().unchecked_ref(),
				ms as i32,
			)
			.map_err(|e| TopologyError::Timer(format!("{e:?}")))?;
		Ok(Self {
			id,
			schedule: Schedule::Interval,
			_callback: callback,
		})
	}

	pub fn timeout(ms: u32, callback: impl FnMut() + 'static) -> Result<Self, TopologyError> {
		let callback = Closure::<dyn FnMut()>::new(callback);
		let id = window()?
			.set_timeout_with_callback_and_timeout_and_arguments_0(
				callback.as_ref().unchecked_ref(),
				ms as i32,
			)
			.map_err(|e| TopologyError::Timer(format!("{e:?}")))?;
		Ok(Self {
			id,
			schedule: Schedule::Timeout,
			_callback: callback,
		})
	}
}

fn window() -> Result<web_sys::Window, TopologyError> {
	web_sys::window().ok_or_else(|| TopologyError::Timer("no window".into()))
}

impl Cancel for Timer {
	fn cancel(self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		match self.schedule {
			Schedule::Interval => window.clear_interval_with_handle(self.id),
			Schedule::Timeout => window.clear_timeout_with_handle(self.id),
		}
	}
}
