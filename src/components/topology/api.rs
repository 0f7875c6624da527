//! REST client for the topology and interface endpoints.

use log::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::error::TopologyError;
use super::types::{InterfaceRecord, InterfacesResponse, TopologyResponse};

#[derive(Clone, Debug)]
pub struct ApiClient {
	api_base: String,
	ws_base: String,
}

impl ApiClient {
	pub fn new(api_base: &str, ws_base: &str) -> Self {
		Self {
			api_base: api_base.trim_end_matches('/').to_string(),
			ws_base: ws_base.trim_end_matches('/').to_string(),
		}
	}

	pub fn topology_url(&self, view: &str, limit: usize) -> String {
		format!("{}/topology?view={}&limit={}", self.api_base, view, limit)
	}

	pub fn interfaces_url(&self, node_id: &str) -> String {
		format!("{}/devices/{}/interfaces", self.api_base, node_id)
	}

	/// Address of the live telemetry channel for `node_id`. Without a
	/// configured base the channel lives on the page's own host.
	pub fn channel_url(&self, node_id: &str) -> String {
		let base = if self.ws_base.is_empty() {
			same_origin_ws().unwrap_or_default()
		} else {
			self.ws_base.clone()
		};
		format!("{}/ws/devices/{}/interfaces", base, node_id)
	}

	async fn get_text(&self, url: &str) -> Result<String, TopologyError> {
		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);

		let request = Request::new_with_str_and_init(url, &opts)
			.map_err(|e| TopologyError::Request(format!("{e:?}")))?;
		let window = web_sys::window().ok_or_else(|| TopologyError::Request("no window".into()))?;
		let value = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| TopologyError::Request(format!("{e:?}")))?;
		let response: Response = value
			.dyn_into()
			.map_err(|_| TopologyError::Request("fetch did not return a Response".into()))?;
		if !response.ok() {
			return Err(TopologyError::Http(response.status()));
		}

		let text = JsFuture::from(
			response
				.text()
				.map_err(|e| TopologyError::Request(format!("{e:?}")))?,
		)
		.await
		.map_err(|e| TopologyError::Request(format!("{e:?}")))?;
		text.as_string()
			.ok_or_else(|| TopologyError::Request("response body is not text".into()))
	}

	pub async fn fetch_topology(
		&self,
		view: &str,
		limit: usize,
	) -> Result<TopologyResponse, TopologyError> {
		let url = self.topology_url(view, limit);
		debug!("GET {url}");
		TopologyResponse::parse(&self.get_text(&url).await?)
	}

	/// Poll the interface list of one node.
	pub async fn fetch_interfaces(
		&self,
		node_id: &str,
	) -> Result<Vec<InterfaceRecord>, TopologyError> {
		let url = self.interfaces_url(node_id);
		debug!("GET {url}");
		let body = self.get_text(&url).await?;
		let response: InterfacesResponse = serde_json::from_str(&body)?;
		Ok(response.into_records())
	}
}

fn same_origin_ws() -> Option<String> {
	let location = web_sys::window()?.location();
	let scheme = match location.protocol().ok()?.as_str() {
		"https:" => "wss:",
		_ => "ws:",
	};
	Some(format!("{}//{}", scheme, location.host().ok()?))
}
