//! Visual theming for the topology view.
//!
//! Colors are keyed by network semantics: node role, node and link status,
//! hover highlight. A theme switch only swaps the palette; layout and node
//! positions are untouched.

use super::types::{Role, Status};

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t) as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t) as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t) as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Which palette the surrounding page asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
	/// Light text on a dark background.
	#[default]
	Dark,
	/// Dark text on a light background.
	Light,
}

impl ThemeMode {
	/// The other mode.
	pub fn toggled(self) -> Self {
		match self {
			ThemeMode::Dark => ThemeMode::Light,
			ThemeMode::Light => ThemeMode::Dark,
		}
	}

	/// Lowercase name, used in CSS class names.
	pub fn as_str(self) -> &'static str {
		match self {
			ThemeMode::Dark => "dark",
			ThemeMode::Light => "light",
		}
	}
}

/// Fill colors per node role.
#[derive(Clone, Debug)]
pub struct RolePalette {
	pub core_router: Color,
	pub branch_switch: Color,
	pub end_device: Color,
}

impl RolePalette {
	pub fn get(&self, role: Role) -> Color {
		match role {
			Role::CoreRouter => self.core_router,
			Role::BranchSwitch => self.branch_switch,
			Role::EndDevice => self.end_device,
		}
	}
}

/// Colors keyed by up/down/unknown.
#[derive(Clone, Debug)]
pub struct StatusPalette {
	pub up: Color,
	pub down: Color,
	pub unknown: Color,
}

impl StatusPalette {
	pub fn get(&self, status: Status) -> Color {
		match status {
			Status::Up => self.up,
			Status::Down => self.down,
			Status::Unknown => self.unknown,
		}
	}
}

#[derive(Clone, Debug)]
pub struct LabelStyle {
	pub text: Color,
	/// Box drawn behind edge labels so they stay readable over links.
	pub background: Color,
}

#[derive(Clone, Debug)]
pub struct MinimapStyle {
	pub background: Color,
	pub border: Color,
	pub viewport_fill: Color,
	pub viewport_stroke: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub mode: ThemeMode,
	pub background: Color,
	pub roles: RolePalette,
	/// Node border and minimap dot color for a down device.
	pub node_down: Color,
	pub links: StatusPalette,
	pub edge_highlight: Color,
	pub labels: LabelStyle,
	pub minimap: MinimapStyle,
	/// Hover ring around the hovered node.
	pub ring: Color,
}

impl Theme {
	pub fn for_mode(mode: ThemeMode) -> Self {
		match mode {
			ThemeMode::Dark => Self::dark(),
			ThemeMode::Light => Self::light(),
		}
	}

	pub fn dark() -> Self {
		Self {
			mode: ThemeMode::Dark,
			background: Color::rgb(22, 27, 34),
			roles: RolePalette {
				core_router: Color::rgb(230, 126, 34),
				branch_switch: Color::rgb(94, 129, 172),
				end_device: Color::rgb(136, 160, 175),
			},
			node_down: Color::rgb(214, 69, 65),
			links: StatusPalette {
				up: Color::rgb(46, 204, 113),
				down: Color::rgb(231, 76, 60),
				unknown: Color::rgba(140, 160, 180, 0.6),
			},
			edge_highlight: Color::rgb(241, 196, 15),
			labels: LabelStyle {
				text: Color::rgb(220, 225, 232),
				background: Color::rgba(22, 27, 34, 0.8),
			},
			minimap: MinimapStyle {
				background: Color::rgba(13, 17, 23, 0.85),
				border: Color::rgba(140, 160, 180, 0.5),
				viewport_fill: Color::rgba(255, 255, 255, 0.08),
				viewport_stroke: Color::rgba(255, 255, 255, 0.7),
			},
			ring: Color::rgba(255, 255, 255, 0.8),
		}
	}

	pub fn light() -> Self {
		Self {
			mode: ThemeMode::Light,
			background: Color::rgb(248, 249, 251),
			roles: RolePalette {
				core_router: Color::rgb(211, 84, 0),
				branch_switch: Color::rgb(41, 98, 155),
				end_device: Color::rgb(108, 122, 137),
			},
			node_down: Color::rgb(192, 57, 43),
			links: StatusPalette {
				up: Color::rgb(39, 174, 96),
				down: Color::rgb(192, 57, 43),
				unknown: Color::rgba(90, 100, 115, 0.6),
			},
			edge_highlight: Color::rgb(243, 156, 18),
			labels: LabelStyle {
				text: Color::rgb(33, 37, 41),
				background: Color::rgba(255, 255, 255, 0.85),
			},
			minimap: MinimapStyle {
				background: Color::rgba(255, 255, 255, 0.9),
				border: Color::rgba(90, 100, 115, 0.5),
				viewport_fill: Color::rgba(0, 0, 0, 0.06),
				viewport_stroke: Color::rgba(0, 0, 0, 0.6),
			},
			ring: Color::rgba(0, 0, 0, 0.6),
		}
	}

	/// Fill for a node: role color, replaced by the down color when the
	/// device is down.
	pub fn node_fill(&self, role: Role, status: Status) -> Color {
		match status {
			Status::Down => self.node_down,
			_ => self.roles.get(role),
		}
	}

	/// Link color blended toward the highlight color by hover intensity.
	pub fn edge_color(&self, status: Status, highlight: f64) -> Color {
		self.links.get(status).lerp(self.edge_highlight, highlight)
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::dark()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(
			Color::rgba(1, 2, 3, 0.5).to_css(),
			"rgba(1, 2, 3, 0.5)"
		);
	}

	#[test]
	fn down_nodes_recolored() {
		let theme = Theme::dark();
		assert_eq!(theme.node_fill(Role::CoreRouter, Status::Up), theme.roles.core_router);
		assert_eq!(theme.node_fill(Role::CoreRouter, Status::Down), theme.node_down);
	}

	#[test]
	fn highlight_blends_link_color() {
		let theme = Theme::light();
		assert_eq!(theme.edge_color(Status::Up, 0.0), theme.links.up);
		assert_eq!(theme.edge_color(Status::Up, 1.0), theme.edge_highlight);
	}

	#[test]
	fn modes_toggle() {
		assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
		assert_eq!(Theme::for_mode(ThemeMode::Light).mode, ThemeMode::Light);
	}
}
