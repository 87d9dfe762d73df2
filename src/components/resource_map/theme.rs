//! Visual theming for the resource map.
//!
//! Provides colors for the background, group boxes, resource cards, edges
//! and the status accents used to flag problems.

use super::graph::NodeStatus;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel
	pub r: u8,
	/// Green channel
	pub g: u8,
	/// Blue channel
	pub b: u8,
	/// Opacity, 0.0 to 1.0
	pub a: f64,
}

impl Color {
	/// Opaque color from its channels
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit opacity
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color at opacity `a`
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

	/// CSS color string, hex when opaque
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Accent colors keyed by resource kind.
///
/// Kinds map onto the palette by a stable hash of their name, so a kind keeps
/// its color across reloads and data refreshes.
#[derive(Clone, Debug)]
pub struct KindPalette {
	/// Colors kinds are hashed onto
	pub colors: Vec<Color>,
}

impl KindPalette {
	/// Muted slate blues and teals.
	pub fn slate() -> Self {
		Self {
			colors: vec![
				Color::rgb(94, 129, 172),  // Steel blue
				Color::rgb(129, 161, 193), // Light steel
				Color::rgb(100, 148, 160), // Teal gray
				Color::rgb(136, 160, 175), // Cadet blue
				Color::rgb(130, 120, 150), // Wisteria
				Color::rgb(119, 158, 165), // Desaturated cyan
				Color::rgb(160, 135, 100), // Ochre
				Color::rgb(122, 153, 168), // Dusty blue
			],
		}
	}

	/// Accent for `kind`, gray for an empty palette
	pub fn for_kind(&self, kind: &str) -> Color {
		if self.colors.is_empty() {
			return Color::rgb(128, 128, 128);
		}
		// FNV-1a
		let hash = kind.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
			(hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
		});
		self.colors[(hash % self.colors.len() as u64) as usize]
	}
}

/// Colors signalling resource health.
#[derive(Clone, Debug)]
pub struct StatusColors {
	/// Healthy resources
	pub ok: Color,
	/// Degraded resources
	pub warning: Color,
	/// Failing resources
	pub error: Color,
}

impl StatusColors {
	/// Color for `status`
	pub fn get(&self, status: NodeStatus) -> Color {
		match status {
			NodeStatus::Ok => self.ok,
			NodeStatus::Warning => self.warning,
			NodeStatus::Error => self.error,
		}
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Secondary color for the radial gradient
	pub color_secondary: Color,
	/// Paint the radial gradient instead of a flat fill
	pub use_gradient: bool,
}

/// Group box style.
#[derive(Clone, Debug)]
pub struct GroupStyle {
	/// Box interior
	pub fill: Color,
	/// Box outline
	pub border: Color,
	/// Group title text
	pub title: Color,
	/// Box corner radius
	pub corner_radius: f64,
	/// Dash pattern for collapsed groups.
	pub collapsed_dash: [f64; 2],
}

/// Resource card style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Card interior
	pub fill: Color,
	/// Card outline
	pub border: Color,
	/// Primary text (resource name)
	pub label: Color,
	/// Secondary text (kind, namespace)
	pub caption: Color,
	/// Card corner radius
	pub corner_radius: f64,
	/// Width of the status stripe along the left edge
	pub accent_width: f64,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Resting edge color
	pub color: Color,
	/// Color of emphasized edges
	pub highlight_color: Color,
	/// Line width at 100% zoom
	pub width: f64,
	/// Arrowhead length at 100% zoom
	pub arrow_size: f64,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Theme identifier
	pub name: &'static str,
	/// Canvas background
	pub background: BackgroundStyle,
	/// Group boxes
	pub group: GroupStyle,
	/// Resource cards
	pub node: NodeStyle,
	/// Relationship lines
	pub edge: EdgeStyle,
	/// Health accents
	pub status: StatusColors,
	/// Kind accents
	pub palette: KindPalette,
	/// Outline of the selected element
	pub selection: Color,
	/// Opacity of elements outside the highlight set at full emphasis
	pub dim_alpha: f64,
}

impl Theme {
	/// Clean dark theme (default)
	pub fn default_theme() -> Self {
		Self {
			name: "default",
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
			},
			group: GroupStyle {
				fill: Color::rgba(140, 160, 180, 0.06),
				border: Color::rgba(140, 160, 180, 0.35),
				title: Color::rgb(190, 200, 215),
				corner_radius: 8.0,
				collapsed_dash: [6.0, 4.0],
			},
			node: NodeStyle {
				fill: Color::rgb(36, 42, 52),
				border: Color::rgba(140, 160, 180, 0.4),
				label: Color::rgb(225, 230, 240),
				caption: Color::rgb(140, 150, 165),
				corner_radius: 6.0,
				accent_width: 4.0,
			},
			edge: EdgeStyle {
				color: Color::rgba(140, 160, 180, 0.5),
				highlight_color: Color::rgb(120, 180, 255),
				width: 1.25,
				arrow_size: 7.0,
			},
			status: StatusColors {
				ok: Color::rgb(96, 170, 120),
				warning: Color::rgb(220, 170, 60),
				error: Color::rgb(215, 80, 80),
			},
			palette: KindPalette::slate(),
			selection: Color::rgb(120, 180, 255),
			dim_alpha: 0.25,
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opaque_colors_format_as_hex() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css(), "rgba(1, 2, 3, 0.5)");
	}

	#[test]
	fn lerp_hits_both_ends() {
		let black = Color::rgb(0, 0, 0);
		let white = Color::rgb(255, 255, 255);
		assert_eq!(black.lerp(white, 0.0), black);
		assert_eq!(black.lerp(white, 1.0), white);
		assert_eq!(black.lighten(1.0), white);
	}

	#[test]
	fn kind_colors_are_stable() {
		let palette = KindPalette::slate();
		assert_eq!(palette.for_kind("Pod"), palette.for_kind("Pod"));
		assert!(palette.colors.contains(&palette.for_kind("Deployment")));
	}

	#[test]
	fn status_colors_distinguish_problems() {
		let status = Theme::default().status;
		assert_ne!(status.get(NodeStatus::Ok), status.get(NodeStatus::Error));
		assert_ne!(status.get(NodeStatus::Warning), status.get(NodeStatus::Error));
	}
}
