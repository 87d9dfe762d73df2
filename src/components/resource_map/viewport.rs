//! Camera state for the canvas: pan, zoom and the framing helpers.

use super::graph::Rect;

/// Smallest zoom reachable with the wheel.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom reachable with the wheel.
pub const MAX_ZOOM: f64 = 10.0;

/// Pointer travel (px) below which a press-release counts as a click.
const CLICK_TOLERANCE: f64 = 3.0;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in screen pixels.
	pub x: f64,
	/// Vertical offset in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to 0.1..10.0).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

/// Tracks an in-progress canvas pan operation.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	/// True while the pointer is held down.
	pub active: bool,
	/// Pointer position at press.
	pub start_x: f64,
	/// Pointer position at press.
	pub start_y: f64,
	/// Transform offset at press.
	pub transform_start_x: f64,
	/// Transform offset at press.
	pub transform_start_y: f64,
	/// Largest pointer distance from the start seen during this pan.
	pub travel: f64,
}

/// The canvas camera.
///
/// Remembers whether the user moved the camera since the last reset, so a
/// freshly applied layout only reframes the view when the user has not
/// panned or zoomed away.
#[derive(Clone, Debug)]
pub struct Viewport {
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Drag in progress, if any.
	pub pan: PanState,
	/// Canvas width in pixels.
	pub width: f64,
	/// Canvas height in pixels.
	pub height: f64,
	/// Screen margin kept around the graph when framing it.
	pub padding: f64,
	moved_by_user: bool,
}

impl Viewport {
	/// Camera at the origin and 100% zoom for a canvas of the given size.
	pub fn new(width: f64, height: f64, padding: f64) -> Self {
		Self {
			transform: ViewTransform::default(),
			pan: PanState::default(),
			width,
			height,
			padding,
			moved_by_user: false,
		}
	}

	/// Records a new canvas size without moving the camera.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Width over height, or 1.0 while the canvas has no size yet.
	pub fn aspect_ratio(&self) -> f64 {
		if self.width > 0.0 && self.height > 0.0 {
			self.width / self.height
		} else {
			1.0
		}
	}

	/// Converts canvas pixels to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// True if the user panned or zoomed since the last reset.
	pub fn moved_by_user(&self) -> bool {
		self.moved_by_user
	}

	/// Forgets earlier user movement; the next layout reframes the view.
	pub fn reset_moved(&mut self) {
		self.moved_by_user = false;
	}

	/// Starts a drag at the pointer position.
	pub fn begin_pan(&mut self, x: f64, y: f64) {
		self.pan = PanState {
			active: true,
			start_x: x,
			start_y: y,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
			travel: 0.0,
		};
	}

	/// Follows the pointer while a drag is active.
	pub fn pan_to(&mut self, x: f64, y: f64) {
		if !self.pan.active {
			return;
		}
		let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
		self.pan.travel = self.pan.travel.max((dx * dx + dy * dy).sqrt());
		if self.pan.travel > CLICK_TOLERANCE {
			self.moved_by_user = true;
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
		}
	}

	/// Ends the pan. Returns true if the gesture was a click rather than a drag.
	pub fn end_pan(&mut self) -> bool {
		let was_click = self.pan.active && self.pan.travel <= CLICK_TOLERANCE;
		self.pan.active = false;
		was_click
	}

	/// Zooms one wheel notch around the pointer.
	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
		self.moved_by_user = true;
	}

	/// Shows the graph at 100%.
	///
	/// On each axis the bounds are centred when they fit inside the padded
	/// viewport and aligned to the top/left padding otherwise.
	pub fn zoom_to_100(&mut self, bounds: &Rect) {
		let axis = |extent: f64, start: f64, size: f64| {
			if extent + 2.0 * self.padding <= size {
				(size - extent) / 2.0 - start
			} else {
				self.padding - start
			}
		};
		self.transform = ViewTransform {
			x: axis(bounds.width, bounds.x, self.width),
			y: axis(bounds.height, bounds.y, self.height),
			k: 1.0,
		};
	}

	/// Scales the graph to fit the padded viewport and centres it.
	pub fn zoom_to_fit(&mut self, bounds: &Rect) {
		if bounds.width <= 0.0 || bounds.height <= 0.0 {
			self.zoom_to_100(bounds);
			return;
		}
		let available_w = (self.width - 2.0 * self.padding).max(1.0);
		let available_h = (self.height - 2.0 * self.padding).max(1.0);
		let k = (available_w / bounds.width)
			.min(available_h / bounds.height)
			.clamp(MIN_ZOOM, MAX_ZOOM);
		let (cx, cy) = bounds.center();
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}

	/// Frames a freshly applied layout unless the user moved the camera.
	pub fn frame_layout(&mut self, bounds: &Rect) {
		if !self.moved_by_user {
			self.zoom_to_100(bounds);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zoom_to_100_centres_small_graphs() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		viewport.zoom_to_100(&Rect::new(0.0, 0.0, 400.0, 200.0));
		assert_eq!(viewport.transform, ViewTransform { x: 300.0, y: 300.0, k: 1.0 });
	}

	#[test]
	fn zoom_to_100_aligns_oversized_axes_to_padding() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		viewport.zoom_to_100(&Rect::new(10.0, 20.0, 2000.0, 200.0));
		assert_eq!(viewport.transform.x, 40.0);
		assert_eq!(viewport.transform.y, 280.0);
	}

	#[test]
	fn zoom_to_fit_shows_whole_graph() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		let bounds = Rect::new(0.0, 0.0, 1800.0, 700.0);
		viewport.zoom_to_fit(&bounds);
		assert_eq!(viewport.transform.k, 0.5);
		let (left, top) = viewport.screen_to_graph(0.0, 0.0);
		let (right, bottom) = viewport.screen_to_graph(1000.0, 800.0);
		assert!(left <= bounds.x && top <= bounds.y);
		assert!(right >= bounds.right() && bottom >= bounds.bottom());
	}

	#[test]
	fn wheel_zoom_is_clamped_and_anchored() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		let before = viewport.screen_to_graph(200.0, 100.0);
		viewport.zoom_at(200.0, 100.0, -1.0);
		let after = viewport.screen_to_graph(200.0, 100.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);

		for _ in 0..100 {
			viewport.zoom_at(0.0, 0.0, 1.0);
		}
		assert_eq!(viewport.transform.k, MIN_ZOOM);
	}

	#[test]
	fn layout_framing_respects_user_movement() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);

		viewport.begin_pan(10.0, 10.0);
		viewport.pan_to(110.0, 60.0);
		assert!(!viewport.end_pan());
		assert!(viewport.moved_by_user());
		let panned = viewport.transform;

		viewport.frame_layout(&bounds);
		assert_eq!(viewport.transform, panned);

		viewport.reset_moved();
		viewport.frame_layout(&bounds);
		assert_eq!(viewport.transform.k, 1.0);
		assert_eq!(viewport.transform.x, 300.0);
	}

	#[test]
	fn tiny_drags_count_as_clicks() {
		let mut viewport = Viewport::new(1000.0, 800.0, 50.0);
		viewport.begin_pan(10.0, 10.0);
		viewport.pan_to(11.0, 11.0);
		assert!(viewport.end_pan());
		assert!(!viewport.moved_by_user());
		assert_eq!(viewport.transform, ViewTransform::default());
	}
}
