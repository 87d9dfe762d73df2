//! Animated highlight intensities for the canvas.
//!
//! The selection decides *which* elements are emphasized; this module decides
//! *how strongly* at each frame. Every element carries its own intensity
//! (0.0 to 1.0) that eases towards 1.0 while it is in the target set and
//! decays back to 0.0 after leaving it.

use std::collections::{BTreeSet, HashMap, HashSet};

/// Minimum time (seconds) a highlight must be held before it can fade out.
/// Prevents flashing when the pointer briefly skirts an element.
const MIN_HOLD_TIME: f64 = 0.12;

/// Intensities below this are dropped.
const VISIBLE_EPSILON: f64 = 0.005;

/// Per-element highlight intensities with exponential smoothing.
///
/// Targets come from the selection's highlight set; the hovered element gets
/// an additional ring that follows the pointer with the same hold time.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered: Option<String>,
	target_set: HashSet<String>,
	intensity: HashMap<String, f64>,
	hover_ring: HashMap<String, f64>,
	hold_timer: HashMap<String, f64>,
	edge_targets: HashSet<String>,
	edge_intensity: HashMap<String, f64>,
	cached_max: f64,
}

impl HighlightState {
	/// Replaces the set of elements that should be emphasized.
	pub fn set_targets(&mut self, targets: &BTreeSet<String>) {
		if self.target_set.len() == targets.len() && targets.iter().all(|id| self.target_set.contains(id)) {
			return;
		}
		self.target_set = targets.iter().cloned().collect();
		for id in &self.target_set {
			self.hold_timer.insert(id.clone(), MIN_HOLD_TIME);
		}
	}

	/// Replaces the set of edge ids that should be emphasized.
	pub fn set_edge_targets(&mut self, targets: &BTreeSet<String>) {
		self.edge_targets = targets.iter().cloned().collect();
	}

	/// Moves the hover ring to `id`, or clears it.
	pub fn set_hover(&mut self, id: Option<&str>) {
		if self.hovered.as_deref() == id {
			return;
		}
		self.hovered = id.map(str::to_string);
		if let Some(id) = id {
			self.hold_timer.insert(id.to_string(), MIN_HOLD_TIME);
		}
	}

	/// Id under the pointer, if any.
	pub fn hovered(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	/// Animate all intensities towards their targets.
	///
	/// Exponential smoothing: value += (target - value) * (1 - e^(-speed * dt))
	pub fn tick(&mut self, dt: f64) {
		const FADE_IN_SPEED: f64 = 6.0; // ~150ms to 95%
		const FADE_OUT_SPEED: f64 = 4.0; // ~250ms to 95%

		let fade_in_factor = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out_decay = (-FADE_OUT_SPEED * dt).exp();

		for id in &self.target_set {
			let intensity = self.intensity.entry(id.clone()).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}
		if let Some(id) = &self.hovered {
			let intensity = self.hover_ring.entry(id.clone()).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}
		for id in &self.edge_targets {
			let intensity = self.edge_intensity.entry(id.clone()).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}
		let edge_targets = &self.edge_targets;
		self.edge_intensity.retain(|id, intensity| {
			if edge_targets.contains(id) {
				return true;
			}
			*intensity *= fade_out_decay;
			*intensity > VISIBLE_EPSILON
		});

		let target_set = &self.target_set;
		let hovered = self.hovered.as_deref();
		self.hold_timer.retain(|id, timer| {
			if target_set.contains(id) || hovered == Some(id.as_str()) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		let hold_timer = &self.hold_timer;
		let mut new_max: f64 = 0.0;
		self.intensity.retain(|id, intensity| {
			if !target_set.contains(id) && hold_timer.get(id).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			new_max = new_max.max(*intensity);
			target_set.contains(id) || *intensity > VISIBLE_EPSILON
		});
		self.hover_ring.retain(|id, intensity| {
			if hovered == Some(id.as_str()) {
				return true;
			}
			if hold_timer.get(id).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			*intensity > VISIBLE_EPSILON
		});

		self.cached_max = new_max;
	}

	/// Current emphasis of a node or group.
	pub fn intensity(&self, id: &str) -> f64 {
		self.intensity.get(id).copied().unwrap_or(0.0)
	}

	/// Current strength of the hover ring around `id`.
	pub fn hover_ring(&self, id: &str) -> f64 {
		self.hover_ring.get(id).copied().unwrap_or(0.0)
	}

	/// Current emphasis of the edge with id `edge_id`.
	pub fn edge_intensity(&self, edge_id: &str) -> f64 {
		self.edge_intensity.get(edge_id).copied().unwrap_or(0.0)
	}

	/// Strongest intensity of any element, used to dim everything else.
	pub fn max_intensity(&self) -> f64 {
		self.cached_max
	}

	/// True while any intensity is still changing.
	pub fn is_animating(&self) -> bool {
		self.intensity
			.iter()
			.any(|(id, v)| if self.target_set.contains(id) { *v < 0.995 } else { *v > VISIBLE_EPSILON })
			|| (self.hovered.is_none() && !self.hover_ring.is_empty())
			|| self
				.edge_intensity
				.iter()
				.any(|(id, v)| !self.edge_targets.contains(id) || *v < 0.995)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn targets(ids: &[&str]) -> BTreeSet<String> {
		ids.iter().map(|id| id.to_string()).collect()
	}

	#[test]
	fn targets_fade_in() {
		let mut state = HighlightState::default();
		state.set_targets(&targets(&["a", "b"]));
		for _ in 0..60 {
			state.tick(1.0 / 60.0);
		}
		assert!(state.intensity("a") > 0.95);
		assert!(state.max_intensity() > 0.95);
		assert_eq!(state.intensity("c"), 0.0);
	}

	#[test]
	fn removed_targets_hold_then_fade_out() {
		let mut state = HighlightState::default();
		state.set_targets(&targets(&["a"]));
		for _ in 0..60 {
			state.tick(1.0 / 60.0);
		}
		let lit = state.intensity("a");

		state.set_targets(&BTreeSet::new());
		state.tick(0.05);
		assert_eq!(state.intensity("a"), lit);

		for _ in 0..240 {
			state.tick(1.0 / 60.0);
		}
		assert_eq!(state.intensity("a"), 0.0);
		assert_eq!(state.max_intensity(), 0.0);
		assert!(!state.is_animating());
	}

	#[test]
	fn edges_follow_their_own_targets() {
		let mut state = HighlightState::default();
		state.set_targets(&targets(&["a", "b", "c"]));
		state.set_edge_targets(&targets(&["ab", "ac"]));
		for _ in 0..200 {
			state.tick(1.0 / 60.0);
		}
		assert!(state.edge_intensity("ab") > 0.95);
		assert_eq!(state.edge_intensity("bc"), 0.0);

		state.set_edge_targets(&BTreeSet::new());
		for _ in 0..240 {
			state.tick(1.0 / 60.0);
		}
		assert_eq!(state.edge_intensity("ab"), 0.0);
	}

	#[test]
	fn hover_ring_follows_pointer() {
		let mut state = HighlightState::default();
		state.set_hover(Some("a"));
		state.tick(0.1);
		assert!(state.hover_ring("a") > 0.0);
		assert_eq!(state.hovered(), Some("a"));

		state.set_hover(None);
		for _ in 0..240 {
			state.tick(1.0 / 60.0);
		}
		assert_eq!(state.hover_ring("a"), 0.0);
	}
}
