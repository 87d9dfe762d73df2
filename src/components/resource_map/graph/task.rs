//! Last-call-wins scheduling for asynchronous layout runs.
//!
//! Every submission bumps a shared generation counter. A [`LayoutTicket`]
//! remembers the generation it was issued for, so an in-flight run can check
//! whether a newer input has superseded it and stop without publishing.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Issues tickets; the most recently issued ticket is the only current one.
#[derive(Clone, Debug, Default)]
pub struct LayoutScheduler {
	generation: Rc<Cell<u64>>,
}

impl LayoutScheduler {
	/// Scheduler with no outstanding tickets.
	pub fn new() -> Self {
		Self::default()
	}

	/// Supersedes every outstanding ticket and returns a fresh one.
	pub fn submit(&self) -> LayoutTicket {
		let generation = self.generation.get() + 1;
		self.generation.set(generation);
		LayoutTicket {
			generation,
			current: Rc::clone(&self.generation),
		}
	}

	/// Invalidates every outstanding ticket without issuing a new one.
	pub fn cancel_all(&self) {
		self.generation.set(self.generation.get() + 1);
	}
}

/// Identity of one submitted layout input.
#[derive(Clone, Debug)]
pub struct LayoutTicket {
	generation: u64,
	current: Rc<Cell<u64>>,
}

impl LayoutTicket {
	/// Counter value this ticket was issued for.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// False once a newer ticket was issued or the scheduler cancelled.
	pub fn is_current(&self) -> bool {
		self.current.get() == self.generation
	}
}

/// Resolves on the poll after the first, giving the event loop a turn.
///
/// In the browser the waker is deferred through `setTimeout`, so pending
/// input events and paints run before the task resumes.
pub(crate) fn yield_now() -> YieldNow {
	YieldNow { yielded: false }
}

pub(crate) struct YieldNow {
	yielded: bool,
}

impl Future for YieldNow {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.yielded {
			return Poll::Ready(());
		}
		self.yielded = true;
		schedule_wake(cx);
		Poll::Pending
	}
}

#[cfg(target_arch = "wasm32")]
fn schedule_wake(cx: &mut Context<'_>) {
	use wasm_bindgen::JsCast;
	use wasm_bindgen::closure::Closure;

	let waker = cx.waker().clone();
	let Some(window) = web_sys::window() else {
		waker.wake();
		return;
	};
	let callback = Closure::once_into_js(move || waker.wake());
	if window
		.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
		.is_err()
	{
		cx.waker().wake_by_ref();
	}
}

#[cfg(not(target_arch = "wasm32"))]
fn schedule_wake(cx: &mut Context<'_>) {
	cx.waker().wake_by_ref();
}

/// Drives a future to completion on the current thread by polling it in a
/// loop. Only suitable for futures that wake themselves immediately.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
	let mut future = std::pin::pin!(future);
	let mut cx = Context::from_waker(std::task::Waker::noop());
	loop {
		if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
			return output;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn newest_ticket_wins() {
		let scheduler = LayoutScheduler::new();
		let first = scheduler.submit();
		assert!(first.is_current());

		let second = scheduler.submit();
		assert!(!first.is_current());
		assert!(second.is_current());
		assert!(second.generation() > first.generation());
	}

	#[test]
	fn cancel_all_invalidates_outstanding_tickets() {
		let scheduler = LayoutScheduler::new();
		let ticket = scheduler.submit();
		scheduler.cancel_all();
		assert!(!ticket.is_current());
	}

	#[test]
	fn yield_now_completes_on_second_poll() {
		let mut future = std::pin::pin!(yield_now());
		let mut cx = Context::from_waker(std::task::Waker::noop());
		assert!(future.as_mut().poll(&mut cx).is_pending());
		assert!(future.as_mut().poll(&mut cx).is_ready());
	}

	#[test]
	fn block_on_drives_yielding_futures() {
		let value = block_on(async {
			yield_now().await;
			yield_now().await;
			7
		});
		assert_eq!(value, 7);
	}
}
