// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Timing: host-agnostic frame timing primitives.
//!
//! Cooperative UI runtimes do their work in slices driven by the host's
//! animation-frame callback. This crate holds the small pieces such a runtime
//! needs that have nothing to do with its scene model:
//!
//! - [`Clock`]: a monotonic time source, with [`ManualClock`] for
//!   deterministic tests and `StdClock` (feature `std`) for real hosts.
//! - [`StepBudget`] and [`Deadline`]: how long a slice of work may run before
//!   yielding, adapting between a tight and a relaxed value.
//! - [`FrameGate`] and [`FrameRequester`]: coalesce "please give me a frame"
//!   requests so the host is asked at most once per frame.
//! - [`TransitionSet`]: one scalar [`Transition`] per target, sampled once per
//!   frame. Easing is a plain function pointer hook.
//!
//! ## Features
//!
//! - `std` (default): enables `StdClock`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod budget;
mod clock;
mod frame;
pub mod transition;

pub use budget::{Deadline, StepBudget};
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::{Clock, ManualClock};
pub use frame::{CountingRequester, FrameGate, FrameRequester, NoopRequester};
pub use transition::{Easing, Sample, Transition, TransitionSet, linear};
