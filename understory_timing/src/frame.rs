// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalescing of animation-frame requests.

use alloc::rc::Rc;
use core::cell::Cell;

/// Host hook that asks the platform for one animation-frame callback.
///
/// Implementations typically wrap `requestAnimationFrame`, a winit redraw
/// request, or a test counter. The engine guarantees it calls this at most once
/// between two frames (see [`FrameGate`]).
pub trait FrameRequester {
    /// Requests that the host invoke the frame handler soon.
    fn request_frame(&self);
}

/// A requester that does nothing, for hosts that pump frames themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRequester;

impl FrameRequester for NoopRequester {
    fn request_frame(&self) {}
}

/// A requester that counts how many frames were requested.
///
/// Clones share the count.
///
/// ```
/// use understory_timing::{CountingRequester, FrameRequester};
///
/// let requester = CountingRequester::default();
/// requester.clone().request_frame();
/// assert_eq!(requester.count(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CountingRequester {
    count: Rc<Cell<u64>>,
}

impl CountingRequester {
    /// Returns the number of requests seen so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

impl FrameRequester for CountingRequester {
    fn request_frame(&self) {
        self.count.set(self.count.get() + 1);
    }
}

/// Coalesces frame requests: many requests before the next frame yield one
/// host callback.
///
/// ```
/// use understory_timing::FrameGate;
///
/// let mut gate = FrameGate::new();
/// assert!(gate.request());
/// assert!(!gate.request());
///
/// gate.begin_frame();
/// // Requesting from inside the frame handler schedules the next frame.
/// assert!(gate.request());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameGate {
    pending: bool,
    frames: u64,
}

impl FrameGate {
    /// Creates a gate with no pending request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: false,
            frames: 0,
        }
    }

    /// Records a request.
    ///
    /// Returns `true` if this is the first request since the last frame began,
    /// in which case the caller forwards it to the host.
    pub fn request(&mut self) -> bool {
        !core::mem::replace(&mut self.pending, true)
    }

    /// Marks the start of a frame, re-opening the gate.
    pub fn begin_frame(&mut self) {
        self.pending = false;
        self.frames = self.frames.wrapping_add(1);
    }

    /// Returns `true` if a frame has been requested and not yet started.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns the number of frames started through this gate.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}
