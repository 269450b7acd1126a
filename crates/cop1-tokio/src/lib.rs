//! Tokio-based engine for the COP-1 Frame Operation Procedure
//!
//! This crate runs a [`cop1_core::Fop`] per virtual channel on the Tokio runtime. All protocol
//! state of one channel is owned by a single task that consumes a command queue; callers only
//! ever hold a cloneable [`FopEngine`] handle that enqueues work.
//!
//! # Features
//!
//! - One engine task per virtual channel, fed by an unbounded command queue
//! - Link-layer hand-off on the blocking pool, results fed back as lower-layer events
//! - Timer T1 with stale-expiry protection
//! - Observer fan-out of accept/reject/confirm notifications, alerts and status snapshots
//! - Blocking "transmit and wait" for simple callers
//! - [`Uplink`], a registry of engines that routes CLCWs to their virtual channel
//!
//! The `cop1-http` crate provides an operator console on top of this crate and is a further
//! example for its use.

mod engine;
mod link;
mod observer;
mod timer;
mod uplink;

pub use engine::FopEngine;
pub use link::LinkSink;
pub use observer::FopObserver;
pub use uplink::Uplink;
