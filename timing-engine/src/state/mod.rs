//! Session state store and the state records it owns
//!
//! The store keeps one immutable [`Snapshot`] of the tracked session behind
//! an `Arc`. Every update builds the next snapshot off to the side and swaps
//! it in whole, handing detectors the old/new pair as a [`Transition`].

pub mod driver;
pub mod session;
pub mod store;

// Re-export key types for convenience
pub use driver::{CompletedLap, DriverState};
pub use session::{RaceControlMessage, Session, SessionBest};
pub use store::{SessionStore, Snapshot, Transition};
