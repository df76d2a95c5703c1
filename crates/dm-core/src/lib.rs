//! dm-core: stable foundation for the dynamic-model engine.
//!
//! Contains:
//! - error (shared error types)
//! - ids (component identifiers and the per-engine id source)
//! - listeners (observer lists with removal handles)
//! - numeric (tolerances, due threshold, scalar guards)
//! - names (index -> label maps for state vectors)

pub mod error;
pub mod ids;
pub mod listeners;
pub mod names;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use listeners::{ListenerId, ListenerSet};
pub use names::NameMap;
pub use numeric::*;
