//! Ready-made components for building small spiking models.

pub mod integrator;
pub mod pulse;

pub use integrator::LeakyIntegrator;
pub use pulse::PulseGenerator;

/// Event code that raises an integrator's potential by its weight.
pub const EXCITE: i32 = 1;
/// Event code that lowers an integrator's potential by its weight.
pub const INHIBIT: i32 = 2;
