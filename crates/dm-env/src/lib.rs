//! Environment side of the dynamic-model engine.
//!
//! An environment holds two state vectors that couple a model to the outside
//! world:
//! - **input** values pushed in by sensors or external driving signals
//!   (one element per attached sensor)
//! - **observable** values produced by model output
//!
//! Every step the environment runs its pluggable [`Updater`], stimulates its
//! [`Sensor`]s and data sources with a snapshot, then advances its clock.

pub mod data_source;
pub mod environment;
pub mod error;
pub mod event;
pub mod registry;
pub mod sensor;
pub mod state;
pub mod updater;

pub use data_source::{DataEmission, DataSourceListener, EnvironmentDataSource};
pub use environment::{Environment, SimpleEnvironment};
pub use error::{EnvError, EnvResult};
pub use event::{Channel, EnvironmentEvent, OutputEvent};
pub use registry::{UpdaterRegistry, UpdaterSpec};
pub use sensor::{RecordingSensor, Sample, Sensor};
pub use state::EnvironmentState;
pub use updater::{LinearUpdater, NullUpdater, RelaxationUpdater, SimpleUpdater, Updater};
