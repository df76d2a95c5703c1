//! Environment abstraction and the simple updater-driven implementation.

use core::fmt;

use tracing::{debug, warn};

use crate::data_source::EnvironmentDataSource;
use crate::error::{EnvError, EnvResult};
use crate::event::{Channel, EnvironmentEvent, OutputEvent};
use crate::sensor::Sensor;
use crate::state::EnvironmentState;
use crate::updater::{LinearUpdater, Updater};

/// Externally observable state coupled to a model.
///
/// Implementations constrain which updaters they accept; `set_updater`
/// rejects the rest with [`EnvError::IncompatibleUpdater`].
pub trait Environment: fmt::Debug {
    /// Short variant name, used in error messages.
    fn kind(&self) -> &'static str;

    fn state(&self) -> &EnvironmentState;

    fn state_mut(&mut self) -> &mut EnvironmentState;

    fn clock(&self) -> f64 {
        self.state().clock()
    }

    fn input_state(&self) -> &[f64] {
        self.state().input()
    }

    fn observable_state(&self) -> &[f64] {
        self.state().observable()
    }

    fn set_updater(&mut self, updater: Box<dyn Updater>) -> EnvResult<()>;

    fn updater(&self) -> Option<&dyn Updater>;

    /// Run the updater, stimulate sensors with a snapshot, then advance the clock.
    /// The clock stays put when any of those steps fails.
    fn time_elapsed(&mut self, dt: f64) -> EnvResult<()>;

    /// Apply component output: `observable[index] = value`.
    fn handle_output_event(&mut self, event: OutputEvent) -> EnvResult<()> {
        self.state_mut()
            .set_observable_value(event.index, event.value)
    }

    /// Attach a sensor; returns the index it was assigned (the previous count).
    fn add_sensor(&mut self, sensor: Box<dyn Sensor>) -> usize;

    /// Detach the sensor at `index`; later sensors move down one index.
    fn remove_sensor(&mut self, index: usize) -> Option<Box<dyn Sensor>>;

    fn sensor(&self, index: usize) -> Option<&dyn Sensor>;

    fn sensor_mut(&mut self, index: usize) -> Option<&mut dyn Sensor>;

    fn sensor_count(&self) -> usize;

    /// Built-in mirror of one vector, if this environment keeps one.
    fn data_source(&self, _channel: Channel) -> Option<&EnvironmentDataSource> {
        None
    }

    fn data_source_mut(&mut self, _channel: Channel) -> Option<&mut EnvironmentDataSource> {
        None
    }

    /// Zero both vectors and the clock; reset the updater, sensors and data sources.
    fn reset(&mut self);
}

/// Environment of named scalar inputs and observables driven by a
/// [`SimpleUpdater`](crate::SimpleUpdater).
#[derive(Debug)]
pub struct SimpleEnvironment {
    state: EnvironmentState,
    updater: Option<Box<dyn Updater>>,
    sensors: Vec<Box<dyn Sensor>>,
    observable_source: EnvironmentDataSource,
    input_source: EnvironmentDataSource,
}

impl Default for SimpleEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleEnvironment {
    const KIND: &'static str = "simple";

    /// Environment driven by an inert [`LinearUpdater`].
    pub fn new() -> Self {
        Self {
            state: EnvironmentState::new(),
            updater: Some(Box::new(LinearUpdater::default())),
            sensors: Vec::new(),
            observable_source: EnvironmentDataSource::new(Channel::Observable),
            input_source: EnvironmentDataSource::new(Channel::Input),
        }
    }

    pub fn with_updater(updater: Box<dyn Updater>) -> EnvResult<Self> {
        let mut env = Self::new();
        env.set_updater(updater)?;
        Ok(env)
    }

    /// Builder-style observable sizing.
    pub fn with_observable_size(mut self, size: usize) -> Self {
        self.state.set_observable_size(size);
        self
    }

    pub fn sensors(&self) -> impl Iterator<Item = &dyn Sensor> {
        self.sensors.iter().map(|s| s.as_ref() as &dyn Sensor)
    }
}

impl Environment for SimpleEnvironment {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn state(&self) -> &EnvironmentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EnvironmentState {
        &mut self.state
    }

    fn set_updater(&mut self, mut updater: Box<dyn Updater>) -> EnvResult<()> {
        if updater.as_simple().is_none() {
            return Err(EnvError::IncompatibleUpdater {
                updater: updater.name().to_string(),
                environment: Self::KIND,
            });
        }
        debug!(updater = updater.name(), "environment updater set");
        self.updater = Some(updater);
        Ok(())
    }

    fn updater(&self) -> Option<&dyn Updater> {
        self.updater.as_deref()
    }

    fn time_elapsed(&mut self, dt: f64) -> EnvResult<()> {
        if let Some(updater) = self.updater.as_mut() {
            let name = updater.name().to_string();
            let simple = updater.as_simple().ok_or(EnvError::IncompatibleUpdater {
                updater: name,
                environment: Self::KIND,
            })?;
            simple.update(&mut self.state, dt)?;
        }

        let event = EnvironmentEvent::new(&self.state);
        let mut failure = None;
        for sensor in &mut self.sensors {
            stimulate(sensor.as_mut(), &event, &mut failure);
        }
        stimulate(&mut self.observable_source, &event, &mut failure);
        stimulate(&mut self.input_source, &event, &mut failure);

        if let Some(err) = failure {
            return Err(err);
        }
        self.state.advance_clock(dt);
        Ok(())
    }

    fn add_sensor(&mut self, mut sensor: Box<dyn Sensor>) -> usize {
        let index = self.sensors.len();
        sensor.set_index(index);
        debug!(sensor = sensor.name(), index, "sensor attached");
        self.sensors.push(sensor);
        self.state.push_input();
        index
    }

    fn remove_sensor(&mut self, index: usize) -> Option<Box<dyn Sensor>> {
        if index >= self.sensors.len() {
            return None;
        }
        let removed = self.sensors.remove(index);
        for (i, sensor) in self.sensors.iter_mut().enumerate().skip(index) {
            sensor.set_index(i);
        }
        self.state.remove_input(index);
        debug!(sensor = removed.name(), index, "sensor detached");
        Some(removed)
    }

    fn sensor(&self, index: usize) -> Option<&dyn Sensor> {
        self.sensors.get(index).map(|s| s.as_ref() as &dyn Sensor)
    }

    fn sensor_mut(&mut self, index: usize) -> Option<&mut dyn Sensor> {
        let sensor: &mut dyn Sensor = self.sensors.get_mut(index)?.as_mut();
        Some(sensor)
    }

    fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    fn data_source(&self, channel: Channel) -> Option<&EnvironmentDataSource> {
        Some(match channel {
            Channel::Input => &self.input_source,
            Channel::Observable => &self.observable_source,
        })
    }

    fn data_source_mut(&mut self, channel: Channel) -> Option<&mut EnvironmentDataSource> {
        Some(match channel {
            Channel::Input => &mut self.input_source,
            Channel::Observable => &mut self.observable_source,
        })
    }

    fn reset(&mut self) {
        self.state.reset();
        if let Some(updater) = self.updater.as_mut() {
            updater.reset();
        }
        for sensor in &mut self.sensors {
            sensor.reset();
        }
        self.observable_source.reset();
        self.input_source.reset();
    }
}

/// Stimulate one sensor, logging a failure and keeping the first one.
fn stimulate(
    sensor: &mut dyn Sensor,
    event: &EnvironmentEvent<'_>,
    failure: &mut Option<EnvError>,
) {
    if let Err(err) = sensor.stimulate(event) {
        warn!(sensor = sensor.name(), error = %err, "sensor stimulation failed");
        failure.get_or_insert(EnvError::Sensor {
            name: sensor.name().to_string(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::sensor::RecordingSensor;
    use crate::updater::NullUpdater;

    #[derive(Debug)]
    struct ForeignUpdater;

    impl Updater for ForeignUpdater {
        fn name(&self) -> &str {
            "foreign"
        }
    }

    #[test]
    fn rejects_updater_without_simple_dynamics() {
        let mut env = SimpleEnvironment::new();
        let err = env.set_updater(Box::new(ForeignUpdater)).unwrap_err();
        assert_eq!(
            err,
            EnvError::IncompatibleUpdater {
                updater: "foreign".into(),
                environment: "simple",
            }
        );
        assert_eq!(env.updater().map(|u| u.name()), Some("linear"));
    }

    #[test]
    fn sensors_grow_and_shrink_inputs() {
        let mut env = SimpleEnvironment::new();
        assert_eq!(env.add_sensor(Box::new(RecordingSensor::new("a"))), 0);
        assert_eq!(env.add_sensor(Box::new(RecordingSensor::new("b"))), 1);
        assert_eq!(env.add_sensor(Box::new(RecordingSensor::new("c"))), 2);
        assert_eq!(env.input_state().len(), 3);

        let removed = env.remove_sensor(0).unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(env.input_state().len(), 2);
        assert_eq!(env.sensor(0).map(|s| (s.name(), s.index())), Some(("b", 0)));
        assert_eq!(env.sensor(1).map(|s| (s.name(), s.index())), Some(("c", 1)));
        assert!(env.remove_sensor(5).is_none());
    }

    #[test]
    fn sensors_see_pre_step_clock() {
        let mut env = SimpleEnvironment::with_updater(Box::new(NullUpdater)).unwrap();
        env.add_sensor(Box::new(RecordingSensor::new("a")));
        env.time_elapsed(0.5).unwrap();
        env.time_elapsed(0.5).unwrap();

        let sensor = env.sensor(0).and_then(|s| s.downcast_ref::<RecordingSensor>());
        let clocks: Vec<f64> = sensor.unwrap().samples().map(|s| s.clock).collect();
        assert_eq!(clocks, vec![0.0, 0.5]);
        assert_eq!(env.clock(), 1.0);
    }

    #[test]
    fn output_events_set_observables() {
        let mut env = SimpleEnvironment::new().with_observable_size(2);
        env.handle_output_event(OutputEvent::new(1, 0.75)).unwrap();
        assert_eq!(env.observable_state(), &[0.0, 0.75]);
        assert!(env.handle_output_event(OutputEvent::new(2, 1.0)).is_err());
    }

    #[test]
    fn sensor_failure_holds_clock() {
        let mut env = SimpleEnvironment::new().with_observable_size(1);
        env.add_sensor(Box::new(RecordingSensor::on_channel("obs", Channel::Observable)));
        env.add_sensor(Box::new(RecordingSensor::on_channel("obs2", Channel::Observable)));

        let err = env.time_elapsed(0.1).unwrap_err();
        assert!(matches!(err, EnvError::Sensor { ref name, .. } if name == "obs2"));
        assert_eq!(env.clock(), 0.0);
    }

    #[test]
    fn data_sources_follow_state() {
        let mut env = SimpleEnvironment::new().with_observable_size(2);
        env.handle_output_event(OutputEvent::new(0, 2.0)).unwrap();
        env.time_elapsed(0.1).unwrap();

        let source = env.data_source(Channel::Observable).unwrap();
        assert_eq!(source.signal(), &[2.0, 0.0]);
        assert_eq!(
            source.channel_names(),
            vec!["Observable[0]", "Observable[1]"]
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut env = SimpleEnvironment::with_updater(Box::new(LinearUpdater::new(
            vec![1.0],
            vec![],
        )))
        .unwrap()
        .with_observable_size(1);
        env.add_sensor(Box::new(RecordingSensor::new("a")));
        env.handle_output_event(OutputEvent::new(0, 1.0)).unwrap();
        env.time_elapsed(1.0).unwrap();
        assert_eq!(env.input_state(), &[1.0]);

        env.reset();
        assert_eq!(env.clock(), 0.0);
        assert_eq!(env.input_state(), &[0.0]);
        assert_eq!(env.observable_state(), &[0.0]);
        let sensor = env.sensor(0).and_then(|s| s.downcast_ref::<RecordingSensor>());
        assert!(sensor.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn sensor_indices_track_positions(ops in prop::collection::vec(any::<Option<usize>>(), 0..48)) {
            let mut env = SimpleEnvironment::new();
            let mut expected: Vec<String> = Vec::new();
            for (step, op) in ops.into_iter().enumerate() {
                match op {
                    None => {
                        let name = format!("s{step}");
                        let index = env.add_sensor(Box::new(RecordingSensor::new(name.clone())));
                        prop_assert_eq!(index, expected.len());
                        expected.push(name);
                    }
                    Some(pick) => {
                        // one slot past the end exercises the out-of-range path
                        let slot = pick % (expected.len() + 1);
                        let removed = env.remove_sensor(slot);
                        if slot < expected.len() {
                            let name = expected.remove(slot);
                            prop_assert_eq!(removed.map(|s| s.name().to_string()), Some(name));
                        } else {
                            prop_assert!(removed.is_none());
                        }
                    }
                }
                prop_assert_eq!(env.sensor_count(), expected.len());
                prop_assert_eq!(env.input_state().len(), expected.len());
                for (i, name) in expected.iter().enumerate() {
                    let sensor = env.sensor(i).unwrap();
                    prop_assert_eq!(sensor.index(), i);
                    prop_assert_eq!(sensor.name(), name.as_str());
                }
            }
        }
    }
}
