//! Output events feeding back through an updater and out to observers.

use dm_core::{Tolerances, nearly_equal};
use dm_env::{
    Channel, Environment, OutputEvent, RecordingSensor, SimpleEnvironment, UpdaterRegistry,
    UpdaterSpec,
};

fn relaxing(tau: f64) -> SimpleEnvironment {
    let mut spec = UpdaterSpec::new("relaxation");
    spec.tau = Some(tau);
    let updater = UpdaterRegistry::default().build(&spec).unwrap();
    SimpleEnvironment::with_updater(updater)
        .unwrap()
        .with_observable_size(2)
}

#[test]
fn output_decays_between_steps() {
    let mut env = relaxing(0.5);
    env.add_sensor(Box::new(RecordingSensor::on_channel("level", Channel::Observable)));
    env.handle_output_event(OutputEvent::new(0, 1.0)).unwrap();

    let dt = 0.1;
    for _ in 0..5 {
        env.time_elapsed(dt).unwrap();
    }

    let expected = (-5.0 * dt / 0.5_f64).exp();
    assert!(nearly_equal(env.observable_state()[0], expected, Tolerances::default()));
    assert_eq!(env.observable_state()[1], 0.0);

    let rec = env
        .sensor(0)
        .and_then(|s| s.downcast_ref::<RecordingSensor>())
        .unwrap();
    assert_eq!(rec.len(), 5);
    // samples are taken after the updater ran
    assert!(nearly_equal(rec.values()[0], (-dt / 0.5_f64).exp(), Tolerances::default()));
}

#[test]
fn mirrors_follow_the_state() {
    let mut env = relaxing(1.0);
    env.state_mut().set_observable_names(["left", "right"]);
    env.handle_output_event(OutputEvent::new(1, 2.0)).unwrap();
    env.time_elapsed(0.0).unwrap();

    let mirror = env.data_source(Channel::Observable).unwrap();
    assert_eq!(mirror.signal(), &[0.0, 2.0]);
    assert_eq!(mirror.channel_names(), vec!["left", "right"]);

    let deltas = env.state().deltas(&[1.0, 1.0]);
    assert_eq!(deltas, vec![-1.0, 1.0]);
    assert_eq!(env.state().squared_deltas(&[1.0, 1.0]), vec![1.0, 1.0]);
}

#[test]
fn out_of_range_output_is_an_error() {
    let mut env = relaxing(1.0);
    assert!(env.handle_output_event(OutputEvent::new(7, 1.0)).is_err());
}

#[test]
fn unknown_updater_kind() {
    let err = UpdaterRegistry::default()
        .build(&UpdaterSpec::new("spline"))
        .unwrap_err();
    assert!(err.to_string().contains("spline"));
}
