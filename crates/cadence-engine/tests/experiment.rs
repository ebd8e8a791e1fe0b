//! Experiments end to end: phases, stream policy, controls and stop
//! reasons.

use std::time::Duration;

use cadence_core::{KernelError, Phase, StreamId};
use cadence_engine::{
    ExperimentConfig, ExperimentState, RunError, Simulation, StopReason, TimeWeighted,
};
use cadence_model::{Context, ElementSpec, Model, ModelElement};
use cadence_stats::BatchingConfig;
use cadence_test_utils::fixtures::{Repeater, StopAt, Toggle};
use cadence_test_utils::NotificationLog;

fn config(replications: u32, length: f64) -> ExperimentConfig {
    ExperimentConfig {
        replications,
        replication_length: length,
        ..ExperimentConfig::default()
    }
}

#[test]
fn warm_up_resets_time_weighted_response_once() {
    let mut m = Model::new("plant");
    let root = m.root();
    let (_, level) = Toggle::build(&mut m, root, "toggle", 0.0, 2.0, 3.0).unwrap();
    let mut sim = Simulation::new(
        m,
        ExperimentConfig {
            warm_up_length: 20.0,
            ..config(1, 100.0)
        },
    )
    .unwrap();
    let log = sim
        .model_mut()
        .attach_listener(Some(level), NotificationLog::new());
    let batching = sim.attach_batching(level, BatchingConfig::default()).unwrap();

    let report = sim.run().unwrap();
    assert_eq!(report.replications[0].stop_reason, StopReason::EndEvent);
    assert_eq!(report.replications[0].end_time, 100.0);

    let model = sim.model();
    let log = model.listener::<NotificationLog>(log).unwrap();
    assert_eq!(log.entered(level, Phase::WarmUp), vec![20.0]);

    // (100 - 20) / 512 per tick, counted from the warm-up only.
    let collector = model
        .listener::<cadence_engine::BatchingCollector>(batching)
        .unwrap();
    assert_eq!(collector.batch_statistic().count(), 512);

    let tw = model.element::<TimeWeighted>(level).unwrap();
    assert_eq!(tw.across_replications().count(), 1);
}

#[test]
fn phases_run_in_order_every_replication() {
    let mut m = Model::new("m");
    let root = m.root();
    let rep = m
        .add_element(root, ElementSpec::new("rep"), Repeater::new(4.0))
        .unwrap();
    let mut sim = Simulation::new(m, config(2, 10.0)).unwrap();
    let log = sim.model_mut().attach_listener(Some(rep), NotificationLog::new());
    sim.run().unwrap();

    let phases: Vec<Phase> = sim
        .model()
        .listener::<NotificationLog>(log)
        .unwrap()
        .phases()
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    let replication = [
        Phase::BeforeReplication,
        Phase::Initialize,
        Phase::ConditionalActionRegistration,
        Phase::ReplicationEnded,
        Phase::AfterReplication,
    ];
    let mut expected = vec![Phase::BeforeExperiment];
    expected.extend(replication);
    expected.extend(replication);
    expected.push(Phase::AfterExperiment);
    assert_eq!(phases, expected);

    let repeater = sim.model().element::<Repeater>(rep).unwrap();
    assert_eq!(repeater.fired, vec![4.0, 8.0]);
}

struct FirstDraw {
    stream: StreamId,
    draws: Vec<f64>,
}

impl ModelElement for FirstDraw {
    fn initialize(&mut self, ctx: &mut Context<'_>) {
        if let Some(s) = ctx.stream(self.stream) {
            self.draws.push(s.uniform());
        }
    }
}

fn draws(antithetic: bool, replications: u32) -> Vec<f64> {
    let mut m = Model::with_seed("m", 11);
    let root = m.root();
    let stream = m.create_stream();
    let id = m
        .add_element(
            root,
            ElementSpec::new("draw"),
            FirstDraw {
                stream,
                draws: Vec::new(),
            },
        )
        .unwrap();
    let mut sim = Simulation::new(
        m,
        ExperimentConfig {
            antithetic,
            ..config(replications, 1.0)
        },
    )
    .unwrap();
    sim.run().unwrap();
    sim.model().element::<FirstDraw>(id).unwrap().draws.clone()
}

#[test]
fn antithetic_pairs_reflect_then_advance() {
    let d = draws(true, 4);
    assert_eq!(d[1], 1.0 - d[0]);
    assert_ne!(d[2], d[0]);
    assert_eq!(d[3], 1.0 - d[2]);
}

#[test]
fn replications_use_fresh_substreams_and_repeat_across_runs() {
    let d = draws(false, 3);
    assert_ne!(d[0], d[1]);
    assert_ne!(d[1], d[2]);
    assert_eq!(draws(false, 3), d);
}

#[test]
fn controls_apply_before_the_experiment() {
    let mut m = Model::new("m");
    let root = m.root();
    let rep = m
        .add_element(root, ElementSpec::new("rep"), Repeater::new(1.0))
        .unwrap();
    let mut cfg = config(1, 10.0);
    cfg.controls.insert("rep.interval".to_string(), 2.5);
    cfg.controls.insert("ghost.interval".to_string(), 1.0);
    cfg.controls.insert("rep.colour".to_string(), 1.0);
    let mut sim = Simulation::new(m, cfg).unwrap();
    sim.run().unwrap();
    let repeater = sim.model().element::<Repeater>(rep).unwrap();
    assert_eq!(repeater.fired, vec![2.5, 5.0, 7.5, 10.0]);
}

#[test]
#[should_panic(expected = "schedule")]
fn repeater_with_an_unschedulable_interval_fails_loudly() {
    let mut m = Model::new("m");
    let root = m.root();
    m.add_element(root, ElementSpec::new("rep"), Repeater::new(f64::NAN))
        .unwrap();
    let mut sim = Simulation::new(m, config(1, 10.0)).unwrap();
    let _ = sim.run();
}

#[test]
fn stop_reasons() {
    // Nothing scheduled on an open horizon.
    let mut sim = Simulation::new(Model::new("idle"), ExperimentConfig::default()).unwrap();
    assert_eq!(
        sim.run().unwrap().replications[0].stop_reason,
        StopReason::CalendarEmpty
    );

    // A component stops the run.
    let mut m = Model::new("m");
    let root = m.root();
    m.add_element(root, ElementSpec::new("stop"), StopAt { time: 7.0 })
        .unwrap();
    let mut sim = Simulation::new(m, config(2, 100.0)).unwrap();
    let report = sim.run().unwrap();
    for r in &report.replications {
        assert_eq!(r.stop_reason, StopReason::Requested);
        assert_eq!(r.end_time, 7.0);
    }

    // An endless run hits the wall-clock cap.
    let mut m = Model::new("m");
    let root = m.root();
    m.add_element(root, ElementSpec::new("rep"), Repeater::new(1.0))
        .unwrap();
    let mut sim = Simulation::new(
        m,
        ExperimentConfig {
            max_wall_time: Some(Duration::from_millis(20)),
            ..ExperimentConfig::default()
        },
    )
    .unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.replications[0].stop_reason, StopReason::TimeLimit);
    assert!(report.replications[0].events_executed > 0);
    assert!(report.hit_time_limit());
}

struct Cycle;

impl ModelElement for Cycle {
    fn register_conditional_actions(&mut self, ctx: &mut Context<'_>) {
        ctx.register_conditional(0, |_| true, |_| {});
    }
}

#[test]
fn conditional_cycle_is_a_kernel_error() {
    let mut m = Model::new("m");
    let root = m.root();
    m.add_element(root, ElementSpec::new("rep"), Repeater::new(1.0))
        .unwrap();
    m.add_element(root, ElementSpec::new("cycle"), Cycle).unwrap();
    let mut sim = Simulation::new(
        m,
        ExperimentConfig {
            conditional_max_passes: 5,
            ..config(1, 10.0)
        },
    )
    .unwrap();
    assert_eq!(
        sim.run().unwrap_err(),
        RunError::Kernel(KernelError::ConditionalActionCycle { max_passes: 5 })
    );
}

#[test]
fn operations_checked_against_experiment_state() {
    let mut sim = Simulation::new(Model::new("m"), config(1, 5.0)).unwrap();
    assert!(matches!(
        sim.run_next_replication(),
        Err(RunError::InvalidState {
            state: ExperimentState::Created,
            ..
        })
    ));
    assert!(sim.end_experiment().is_err());

    sim.initialize_experiment().unwrap();
    assert!(sim.initialize_experiment().is_err());
    assert!(sim.has_next_replication());
    let metrics = sim.run_next_replication().unwrap();
    assert_eq!(metrics.replication, 1);
    assert!(!sim.has_next_replication());
    sim.end_experiment().unwrap();
    sim.end_experiment().unwrap();
    assert_eq!(sim.state(), ExperimentState::Ended);
}

#[test]
fn invalid_configuration_rejected_up_front() {
    assert!(Simulation::new(Model::new("m"), config(0, 5.0)).is_err());
    assert!(Simulation::new(Model::new("m"), config(1, -1.0)).is_err());
}
