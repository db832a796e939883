use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use serde::Serialize;
use sugars::{rc, refcell};

use cransim_core::{cast, Event, EventHandler, SchedulingError, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Tick {
    tag: u32,
}

#[derive(Clone, Serialize)]
struct Spawn {
    delay: f64,
    tag: u32,
}

struct Recorder {
    log: Rc<RefCell<Vec<(f64, u32)>>>,
    ctx: SimulationContext,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Tick { tag } => {
                self.log.borrow_mut().push((self.ctx.time(), tag));
            }
            Spawn { delay, tag } => {
                self.ctx.emit_self(Tick { tag }, delay);
            }
        })
    }
}

fn setup() -> (Simulation, SimulationContext, Rc<RefCell<Vec<(f64, u32)>>>) {
    let mut sim = Simulation::new();
    let log = rc!(refcell!(Vec::new()));
    let recorder = rc!(refcell!(Recorder {
        log: log.clone(),
        ctx: sim.create_context("recorder"),
    }));
    sim.add_handler("recorder", recorder);
    let client = sim.create_context("client");
    (sim, client, log)
}

#[test]
fn events_are_processed_in_time_order() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    for (tag, delay) in [5.0, 1.0, 3.0, 0.5, 4.0, 2.0].into_iter().enumerate() {
        client.emit(Tick { tag: tag as u32 }, recorder, delay);
    }
    sim.step_until_no_events();

    let times: Vec<f64> = log.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0.5, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[rstest]
#[case(2)]
#[case(10)]
#[case(100)]
fn equal_time_events_keep_scheduling_order(#[case] count: u32) {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    for tag in 0..count {
        client.emit(Tick { tag }, recorder, 1.0);
    }
    sim.step_until_no_events();

    let tags: Vec<u32> = log.borrow().iter().map(|(_, tag)| *tag).collect();
    assert_eq!(tags, (0..count).collect::<Vec<_>>());
}

#[test]
fn absolute_and_relative_events_interleave_fifo() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 1.0);
    client.emit_at(Tick { tag: 1 }, recorder, 1.0).unwrap();
    client.emit_at(Tick { tag: 2 }, recorder, 0.5).unwrap();
    client.emit(Tick { tag: 3 }, recorder, 1.0);
    sim.step_until_no_events();

    assert_eq!(*log.borrow(), vec![(0.5, 2), (1.0, 0), (1.0, 1), (1.0, 3)]);
}

#[test]
fn events_emitted_from_handlers_are_ordered() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Spawn { delay: 0.0, tag: 1 }, recorder, 1.0);
    client.emit(Tick { tag: 2 }, recorder, 1.0);
    client.emit(Spawn { delay: 0.5, tag: 3 }, recorder, 0.0);
    sim.step_until_no_events();

    // the zero-delay tick spawned at t=1 is created after tag 2 and runs after it
    assert_eq!(*log.borrow(), vec![(0.5, 3), (1.0, 2), (1.0, 1)]);
}

#[test]
fn steps_processes_at_most_given_number_of_events() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit_self_now(Tick { tag: 99 });
    for tag in 0..3 {
        client.emit(Tick { tag }, recorder, 1.0 + tag as f64);
    }
    // the first step delivers the client's own event to a component without a handler
    assert!(sim.steps(3));
    assert_eq!(log.borrow().len(), 2);
    assert!(!sim.steps(5));
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(sim.time(), 3.0);
}

#[test]
fn canceled_event_is_never_delivered() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 1.0);
    let canceled = client.emit(Tick { tag: 1 }, recorder, 2.0);
    client.emit(Tick { tag: 2 }, recorder, 3.0);
    client.cancel_event(canceled);
    assert_eq!(sim.pending_event_count(), 2);

    sim.step_until_no_events();
    assert_eq!(*log.borrow(), vec![(1.0, 0), (3.0, 2)]);
    assert_eq!(sim.event_count(), 3);
}

#[test]
fn canceling_processed_or_unknown_ids_has_no_effect() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    let processed = client.emit(Tick { tag: 0 }, recorder, 1.0);
    sim.step();
    client.cancel_event(processed);
    // id that will be assigned to the third event below
    client.cancel_event(processed + 3);
    for tag in 1..4 {
        client.emit(Tick { tag }, recorder, 1.0);
    }
    assert_eq!(sim.pending_event_count(), 3);

    sim.step_until_no_events();
    let tags: Vec<u32> = log.borrow().iter().map(|(_, tag)| *tag).collect();
    assert_eq!(tags, vec![0, 1, 2, 3]);
    assert_eq!(sim.pending_event_count(), 0);
}

#[test]
fn cancel_by_predicate() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    for tag in 0..4 {
        client.emit(Tick { tag }, recorder, tag as f64);
    }
    sim.cancel_events(|e| e.id % 2 == 1);
    sim.step_until_no_events();

    assert_eq!(*log.borrow(), vec![(0.0, 0), (2.0, 2)]);
}

#[test]
fn run_until_discards_events_past_stop_time() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 1.0);
    client.emit(Tick { tag: 1 }, recorder, 2.0);
    client.emit(Tick { tag: 2 }, recorder, 2.5);

    let processed = sim.run_until(2.0);
    assert_eq!(processed, 2);
    assert_eq!(sim.time(), 2.0);
    assert_eq!(sim.pending_event_count(), 0);
    assert!(!sim.step());
    assert_eq!(*log.borrow(), vec![(1.0, 0), (2.0, 1)]);
}

#[test]
fn run_until_advances_clock_when_queue_drains_early() {
    let (mut sim, client, _) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 1.0);

    assert_eq!(sim.run_until(10.0), 1);
    assert_eq!(sim.time(), 10.0);
}

#[test]
fn step_for_duration_keeps_remaining_events() {
    let (mut sim, client, _) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 1.0);
    client.emit(Tick { tag: 1 }, recorder, 3.5);

    assert!(sim.step_for_duration(1.5));
    assert_eq!(sim.time(), 1.0);
    assert_eq!(sim.pending_event_count(), 1);
    assert!(!sim.step_for_duration(3.0));
    assert_eq!(sim.time(), 3.5);
}

#[test]
fn scheduling_in_the_past_is_rejected() {
    let (mut sim, client, log) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, 5.0);
    sim.step();

    let err = client.emit_at(Tick { tag: 1 }, recorder, 4.0).unwrap_err();
    assert_eq!(err, SchedulingError { time: 4.0, now: 5.0 });
    assert_eq!(sim.pending_event_count(), 0);
    assert!(client.emit_at(Tick { tag: 2 }, recorder, 5.0).is_ok());
    sim.step_until_no_events();
    assert_eq!(*log.borrow(), vec![(5.0, 0), (5.0, 2)]);
}

#[test]
#[should_panic(expected = "Event delay is negative")]
fn negative_delay_panics() {
    let (sim, client, _) = setup();
    let recorder = sim.lookup_id("recorder");
    client.emit(Tick { tag: 0 }, recorder, -1.0);
}

#[test]
fn undelivered_events_are_dropped() {
    let (mut sim, client, log) = setup();
    let nobody = sim.create_context("nobody");
    client.emit(Tick { tag: 0 }, nobody.id(), 1.0);
    assert!(sim.step());
    assert!(log.borrow().is_empty());
}

#[test]
fn independent_simulations_do_not_interfere() {
    let (mut sim1, client1, log1) = setup();
    let (mut sim2, client2, log2) = setup();
    client1.emit(Tick { tag: 1 }, sim1.lookup_id("recorder"), 1.0);
    client2.emit(Tick { tag: 2 }, sim2.lookup_id("recorder"), 2.0);
    sim1.step_until_no_events();
    sim2.step_until_no_events();

    assert_eq!(*log1.borrow(), vec![(1.0, 1)]);
    assert_eq!(*log2.borrow(), vec![(2.0, 2)]);
    assert_eq!(sim1.time(), 1.0);
    assert_eq!(sim2.time(), 2.0);
}
