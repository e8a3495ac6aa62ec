use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use csim_core::{cast, CausalityViolation, Event, EventHandler, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Ping {
    tag: u32,
}

#[derive(Clone, Serialize)]
struct Noise {}

#[derive(Clone, Serialize)]
struct Echo {
    tag: u32,
    delay: f64,
}

struct Recorder {
    received: Vec<(f64, u32)>,
    ctx: SimulationContext,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Ping { tag } => {
                self.received.push((self.ctx.time(), tag));
            }
            Echo { tag, delay } => {
                self.received.push((self.ctx.time(), tag));
                self.ctx.emit_self(Ping { tag: tag + 100 }, delay);
            }
        })
    }
}

fn recorder(sim: &mut Simulation, name: &str) -> Rc<RefCell<Recorder>> {
    let recorder = Rc::new(RefCell::new(Recorder {
        received: Vec::new(),
        ctx: sim.create_context(name),
    }));
    sim.add_handler(name, recorder.clone());
    recorder
}

#[test]
fn events_are_processed_in_time_order() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Ping { tag: 3 }, rec_id, 3.0);
    client.emit(Ping { tag: 1 }, rec_id, 1.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.0);
    sim.step_until_no_events();

    assert_eq!(rec.borrow().received, vec![(1.0, 1), (2.0, 2), (3.0, 3)]);
    assert_eq!(sim.time(), 3.0);
}

#[test]
fn events_with_equal_time_keep_insertion_order() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    for tag in 0..10 {
        client.emit(Ping { tag }, rec_id, 5.0);
    }
    sim.step_until_no_events();

    let tags: Vec<u32> = rec.borrow().received.iter().map(|(_, tag)| *tag).collect();
    assert_eq!(tags, (0..10).collect::<Vec<_>>());
}

#[test]
fn derived_events_are_scheduled_relative_to_current_time() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Echo { tag: 1, delay: 0.5 }, rec_id, 2.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.25);
    sim.step_until_no_events();

    assert_eq!(rec.borrow().received, vec![(2.0, 1), (2.25, 2), (2.5, 101)]);
}

#[test]
fn cancelled_events_are_skipped() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    let first = client.emit(Ping { tag: 1 }, rec_id, 1.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.0);
    client.cancel_event(first);
    assert!(client.has_pending_events());
    assert_eq!(sim.pending_event_count(), 1);

    sim.step_until_no_events();
    assert_eq!(rec.borrow().received, vec![(2.0, 2)]);
    assert!(!client.has_pending_events());
}

#[test]
fn cancel_by_predicate_empties_the_queue() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Ping { tag: 1 }, rec_id, 1.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.0);
    client.cancel_events(|_| true);

    assert!(!sim.step());
    assert!(rec.borrow().received.is_empty());
    assert_eq!(sim.event_count(), 2);
}

#[test]
fn emit_at_rejects_past_times() {
    let mut sim = Simulation::new(123);
    let _rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Ping { tag: 1 }, rec_id, 4.0);
    sim.step();
    assert_eq!(sim.time(), 4.0);

    assert_eq!(
        client.emit_at(Ping { tag: 2 }, rec_id, 3.0),
        Err(CausalityViolation { time: 3.0, clock: 4.0 })
    );
    assert!(client.emit_at(Ping { tag: 3 }, rec_id, 4.0).is_ok());
    assert!(client.emit_at(Ping { tag: 4 }, rec_id, 7.5).is_ok());
    sim.step_until_no_events();
    assert_eq!(sim.time(), 7.5);
}

#[test]
#[should_panic(expected = "Event delay is negative")]
fn negative_delay_panics() {
    let mut sim = Simulation::new(123);
    let client = sim.create_context("client");
    client.emit_self(Ping { tag: 1 }, -1.0);
}

#[test]
fn step_for_duration_stops_before_later_events() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Ping { tag: 1 }, rec_id, 1.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.0);
    client.emit(Ping { tag: 3 }, rec_id, 3.5);

    assert!(sim.step_for_duration(1.5));
    assert_eq!(sim.time(), 1.0);
    assert!(!sim.step_for_duration(3.0));
    assert_eq!(rec.borrow().received.len(), 3);
}

#[test]
fn same_seed_gives_same_random_sequence() {
    let mut a = Simulation::new(42);
    let mut b = Simulation::new(42);
    let ctx_a = a.create_context("comp");
    let ctx_b = b.create_context("comp");
    for _ in 0..100 {
        assert_eq!(ctx_a.gen_range(0..1000u32), ctx_b.gen_range(0..1000u32));
        assert_eq!(ctx_a.rand(), ctx_b.rand());
    }
}

#[test]
fn events_to_unknown_components_are_dropped() {
    let mut sim = Simulation::new(123);
    let client = sim.create_context("client");
    let orphan = sim.create_context("orphan");
    client.emit(Ping { tag: 1 }, orphan.id(), 1.0);
    assert!(sim.step());
    assert!(!sim.step());
}

#[test]
fn cancelling_delivered_event_does_not_change_pending_count() {
    let mut sim = Simulation::new(123);
    let _rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    let first = client.emit(Ping { tag: 1 }, rec_id, 1.0);
    client.emit(Ping { tag: 2 }, rec_id, 2.0);
    assert!(sim.step());
    client.cancel_event(first);
    client.cancel_event(first);
    assert_eq!(sim.pending_event_count(), 1);
    assert!(sim.step());
    assert_eq!(sim.pending_event_count(), 0);
}

#[test]
fn unhandled_payload_is_dropped() {
    let mut sim = Simulation::new(123);
    let rec = recorder(&mut sim, "rec");
    let client = sim.create_context("client");
    let rec_id = sim.lookup_id("rec");

    client.emit(Noise {}, rec_id, 1.0);
    client.emit(Ping { tag: 7 }, rec_id, 2.0);
    sim.step_until_no_events();
    assert_eq!(rec.borrow().received, vec![(2.0, 7)]);
}
