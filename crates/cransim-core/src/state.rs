use std::collections::{BinaryHeap, HashSet};

use crate::component::Id;
use crate::error::SchedulingError;
use crate::event::{Event, EventData, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

pub struct SimulationState {
    clock: f64,
    events: BinaryHeap<Event>,
    pending_events: HashSet<EventId>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
}

impl SimulationState {
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            events: BinaryHeap::new(),
            pending_events: HashSet::new(),
            canceled_events: HashSet::new(),
            event_count: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock = time;
    }

    fn push_event(&mut self, event: Event) -> EventId {
        let event_id = event.id;
        self.events.push(event);
        self.pending_events.insert(event_id);
        self.event_count += 1;
        event_id
    }

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        let event = Event {
            id: self.event_count,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data: Box::new(data),
        };
        if delay >= -EPSILON {
            self.push_event(event)
        } else {
            log_incorrect_event(event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
    }

    pub fn add_event_at<T>(&mut self, data: T, src: Id, dst: Id, time: f64) -> Result<EventId, SchedulingError>
    where
        T: EventData,
    {
        let event = Event {
            id: self.event_count,
            // max is used to absorb floating-point errors within EPSILON
            time: time.max(self.clock),
            src,
            dst,
            data: Box::new(data),
        };
        if time >= self.clock - EPSILON {
            Ok(self.push_event(event))
        } else {
            let err = SchedulingError { time, now: self.clock };
            log_incorrect_event(event, &err.to_string());
            Err(err)
        }
    }

    pub fn next_event(&mut self) -> Option<Event> {
        while let Some(event) = self.events.pop() {
            self.pending_events.remove(&event.id);
            if self.canceled_events.remove(&event.id) {
                continue;
            }
            self.clock = event.time;
            return Some(event);
        }
        None
    }

    pub fn peek_event(&mut self) -> Option<&Event> {
        loop {
            let event_id = self.events.peek()?.id;
            if self.canceled_events.remove(&event_id) {
                self.events.pop();
                self.pending_events.remove(&event_id);
            } else {
                return self.events.peek();
            }
        }
    }

    /// Marks a pending event as canceled. Ids of processed or not yet created events are ignored.
    pub fn cancel_event(&mut self, id: EventId) {
        if self.pending_events.contains(&id) {
            self.canceled_events.insert(id);
        }
    }

    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        for event in self.events.iter() {
            if pred(event) {
                self.canceled_events.insert(event.id);
            }
        }
    }

    /// Drops all pending events and returns the number of dropped non-canceled events.
    pub fn discard_events(&mut self) -> usize {
        let discarded = self.pending_event_count();
        self.events.clear();
        self.pending_events.clear();
        self.canceled_events.clear();
        discarded
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len() - self.canceled_events.len()
    }
}
