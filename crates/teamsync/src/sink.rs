//! Event sink: the narrow surface events are pushed through to the UI layer.

use std::sync::mpsc::Sender;

use crate::types::TeamEvent;

pub trait EventSink {
    fn emit(&mut self, event: TeamEvent);
}

/// Collects events in order. Handy for tests and one-shot scans.
impl EventSink for Vec<TeamEvent> {
    fn emit(&mut self, event: TeamEvent) {
        self.push(event);
    }
}

/// Forwards events to another thread. A dropped receiver is not an error.
impl EventSink for Sender<TeamEvent> {
    fn emit(&mut self, event: TeamEvent) {
        if let Err(e) = self.send(event) {
            tracing::debug!(
                event = "teams.sink.receiver_gone",
                team = e.0.team_name()
            );
        }
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F: FnMut(TeamEvent)> EventSink for FnSink<F> {
    fn emit(&mut self, event: TeamEvent) {
        (self.0)(event);
    }
}
