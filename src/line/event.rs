use std::time::Duration;

use super::Line;

int_enum! {
    pub enum EventType as "event type" {
        RisingEdge = 1,
        FallingEdge = 2,
    }
}

impl Default for EventType {
    fn default() -> Self {
        Self::RisingEdge
    }
}

/// An edge detected on a line requested for events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineEvent {
    /// Best estimate of when the edge occurred, as reported by the kernel
    pub timestamp: Duration,
    pub event_type: EventType,
    /// The line the event was read from
    pub source: Line,
}
