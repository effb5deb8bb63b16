use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for an event, containing delivery metadata.
///
/// This is the unit published on the bus. The payload is the domain event;
/// the envelope adds what subscribers need to order and de-duplicate:
///
/// - `event_id` is unique per published event.
/// - `sequence` is monotonically increasing per publisher.
/// - `occurred_at` is stamped at publish time (wall clock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<E> {
    event_id: Uuid,
    sequence: u64,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> Envelope<E> {
    pub fn new(sequence: u64, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            sequence,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_preserves_sequence_and_payload() {
        let env = Envelope::new(7, "hello");
        assert_eq!(env.sequence(), 7);
        assert_eq!(*env.payload(), "hello");
        assert_eq!(env.into_payload(), "hello");
    }

    #[test]
    fn envelopes_get_distinct_event_ids() {
        let a = Envelope::new(1, ());
        let b = Envelope::new(2, ());
        assert_ne!(a.event_id(), b.event_id());
    }
}
