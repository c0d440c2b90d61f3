use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{EmployerId, NegotiationId, OrganizationId};

/// all events emitted by the negotiation workflow; the host application
/// drains these for logging and audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// no settings stored for the organization; defaults substituted
    SettingsDefaulted {
        organization_id: OrganizationId,
    },
    EligibleItemsFetched {
        employer_id: EmployerId,
        count: usize,
    },
    /// calculation frozen at the given date
    ItemsCalculated {
        employer_id: EmployerId,
        item_count: usize,
        total_negotiated: Money,
        as_of: NaiveDate,
    },
    /// a code allocation attempt hit an already-used code
    CodeCollision {
        attempt: u32,
    },
    NegotiationCommitted {
        negotiation_id: NegotiationId,
        code: String,
        employer_id: EmployerId,
        total_negotiated: Money,
        installment_count: u32,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_emit_and_take() {
        let mut store = EventStore::new();
        store.emit(Event::CodeCollision { attempt: 1 });
        store.emit(Event::SettingsDefaulted {
            organization_id: Uuid::new_v4(),
        });

        assert_eq!(store.events().len(), 2);

        let taken = store.take_events();
        assert_eq!(taken.len(), 2);
        assert!(store.events().is_empty());
    }
}
