use chrono::Duration;
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::errors::{NegotiationError, Result, StoreError};
use crate::events::{Event, EventStore};
use crate::records::{Installment, Negotiation, NegotiationItem, NegotiationView};
use crate::retry::{retry, RetryError};
use crate::store::{CodeGenerator, NegotiationStore};
use crate::types::{NegotiationStatus, UserId};

use super::NegotiationPreview;

/// code allocation attempts before giving up
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// everything persisted by one successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub negotiation: Negotiation,
    pub items: Vec<NegotiationItem>,
    pub installments: Vec<Installment>,
}

impl CommitOutcome {
    pub fn into_view(self) -> NegotiationView {
        NegotiationView::new(self.negotiation, self.items, self.installments)
    }
}

impl NegotiationPreview {
    /// perform the durable write: allocate a unique code (bounded retry
    /// on collisions), insert the header, the line items, and the full
    /// installment schedule
    ///
    /// Any non-collision storage error aborts the attempt; the preview
    /// keeps its state so the user can retry. At most one attempt runs
    /// at a time and at most one ever succeeds.
    pub fn commit(
        &mut self,
        codes: &mut dyn CodeGenerator,
        store: &mut dyn NegotiationStore,
        time: &SafeTimeProvider,
        created_by: UserId,
        events: &mut EventStore,
    ) -> Result<CommitOutcome> {
        if self.in_flight {
            return Err(NegotiationError::CommitInFlight);
        }
        if let Some(id) = self.committed {
            return Err(NegotiationError::AlreadyCommitted { id });
        }

        self.in_flight = true;
        let outcome = self.run_commit(codes, store, time, created_by, events);
        self.in_flight = false;

        if let Ok(outcome) = &outcome {
            self.committed = Some(outcome.negotiation.id);
        }
        outcome
    }

    fn run_commit(
        &self,
        codes: &mut dyn CodeGenerator,
        store: &mut dyn NegotiationStore,
        time: &SafeTimeProvider,
        created_by: UserId,
        events: &mut EventStore,
    ) -> Result<CommitOutcome> {
        let now = time.now();
        let negotiation_id = Uuid::new_v4();

        let base = Negotiation {
            id: negotiation_id,
            organization_id: self.organization_id,
            employer_id: self.employer_id,
            code: String::new(),
            status: NegotiationStatus::Simulation,
            totals: self.totals,
            down_payment: self.plan.down_payment,
            installment_count: self.plan.installment_count,
            installment_value: self.terms.installment_value,
            first_due_date: self.plan.first_due_date,
            interest_rate_monthly: self.settings.interest_rate_monthly,
            correction_rate_monthly: self.settings.correction_rate_monthly,
            late_fee: self.settings.late_fee,
            legal_basis: self.settings.legal_basis.clone(),
            created_by,
            created_at: now,
            expires_at: now + Duration::days(self.plan.validity_days),
        };

        let negotiation = retry(MAX_CODE_ATTEMPTS, StoreError::is_retryable, |attempt| {
            if attempt > 1 {
                events.emit(Event::CodeCollision { attempt: attempt - 1 });
            }
            let code = codes.next_code(self.organization_id)?;
            let candidate = Negotiation {
                code,
                ..base.clone()
            };
            store.insert_negotiation(&candidate)?;
            Ok(candidate)
        })
        .map_err(|error| match error {
            RetryError::Exhausted { attempts, .. } => {
                NegotiationError::CodeAllocationExhausted { attempts }
            }
            RetryError::Fatal(e) => e.into(),
        })?;

        let items: Vec<NegotiationItem> = self
            .items
            .iter()
            .map(|calc| NegotiationItem::from_calculated(negotiation_id, calc))
            .collect();
        store.insert_items(&items)?;

        let installments: Vec<Installment> = self
            .schedule
            .iter()
            .map(|entry| Installment::from_scheduled(negotiation_id, entry))
            .collect();
        store.insert_installments(&installments)?;

        events.emit(Event::NegotiationCommitted {
            negotiation_id,
            code: negotiation.code.clone(),
            employer_id: self.employer_id,
            total_negotiated: self.totals.total_negotiated,
            installment_count: self.plan.installment_count,
            timestamp: now,
        });

        Ok(CommitOutcome {
            negotiation,
            items,
            installments,
        })
    }
}
