//! five-step negotiation wizard
//!
//! Each step is an immutable snapshot type; transitions validate their
//! preconditions and return the next step or a typed error. Navigating
//! back is just keeping the earlier step value around; re-running a
//! transition re-issues only idempotent reads.

pub mod commit;

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::aggregate::{FinancingTerms, Totals};
use crate::calculator::CalculatedItem;
use crate::decimal::Money;
use crate::errors::{Result, ValidationError};
use crate::events::{Event, EventStore};
use crate::schedule::{build_schedule, InstallmentPlan, ScheduledInstallment};
use crate::settings::{load_settings, NegotiationSettings};
use crate::store::{EligibleItemSource, SettingsSource};
use crate::types::{BillingItem, BillingItemId, EmployerId, NegotiationId, OrganizationId};

pub use commit::{CommitOutcome, MAX_CODE_ATTEMPTS};

/// step 1: no debtor chosen yet
#[derive(Debug, Clone)]
pub struct DebtorSelection {
    organization_id: OrganizationId,
}

impl DebtorSelection {
    pub fn new(organization_id: OrganizationId) -> Self {
        Self { organization_id }
    }

    /// choose the debtor: loads settings (defaults substituted) and the
    /// eligible items, ordered by due date; selection starts empty
    pub fn select(
        &self,
        employer_id: EmployerId,
        items: &dyn EligibleItemSource,
        settings: &dyn SettingsSource,
        events: &mut EventStore,
    ) -> Result<ItemSelection> {
        let settings = load_settings(settings, self.organization_id, events)?;
        let eligible = items.eligible_items(employer_id)?;

        events.emit(Event::EligibleItemsFetched {
            employer_id,
            count: eligible.len(),
        });

        Ok(ItemSelection {
            organization_id: self.organization_id,
            employer_id,
            settings,
            eligible,
            selected: BTreeSet::new(),
        })
    }
}

/// step 2: pick the billing items to negotiate
#[derive(Debug, Clone)]
pub struct ItemSelection {
    organization_id: OrganizationId,
    employer_id: EmployerId,
    settings: NegotiationSettings,
    eligible: Vec<BillingItem>,
    selected: BTreeSet<BillingItemId>,
}

impl ItemSelection {
    pub fn settings(&self) -> &NegotiationSettings {
        &self.settings
    }

    pub fn eligible(&self) -> &[BillingItem] {
        &self.eligible
    }

    pub fn selected(&self) -> impl Iterator<Item = BillingItemId> + '_ {
        self.selected.iter().copied()
    }

    /// toggle one eligible item; returns whether it is now selected.
    /// Ids outside the eligible set are ignored.
    pub fn toggle(&mut self, id: BillingItemId) -> bool {
        if !self.eligible.iter().any(|item| item.id == id) {
            return false;
        }
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.eligible.iter().map(|item| item.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// freeze the calculation at `as_of`: runs the overdue calculator
    /// over every selected item once; the instant is not re-evaluated
    /// later in the session
    pub fn calculate(&self, as_of: NaiveDate, events: &mut EventStore) -> Result<CalculationReview> {
        if self.selected.is_empty() {
            return Err(ValidationError::NoItemsSelected.into());
        }
        if !self.settings.allow_partial_selection && self.selected.len() != self.eligible.len() {
            return Err(ValidationError::PartialSelectionNotAllowed {
                eligible: self.eligible.len(),
                selected: self.selected.len(),
            }
            .into());
        }

        let items = self
            .eligible
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .map(|item| CalculatedItem::compute(item, &self.settings, as_of))
            .collect::<Result<Vec<_>>>()?;
        let totals = Totals::aggregate(&items);

        events.emit(Event::ItemsCalculated {
            employer_id: self.employer_id,
            item_count: items.len(),
            total_negotiated: totals.total_negotiated,
            as_of,
        });

        Ok(CalculationReview {
            organization_id: self.organization_id,
            employer_id: self.employer_id,
            settings: self.settings.clone(),
            as_of,
            items,
            totals,
        })
    }
}

/// step 3: frozen per-item breakdown and totals
#[derive(Debug, Clone)]
pub struct CalculationReview {
    organization_id: OrganizationId,
    employer_id: EmployerId,
    settings: NegotiationSettings,
    as_of: NaiveDate,
    items: Vec<CalculatedItem>,
    totals: Totals,
}

impl CalculationReview {
    pub fn items(&self) -> &[CalculatedItem] {
        &self.items
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// move on to installment planning; no extra precondition
    pub fn plan_installments(&self, first_due_date: NaiveDate) -> InstallmentPlanning {
        InstallmentPlanning {
            organization_id: self.organization_id,
            employer_id: self.employer_id,
            settings: self.settings.clone(),
            as_of: self.as_of,
            items: self.items.clone(),
            totals: self.totals,
            plan: InstallmentPlan::new(first_due_date),
        }
    }
}

/// step 4: shape the payment plan against the policy constraints
#[derive(Debug, Clone)]
pub struct InstallmentPlanning {
    organization_id: OrganizationId,
    employer_id: EmployerId,
    settings: NegotiationSettings,
    as_of: NaiveDate,
    items: Vec<CalculatedItem>,
    totals: Totals,
    plan: InstallmentPlan,
}

impl InstallmentPlanning {
    pub fn plan(&self) -> &InstallmentPlan {
        &self.plan
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn set_installment_count(&mut self, count: u32) {
        self.plan.installment_count = count;
    }

    pub fn set_down_payment(&mut self, down_payment: Money) {
        self.plan.down_payment = down_payment;
    }

    pub fn set_first_due_date(&mut self, first_due_date: NaiveDate) {
        self.plan.first_due_date = first_due_date;
    }

    pub fn set_validity_days(&mut self, validity_days: i64) {
        self.plan.validity_days = validity_days;
    }

    pub fn override_due_date(&mut self, number: u32, due_date: NaiveDate) {
        self.plan.due_date_overrides.insert(number, due_date);
    }

    pub fn clear_override(&mut self, number: u32) {
        self.plan.due_date_overrides.remove(&number);
    }

    /// financed amount and per-installment value for the current inputs
    pub fn financing(&self) -> FinancingTerms {
        self.totals
            .derive_financing(self.plan.down_payment, self.plan.installment_count)
    }

    /// the live schedule preview for the current inputs
    pub fn schedule_preview(&self) -> Vec<ScheduledInstallment> {
        build_schedule(&self.plan, self.financing().installment_value, self.as_of)
    }

    /// every rule the current inputs violate; empty means the plan may
    /// proceed to preview
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let settings = &self.settings;
        let plan = &self.plan;

        let count_valid =
            plan.installment_count >= 1 && plan.installment_count <= settings.max_installments;
        if !count_valid {
            errors.push(ValidationError::InvalidInstallmentCount {
                count: plan.installment_count,
                max: settings.max_installments,
            });
        }

        if plan.down_payment.is_negative() {
            errors.push(ValidationError::InsufficientDownPayment {
                required: Money::ZERO,
                provided: plan.down_payment,
            });
        } else if plan.down_payment > self.totals.total_negotiated {
            errors.push(ValidationError::DownPaymentExceedsTotal {
                down_payment: plan.down_payment,
                total: self.totals.total_negotiated,
            });
        }

        if count_valid {
            let value = self.financing().installment_value;
            if value < settings.min_installment_value {
                errors.push(ValidationError::InstallmentBelowMinimum {
                    minimum: settings.min_installment_value,
                    value,
                });
            }
        }

        if settings.require_down_payment {
            let required = self
                .totals
                .total_negotiated
                .percentage(settings.min_down_payment_percentage);
            if plan.down_payment < required {
                errors.push(ValidationError::InsufficientDownPayment {
                    required,
                    provided: plan.down_payment,
                });
            }
        }

        errors
    }

    /// lock the plan and produce the commit preview; blocked while any
    /// validation rule is violated
    pub fn preview(&self) -> Result<NegotiationPreview> {
        if let Some(error) = self.validation_errors().into_iter().next() {
            return Err(error.into());
        }

        let terms = self.financing();
        let schedule = build_schedule(&self.plan, terms.installment_value, self.as_of);

        Ok(NegotiationPreview {
            organization_id: self.organization_id,
            employer_id: self.employer_id,
            settings: self.settings.clone(),
            as_of: self.as_of,
            items: self.items.clone(),
            totals: self.totals,
            plan: self.plan.clone(),
            terms,
            schedule,
            in_flight: false,
            committed: None,
        })
    }
}

/// step 5: everything frozen, awaiting the durable write
///
/// Deliberately not `Clone`: the commit guard state must not be forked.
#[derive(Debug)]
pub struct NegotiationPreview {
    organization_id: OrganizationId,
    employer_id: EmployerId,
    settings: NegotiationSettings,
    as_of: NaiveDate,
    items: Vec<CalculatedItem>,
    totals: Totals,
    plan: InstallmentPlan,
    terms: FinancingTerms,
    schedule: Vec<ScheduledInstallment>,
    in_flight: bool,
    committed: Option<NegotiationId>,
}

impl NegotiationPreview {
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn terms(&self) -> &FinancingTerms {
        &self.terms
    }

    pub fn schedule(&self) -> &[ScheduledInstallment] {
        &self.schedule
    }

    pub fn plan(&self) -> &InstallmentPlan {
        &self.plan
    }

    /// id of the committed negotiation, once the durable write succeeded
    pub fn committed(&self) -> Option<NegotiationId> {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{BillingStatus, Competence};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn overdue_item(employer_id: EmployerId, value_cents: i64, due: NaiveDate) -> BillingItem {
        BillingItem {
            id: Uuid::new_v4(),
            employer_id,
            category_id: Uuid::new_v4(),
            category_name: "monthly dues".to_string(),
            competence: Competence::new(1, 2025),
            value: crate::decimal::Money::from_cents(value_cents),
            due_date: due,
            status: BillingStatus::Overdue,
            negotiation_id: None,
        }
    }

    /// store with two 10,000-cent items 60 days overdue
    fn seeded_store(employer_id: EmployerId, as_of: NaiveDate) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_billing_item(overdue_item(employer_id, 10_000, as_of - Duration::days(60)));
        store.add_billing_item(overdue_item(employer_id, 10_000, as_of - Duration::days(60)));
        store
    }

    fn selection_with_all(
        store: &MemoryStore,
        organization_id: OrganizationId,
        employer_id: EmployerId,
        events: &mut EventStore,
    ) -> ItemSelection {
        let mut selection = DebtorSelection::new(organization_id)
            .select(employer_id, store, store, events)
            .unwrap();
        selection.select_all();
        selection
    }

    #[test]
    fn test_select_fetches_eligible_and_resets_selection() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let selection = DebtorSelection::new(Uuid::new_v4())
            .select(employer_id, &store, &store, &mut events)
            .unwrap();

        assert_eq!(selection.eligible().len(), 2);
        assert_eq!(selection.selected().count(), 0);
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::EligibleItemsFetched { count: 2, .. })));
    }

    #[test]
    fn test_calculate_requires_selection() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let selection = DebtorSelection::new(Uuid::new_v4())
            .select(employer_id, &store, &store, &mut events)
            .unwrap();

        let err = selection.calculate(as_of, &mut events).unwrap_err();
        assert_eq!(
            err,
            crate::errors::NegotiationError::Validation(ValidationError::NoItemsSelected)
        );
    }

    #[test]
    fn test_partial_selection_blocked_by_policy() {
        let as_of = date(2025, 3, 2);
        let organization_id = Uuid::new_v4();
        let employer_id = Uuid::new_v4();
        let mut store = seeded_store(employer_id, as_of);

        let mut settings = NegotiationSettings::default();
        settings.allow_partial_selection = false;
        store.put_settings(organization_id, settings);

        let mut events = EventStore::new();
        let mut selection = DebtorSelection::new(organization_id)
            .select(employer_id, &store, &store, &mut events)
            .unwrap();

        let first = selection.eligible()[0].id;
        selection.toggle(first);

        let err = selection.calculate(as_of, &mut events).unwrap_err();
        assert_eq!(
            err,
            crate::errors::NegotiationError::Validation(
                ValidationError::PartialSelectionNotAllowed {
                    eligible: 2,
                    selected: 1,
                }
            )
        );

        // the full selection passes
        selection.select_all();
        assert!(selection.calculate(as_of, &mut events).is_ok());
    }

    #[test]
    fn test_toggle_ignores_unknown_ids() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let mut selection = DebtorSelection::new(Uuid::new_v4())
            .select(employer_id, &store, &store, &mut events)
            .unwrap();

        assert!(!selection.toggle(Uuid::new_v4()));
        assert_eq!(selection.selected().count(), 0);

        let id = selection.eligible()[0].id;
        assert!(selection.toggle(id));
        assert!(!selection.toggle(id));
    }

    #[test]
    fn test_calculation_freezes_totals() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let selection = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events);
        let review = selection.calculate(as_of, &mut events).unwrap();

        assert_eq!(review.items().len(), 2);
        assert_eq!(
            review.totals().total_negotiated,
            crate::decimal::Money::from_cents(21_000)
        );
        assert_eq!(review.as_of(), as_of);
    }

    #[test]
    fn test_plan_validation_blocks_bad_count() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));

        planning.set_installment_count(0);
        assert!(matches!(
            planning.validation_errors()[0],
            ValidationError::InvalidInstallmentCount { count: 0, max: 12 }
        ));

        planning.set_installment_count(13);
        assert!(matches!(
            planning.validation_errors()[0],
            ValidationError::InvalidInstallmentCount { count: 13, max: 12 }
        ));
        assert!(planning.preview().is_err());

        planning.set_installment_count(3);
        assert!(planning.validation_errors().is_empty());
        assert!(planning.preview().is_ok());
    }

    #[test]
    fn test_plan_validation_minimum_installment() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));

        // 21,000 cents over 5 installments is 42.00, below the 50.00 floor
        planning.set_installment_count(5);
        assert!(matches!(
            planning.validation_errors()[0],
            ValidationError::InstallmentBelowMinimum { .. }
        ));

        planning.set_installment_count(4);
        assert!(planning.validation_errors().is_empty());
    }

    #[test]
    fn test_mandatory_down_payment_blocks_preview() {
        // 10% of 21,000 is 2,100; 1,000 is not enough
        let as_of = date(2025, 3, 2);
        let organization_id = Uuid::new_v4();
        let employer_id = Uuid::new_v4();
        let mut store = seeded_store(employer_id, as_of);

        let mut settings = NegotiationSettings::default();
        settings.require_down_payment = true;
        settings.min_down_payment_percentage = crate::decimal::Rate::from_percentage(dec!(10.0));
        store.put_settings(organization_id, settings);

        let mut events = EventStore::new();
        let review = selection_with_all(&store, organization_id, employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));
        planning.set_installment_count(3);
        planning.set_down_payment(crate::decimal::Money::from_cents(1_000));

        let errors = planning.validation_errors();
        assert_eq!(
            errors,
            vec![ValidationError::InsufficientDownPayment {
                required: crate::decimal::Money::from_cents(2_100),
                provided: crate::decimal::Money::from_cents(1_000),
            }]
        );
        assert!(planning.preview().is_err());

        planning.set_down_payment(crate::decimal::Money::from_cents(2_100));
        assert!(planning.preview().is_ok());
    }

    #[test]
    fn test_down_payment_cannot_exceed_total() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));
        planning.set_installment_count(3);
        planning.set_down_payment(crate::decimal::Money::from_cents(30_000));

        assert!(planning
            .validation_errors()
            .iter()
            .any(|e| matches!(e, ValidationError::DownPaymentExceedsTotal { .. })));

        // a negative down payment never reaches the schedule builder
        planning.set_down_payment(crate::decimal::Money::from_cents(-500));
        assert!(planning
            .validation_errors()
            .iter()
            .any(|e| matches!(e, ValidationError::InsufficientDownPayment { .. })));
    }

    #[test]
    fn test_financing_recomputes_reactively() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));

        planning.set_installment_count(3);
        assert_eq!(
            planning.financing().installment_value,
            crate::decimal::Money::from_cents(7_000)
        );

        planning.set_down_payment(crate::decimal::Money::from_cents(3_000));
        assert_eq!(
            planning.financing().installment_value,
            crate::decimal::Money::from_cents(6_000)
        );
        assert_eq!(
            planning.financing().amount_to_finance,
            crate::decimal::Money::from_cents(18_000)
        );
    }

    #[test]
    fn test_overrides_flow_into_schedule_preview() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));
        planning.set_installment_count(3);
        planning.set_validity_days(15);

        planning.override_due_date(2, date(2025, 7, 1));
        assert_eq!(planning.schedule_preview()[1].due_date, date(2025, 7, 1));

        planning.clear_override(2);
        assert_eq!(planning.schedule_preview()[1].due_date, date(2025, 5, 10));

        assert_eq!(planning.plan().validity_days, 15);
    }

    #[test]
    fn test_preview_carries_schedule() {
        let as_of = date(2025, 3, 2);
        let employer_id = Uuid::new_v4();
        let store = seeded_store(employer_id, as_of);
        let mut events = EventStore::new();

        let review = selection_with_all(&store, Uuid::new_v4(), employer_id, &mut events)
            .calculate(as_of, &mut events)
            .unwrap();
        let mut planning = review.plan_installments(date(2025, 4, 10));
        planning.set_installment_count(3);
        planning.set_down_payment(crate::decimal::Money::from_cents(3_000));

        let preview = planning.preview().unwrap();

        assert_eq!(preview.schedule().len(), 4);
        assert_eq!(preview.schedule()[0].number, 0);
        assert_eq!(preview.schedule()[0].due_date, date(2025, 3, 4));
        assert_eq!(preview.schedule()[1].due_date, date(2025, 4, 4));
        assert_eq!(preview.committed(), None);
    }
}
