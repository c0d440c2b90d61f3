use std::collections::{HashMap, HashSet};

use crate::errors::StoreError;
use crate::records::{Installment, Negotiation, NegotiationItem};
use crate::settings::NegotiationSettings;
use crate::types::{BillingItem, BillingItemId, EmployerId, NegotiationId, OrganizationId};

/// read side: eligible billing items for a debtor, filtered (pending or
/// overdue, unattached) and ordered by due date ascending
pub trait EligibleItemSource {
    fn eligible_items(&self, employer_id: EmployerId) -> Result<Vec<BillingItem>, StoreError>;
}

/// read side: negotiation settings for an organization; `Ok(None)` means
/// the caller substitutes defaults
pub trait SettingsSource {
    fn settings_for(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<NegotiationSettings>, StoreError>;
}

/// external sequence-generating call, scoped to the organization; each
/// call returns a freshly allocated token
pub trait CodeGenerator {
    fn next_code(&mut self, organization_id: OrganizationId) -> Result<String, StoreError>;
}

/// write side: create-only inserts; the subsystem never updates or
/// deletes these records
pub trait NegotiationStore {
    /// insert the header; `StoreError::DuplicateCode` signals a code
    /// uniqueness conflict, which the caller retries
    fn insert_negotiation(&mut self, negotiation: &Negotiation) -> Result<(), StoreError>;

    /// insert one line per negotiated billing item and attach each item
    /// to the negotiation
    fn insert_items(&mut self, items: &[NegotiationItem]) -> Result<(), StoreError>;

    fn insert_installments(&mut self, installments: &[Installment]) -> Result<(), StoreError>;
}

/// in-memory reference implementation of every boundary trait, used in
/// tests and demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: HashMap<OrganizationId, NegotiationSettings>,
    billing_items: HashMap<BillingItemId, BillingItem>,
    negotiations: HashMap<NegotiationId, Negotiation>,
    used_codes: HashSet<(OrganizationId, String)>,
    negotiation_items: HashMap<NegotiationId, Vec<NegotiationItem>>,
    installments: HashMap<NegotiationId, Vec<Installment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_settings(&mut self, organization_id: OrganizationId, settings: NegotiationSettings) {
        self.settings.insert(organization_id, settings);
    }

    pub fn add_billing_item(&mut self, item: BillingItem) {
        self.billing_items.insert(item.id, item);
    }

    pub fn billing_item(&self, id: BillingItemId) -> Option<&BillingItem> {
        self.billing_items.get(&id)
    }

    pub fn negotiation(&self, id: NegotiationId) -> Option<&Negotiation> {
        self.negotiations.get(&id)
    }

    pub fn negotiation_count(&self) -> usize {
        self.negotiations.len()
    }

    pub fn items_of(&self, id: NegotiationId) -> &[NegotiationItem] {
        self.negotiation_items.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn installments_of(&self, id: NegotiationId) -> &[Installment] {
        self.installments.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl EligibleItemSource for MemoryStore {
    fn eligible_items(&self, employer_id: EmployerId) -> Result<Vec<BillingItem>, StoreError> {
        let mut items: Vec<BillingItem> = self
            .billing_items
            .values()
            .filter(|item| item.employer_id == employer_id && item.is_eligible())
            .cloned()
            .collect();
        // due date ascending, id as the deterministic tiebreak
        items.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(items)
    }
}

impl SettingsSource for MemoryStore {
    fn settings_for(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<NegotiationSettings>, StoreError> {
        Ok(self.settings.get(&organization_id).cloned())
    }
}

impl NegotiationStore for MemoryStore {
    fn insert_negotiation(&mut self, negotiation: &Negotiation) -> Result<(), StoreError> {
        let key = (negotiation.organization_id, negotiation.code.clone());
        if self.used_codes.contains(&key) {
            return Err(StoreError::DuplicateCode);
        }
        self.used_codes.insert(key);
        self.negotiations.insert(negotiation.id, negotiation.clone());
        Ok(())
    }

    fn insert_items(&mut self, items: &[NegotiationItem]) -> Result<(), StoreError> {
        for line in items {
            if let Some(item) = self.billing_items.get_mut(&line.billing_item_id) {
                item.negotiation_id = Some(line.negotiation_id);
            }
            self.negotiation_items
                .entry(line.negotiation_id)
                .or_default()
                .push(line.clone());
        }
        Ok(())
    }

    fn insert_installments(&mut self, installments: &[Installment]) -> Result<(), StoreError> {
        for row in installments {
            self.installments
                .entry(row.negotiation_id)
                .or_default()
                .push(row.clone());
        }
        Ok(())
    }
}

/// reference code generator: an organization-scoped sequence rendered as
/// a human-readable token
#[derive(Debug, Default)]
pub struct SequenceCodeGenerator {
    counters: HashMap<OrganizationId, u64>,
}

impl SequenceCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn next_code(&mut self, organization_id: OrganizationId) -> Result<String, StoreError> {
        let counter = self.counters.entry(organization_id).or_insert(0);
        *counter += 1;
        Ok(format!("NEG-{:06}", counter))
    }
}
