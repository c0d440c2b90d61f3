use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::Totals;
use crate::calculator::CalculatedItem;
use crate::decimal::{Money, Rate};
use crate::schedule::ScheduledInstallment;
use crate::types::{
    BillingItemId, Competence, EmployerId, InstallmentStatus, NegotiationId, NegotiationStatus,
    OrganizationId, UserId,
};

/// persisted negotiation header; created exactly once per successful
/// commit, never updated or deleted by this subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub id: NegotiationId,
    pub organization_id: OrganizationId,
    pub employer_id: EmployerId,
    /// unique human-readable code, allocated at commit time
    pub code: String,
    pub status: NegotiationStatus,
    pub totals: Totals,
    pub down_payment: Money,
    pub installment_count: u32,
    pub installment_value: Money,
    pub first_due_date: NaiveDate,
    // rates applied at calculation time, snapshotted for audit
    pub interest_rate_monthly: Rate,
    pub correction_rate_monthly: Rate,
    pub late_fee: Rate,
    pub legal_basis: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// persisted line, one per negotiated billing item; snapshotted so the
/// negotiation stays stable if rates change afterward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationItem {
    pub negotiation_id: NegotiationId,
    pub billing_item_id: BillingItemId,
    pub value: Money,
    pub due_date: NaiveDate,
    pub competence: Competence,
    pub category_name: String,
    pub days_overdue: i64,
    pub interest: Money,
    pub correction: Money,
    pub late_fee: Money,
    pub total: Money,
}

impl NegotiationItem {
    pub fn from_calculated(negotiation_id: NegotiationId, calc: &CalculatedItem) -> Self {
        Self {
            negotiation_id,
            billing_item_id: calc.item.id,
            value: calc.item.value,
            due_date: calc.item.due_date,
            competence: calc.item.competence,
            category_name: calc.item.category_name.clone(),
            days_overdue: calc.days_overdue,
            interest: calc.interest,
            correction: calc.correction,
            late_fee: calc.late_fee,
            total: calc.total,
        }
    }
}

/// persisted schedule entry; number 0 is the down payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub negotiation_id: NegotiationId,
    pub number: u32,
    pub value: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

impl Installment {
    pub fn from_scheduled(negotiation_id: NegotiationId, entry: &ScheduledInstallment) -> Self {
        Self {
            negotiation_id,
            number: entry.number,
            value: entry.value,
            due_date: entry.due_date,
            status: InstallmentStatus::Pending,
        }
    }
}

/// serializable view of a committed negotiation for the document/preview
/// rendering boundary
#[derive(Debug, Serialize, Deserialize)]
pub struct NegotiationView {
    pub negotiation: Negotiation,
    pub items: Vec<NegotiationItem>,
    pub installments: Vec<Installment>,
}

impl NegotiationView {
    pub fn new(
        negotiation: Negotiation,
        items: Vec<NegotiationItem>,
        installments: Vec<Installment>,
    ) -> Self {
        Self {
            negotiation,
            items,
            installments,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
