use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for an employer (the debtor organization)
pub type EmployerId = Uuid;

/// unique identifier for the organization running the negotiation
pub type OrganizationId = Uuid;

/// unique identifier for a billing item
pub type BillingItemId = Uuid;

/// unique identifier for a billing category
pub type CategoryId = Uuid;

/// unique identifier for a negotiation
pub type NegotiationId = Uuid;

/// unique identifier for the user creating a negotiation
pub type UserId = Uuid;

/// billing item status; settlement is handled by an external provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingStatus {
    /// issued, not yet due
    Pending,
    /// past due date, unpaid
    Overdue,
    /// settled by the billing provider
    Paid,
    /// cancelled, never collectable
    Cancelled,
    /// issued without a value yet
    AwaitingValue,
}

/// negotiation status; transitions past Simulation are external
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationStatus {
    /// created, awaiting debtor acceptance
    Simulation,
    /// accepted by the debtor
    Accepted,
    /// validity window elapsed without acceptance
    Expired,
}

/// installment status; settlement is handled by an external provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Cancelled,
}

/// the month/year a billing item's charge nominally covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Competence {
    pub month: u32,
    pub year: i32,
}

impl Competence {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }
}

impl fmt::Display for Competence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// a single periodic charge owed by an employer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingItem {
    pub id: BillingItemId,
    pub employer_id: EmployerId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub competence: Competence,
    pub value: Money,
    pub due_date: NaiveDate,
    pub status: BillingStatus,
    pub negotiation_id: Option<NegotiationId>,
}

impl BillingItem {
    /// eligible for negotiation: pending or overdue, and not already
    /// attached to another negotiation
    pub fn is_eligible(&self) -> bool {
        matches!(self.status, BillingStatus::Pending | BillingStatus::Overdue)
            && self.negotiation_id.is_none()
    }
}
