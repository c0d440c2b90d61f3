pub mod aggregate;
pub mod calculator;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod records;
pub mod retry;
pub mod schedule;
pub mod settings;
pub mod store;
pub mod types;
pub mod workflow;

// re-export key types
pub use aggregate::{FinancingTerms, Totals};
pub use calculator::CalculatedItem;
pub use decimal::{Money, Rate};
pub use errors::{NegotiationError, Result, StoreError, ValidationError};
pub use events::{Event, EventStore};
pub use records::{Installment, Negotiation, NegotiationItem, NegotiationView};
pub use retry::{retry, RetryError};
pub use schedule::{
    advance_months, at_boundary_time, build_schedule, InstallmentPlan, ScheduledInstallment,
    DEFAULT_VALIDITY_DAYS, DOWN_PAYMENT_LEAD_DAYS,
};
pub use settings::{load_settings, NegotiationSettings};
pub use store::{
    CodeGenerator, EligibleItemSource, MemoryStore, NegotiationStore, SequenceCodeGenerator,
    SettingsSource,
};
pub use types::{
    BillingItem, BillingItemId, BillingStatus, CategoryId, Competence, EmployerId,
    InstallmentStatus, NegotiationId, NegotiationStatus, OrganizationId, UserId,
};
pub use workflow::{
    CalculationReview, CommitOutcome, DebtorSelection, InstallmentPlanning, ItemSelection,
    NegotiationPreview, MAX_CODE_ATTEMPTS,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
