use thiserror::Error;

use crate::decimal::Money;
use crate::types::NegotiationId;

/// user-correctable problems that block a wizard transition; re-evaluated
/// on every input change, never retried automatically
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no billing items selected")]
    NoItemsSelected,

    #[error("partial selection not allowed: {selected} of {eligible} items selected")]
    PartialSelectionNotAllowed {
        eligible: usize,
        selected: usize,
    },

    #[error("invalid installment count: {count} outside 1..={max}")]
    InvalidInstallmentCount {
        count: u32,
        max: u32,
    },

    #[error("installment below minimum: minimum {minimum}, computed {value}")]
    InstallmentBelowMinimum {
        minimum: Money,
        value: Money,
    },

    #[error("insufficient down payment: required {required}, provided {provided}")]
    InsufficientDownPayment {
        required: Money,
        provided: Money,
    },

    #[error("down payment {down_payment} exceeds negotiated total {total}")]
    DownPaymentExceedsTotal {
        down_payment: Money,
        total: Money,
    },
}

/// failures reported by the storage and code-generation boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("negotiation code already in use")]
    DuplicateCode,

    #[error("storage backend failure: {message}")]
    Backend {
        message: String,
    },
}

impl StoreError {
    /// only code collisions are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::DuplicateCode)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid billing item value: {value}")]
    InvalidItemValue {
        value: Money,
    },

    #[error("could not allocate a unique negotiation code after {attempts} attempts")]
    CodeAllocationExhausted {
        attempts: u32,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("a commit attempt is already in flight")]
    CommitInFlight,

    #[error("negotiation already committed: {id}")]
    AlreadyCommitted {
        id: NegotiationId,
    },
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
