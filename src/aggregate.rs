use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::CalculatedItem;
use crate::decimal::Money;

/// negotiation-level totals, the field-wise sum of the per-item breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Totals {
    pub original_value: Money,
    pub total_interest: Money,
    pub total_correction: Money,
    pub total_late_fee: Money,
    pub total_negotiated: Money,
}

impl Totals {
    /// sum per-item calculated values; order-independent
    pub fn aggregate(items: &[CalculatedItem]) -> Self {
        items.iter().fold(Totals::default(), |acc, calc| Totals {
            original_value: acc.original_value + calc.item.value,
            total_interest: acc.total_interest + calc.interest,
            total_correction: acc.total_correction + calc.correction,
            total_late_fee: acc.total_late_fee + calc.late_fee,
            total_negotiated: acc.total_negotiated + calc.total,
        })
    }

    /// derive the financed amount and per-installment value; recomputed on
    /// every installment-count or down-payment change
    pub fn derive_financing(&self, down_payment: Money, installment_count: u32) -> FinancingTerms {
        let amount_to_finance = self.total_negotiated - down_payment;
        let installment_value = if installment_count == 0 {
            // rejected upstream; never a division here
            Money::ZERO
        } else {
            amount_to_finance / Decimal::from(installment_count)
        };

        FinancingTerms {
            amount_to_finance,
            installment_value,
        }
    }
}

/// financed amount and the evenly divided per-installment value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub amount_to_finance: Money,
    pub installment_value: Money,
}
