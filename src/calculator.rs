use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::Money;
use crate::errors::{NegotiationError, Result};
use crate::settings::NegotiationSettings;
use crate::types::BillingItem;

/// surcharge breakdown for one billing item as of a given date
///
/// Deterministic in (item, settings, as_of); holds a snapshot of the item
/// so later rate changes never alter an already-frozen calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedItem {
    pub item: BillingItem,
    pub days_overdue: i64,
    pub interest: Money,
    pub correction: Money,
    pub late_fee: Money,
    pub total: Money,
}

impl CalculatedItem {
    /// compute surcharges for one item
    ///
    /// Months overdue use a flat 30-day month, fractional. The late fee is
    /// flat: applied once if the item is overdue at all, never prorated.
    /// Each monetary result is rounded half-up to the cent as produced.
    pub fn compute(
        item: &BillingItem,
        settings: &NegotiationSettings,
        as_of: NaiveDate,
    ) -> Result<Self> {
        if item.value.is_negative() {
            return Err(NegotiationError::InvalidItemValue { value: item.value });
        }

        let days_overdue = (as_of - item.due_date).num_days().max(0);
        let months_overdue = Decimal::from(days_overdue) / dec!(30);

        let interest = item.value * (settings.interest_rate_monthly.as_decimal() * months_overdue);
        let correction =
            item.value * (settings.correction_rate_monthly.as_decimal() * months_overdue);
        let late_fee = if days_overdue > 0 {
            item.value.percentage(settings.late_fee)
        } else {
            Money::ZERO
        };
        let total = item.value + interest + correction + late_fee;

        Ok(Self {
            item: item.clone(),
            days_overdue,
            interest,
            correction,
            late_fee,
            total,
        })
    }

    /// months overdue under the flat 30-day month rule
    pub fn months_overdue(&self) -> Decimal {
        Decimal::from(self.days_overdue) / dec!(30)
    }
}
