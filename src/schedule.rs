use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::decimal::Money;

/// days between commit and the down payment's due date
pub const DOWN_PAYMENT_LEAD_DAYS: i64 = 2;

/// default validity window of a committed negotiation
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// installment plan inputs, mutable while the wizard is open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub installment_count: u32,
    pub down_payment: Money,
    pub first_due_date: NaiveDate,
    /// manually overridden due dates by installment number; absent
    /// entries use the computed date
    pub due_date_overrides: BTreeMap<u32, NaiveDate>,
    pub validity_days: i64,
}

impl InstallmentPlan {
    pub fn new(first_due_date: NaiveDate) -> Self {
        Self {
            installment_count: 1,
            down_payment: Money::ZERO,
            first_due_date,
            due_date_overrides: BTreeMap::new(),
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }

    /// due date of installment number 0
    pub fn down_payment_due(&self, as_of: NaiveDate) -> NaiveDate {
        self.due_date_overrides
            .get(&0)
            .copied()
            .unwrap_or(as_of + Duration::days(DOWN_PAYMENT_LEAD_DAYS))
    }
}

/// one entry of the computed schedule; number 0 is the down payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub value: Money,
    pub due_date: NaiveDate,
}

/// build the ordered installment list
///
/// An override wins unconditionally for its installment number. With a down
/// payment, regular installments follow the down payment's date monthly;
/// without one, they follow the plan's first due date. Validation happens
/// upstream; this builder never fails.
pub fn build_schedule(
    plan: &InstallmentPlan,
    installment_value: Money,
    as_of: NaiveDate,
) -> Vec<ScheduledInstallment> {
    let mut schedule = Vec::with_capacity(plan.installment_count as usize + 1);

    let down_payment_due = plan.down_payment_due(as_of);
    let has_down_payment = plan.down_payment.is_positive();

    if has_down_payment {
        schedule.push(ScheduledInstallment {
            number: 0,
            value: plan.down_payment,
            due_date: down_payment_due,
        });
    }

    for i in 1..=plan.installment_count {
        let due_date = match plan.due_date_overrides.get(&i) {
            Some(overridden) => *overridden,
            None if has_down_payment => advance_months(down_payment_due, i),
            None => advance_months(plan.first_due_date, i - 1),
        };

        schedule.push(ScheduledInstallment {
            number: i,
            value: installment_value,
            due_date,
        });
    }

    schedule
}

/// advance a calendar date by whole months, preserving the day-of-month
/// and clamping to the last day of shorter months
pub fn advance_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = date.day().min(days_in_month(year, month));

    // year/month/day are valid by construction
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped calendar date")
}

/// attach the fixed boundary time-of-day to a calendar date; dates carry
/// no time/zone anywhere inside the subsystem
pub fn at_boundary_time(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("noon exists"))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
