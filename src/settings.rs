use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::store::SettingsSource;
use crate::types::OrganizationId;

/// negotiation parameters and policy constraints for one organization;
/// immutable within a negotiation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationSettings {
    /// interest charged per month overdue
    pub interest_rate_monthly: Rate,
    /// monetary correction (inflation indexation) per month overdue
    pub correction_rate_monthly: Rate,
    /// flat penalty applied once an item is overdue at all
    pub late_fee: Rate,
    /// legal basis text printed on the negotiation document
    pub legal_basis: String,
    pub max_installments: u32,
    pub min_installment_value: Money,
    /// whether a subset of the eligible items may be negotiated
    pub allow_partial_selection: bool,
    pub require_down_payment: bool,
    /// minimum down payment as a share of the negotiated total
    pub min_down_payment_percentage: Rate,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            interest_rate_monthly: Rate::from_percentage(dec!(1.0)),
            correction_rate_monthly: Rate::from_percentage(dec!(0.5)),
            late_fee: Rate::from_percentage(dec!(2.0)),
            legal_basis: "Debt renegotiation under the organization's bylaws \
                          and applicable civil code provisions."
                .to_string(),
            max_installments: 12,
            min_installment_value: Money::from_major(50),
            allow_partial_selection: true,
            require_down_payment: false,
            min_down_payment_percentage: Rate::from_percentage(dec!(10.0)),
        }
    }
}

/// fetch the organization's settings, substituting the hard-coded
/// defaults when none exist
pub fn load_settings(
    source: &dyn SettingsSource,
    organization_id: OrganizationId,
    events: &mut EventStore,
) -> Result<NegotiationSettings> {
    match source.settings_for(organization_id)? {
        Some(settings) => Ok(settings),
        None => {
            events.emit(Event::SettingsDefaulted { organization_id });
            Ok(NegotiationSettings::default())
        }
    }
}
