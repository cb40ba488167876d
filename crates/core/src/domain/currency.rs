use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Directional conversion rate: one unit of `source_currency` buys `rate` units of
/// `target_currency`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub source_currency: String,
    pub target_currency: String,
    pub rate: Decimal,
    pub conversion_date: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl ExchangeRate {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && self.valid_to.map_or(true, |until| at <= until)
    }

    /// The reverse-direction rate. `None` when the rate is zero.
    pub fn inverse(&self) -> Option<Self> {
        let rate = Decimal::ONE.checked_div(self.rate)?;
        Some(Self {
            source_currency: self.target_currency.clone(),
            target_currency: self.source_currency.clone(),
            rate,
            conversion_date: self.conversion_date,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub original_amount: Decimal,
    pub original_currency: String,
    pub converted_amount: Decimal,
    pub target_currency: String,
    pub rate: Decimal,
}

impl ConversionResult {
    pub fn identity(amount: Decimal, currency: &str) -> Self {
        Self {
            original_amount: amount,
            original_currency: currency.to_string(),
            converted_amount: amount,
            target_currency: currency.to_string(),
            rate: Decimal::ONE,
        }
    }
}
