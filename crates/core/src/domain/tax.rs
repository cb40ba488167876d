use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SALES_TAX_NAME: &str = "Sales Tax";
pub const NOT_APPLICABLE_TAX_NAME: &str = "N/A";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub state: Option<String>,
}

impl Location {
    pub fn new(country: impl Into<String>, state: Option<String>) -> Self {
        Self { country: country.into(), state: state.filter(|value| !value.trim().is_empty()) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub merchant_country: Option<String>,
    pub merchant_state: Option<String>,
    pub customer_country: String,
    pub customer_state: Option<String>,
    pub carbon_credit_rate: Decimal,
    pub service_fee_rate: Decimal,
}

impl TaxRate {
    /// The carbon-credit rate, or the general service-fee rate when that is zero.
    pub fn effective_rate(&self) -> Decimal {
        if self.carbon_credit_rate.is_zero() {
            self.service_fee_rate
        } else {
            self.carbon_credit_rate
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    pub taxable_amount: Decimal,
    pub is_applicable: bool,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub tax_name: String,
}

impl TaxResult {
    pub fn not_applicable(taxable_amount: Decimal) -> Self {
        Self {
            taxable_amount,
            is_applicable: false,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            tax_name: NOT_APPLICABLE_TAX_NAME.to_string(),
        }
    }
}
