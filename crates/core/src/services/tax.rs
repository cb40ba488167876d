use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::trace;

use crate::domain::money::round_money;
use crate::domain::tax::{Location, TaxRate, TaxResult, SALES_TAX_NAME};
use crate::errors::DomainError;
use crate::ports::TaxRateRepository;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxCalculationInput {
    pub merchant: Location,
    pub customer: Location,
    pub amount: Decimal,
}

/// Destination-based sales tax: the rate is keyed on the customer's location only. The
/// merchant location is carried for auditing but does not select the rate.
#[derive(Clone)]
pub struct SalesTaxCalculator {
    tax_rates: Arc<dyn TaxRateRepository>,
}

impl SalesTaxCalculator {
    pub fn new(tax_rates: Arc<dyn TaxRateRepository>) -> Self {
        Self { tax_rates }
    }

    /// Exact `(country, state)` match, then the country-wide record.
    pub async fn resolve_rate(&self, customer: &Location) -> Result<Option<TaxRate>, DomainError> {
        if let Some(state) = customer.state.as_deref() {
            let exact = self.tax_rates.find_tax_rate(&customer.country, Some(state)).await?;
            if exact.is_some() {
                return Ok(exact);
            }
        }

        self.tax_rates.find_tax_rate(&customer.country, None).await
    }

    pub async fn calculate(&self, input: &TaxCalculationInput) -> Result<TaxResult, DomainError> {
        trace!(
            merchant_country = %input.merchant.country,
            customer_country = %input.customer.country,
            "resolving sales tax by customer location"
        );

        let rate = match self.resolve_rate(&input.customer).await? {
            Some(record) => record.effective_rate(),
            None => Decimal::ZERO,
        };

        if rate.is_zero() {
            return Ok(TaxResult::not_applicable(input.amount));
        }

        Ok(TaxResult {
            taxable_amount: input.amount,
            is_applicable: true,
            tax_rate: rate,
            tax_amount: round_money(input.amount * rate),
            tax_name: SALES_TAX_NAME.to_string(),
        })
    }
}
