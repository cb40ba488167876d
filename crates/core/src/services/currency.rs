use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::currency::{ConversionResult, ExchangeRate};
use crate::errors::DomainError;
use crate::ports::ExchangeRateRepository;

/// Converts amounts to and from the base currency. A pair that is only tabulated in the
/// opposite direction is served by the inverse of that entry.
#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<dyn ExchangeRateRepository>,
    base_currency: String,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn ExchangeRateRepository>, base_currency: impl Into<String>) -> Self {
        Self { rates, base_currency: base_currency.into() }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub async fn to_base(
        &self,
        amount: Decimal,
        from_currency: &str,
    ) -> Result<ConversionResult, DomainError> {
        self.convert(amount, from_currency, &self.base_currency).await
    }

    pub async fn from_base(
        &self,
        amount: Decimal,
        to_currency: &str,
    ) -> Result<ConversionResult, DomainError> {
        self.convert(amount, &self.base_currency, to_currency).await
    }

    pub async fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConversionResult, DomainError> {
        let from = from_currency.trim().to_ascii_uppercase();
        let to = to_currency.trim().to_ascii_uppercase();
        if from == to {
            return Ok(ConversionResult::identity(amount, &from));
        }

        let rate = self.resolve_rate(&from, &to).await?;
        let converted_amount = amount.checked_mul(rate.rate).ok_or_else(|| {
            DomainError::validation("currency", format!("converting {amount} {from} overflows"))
        })?;

        Ok(ConversionResult {
            original_amount: amount,
            original_currency: from,
            converted_amount,
            target_currency: to,
            rate: rate.rate,
        })
    }

    pub async fn resolve_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, DomainError> {
        let now = Utc::now();

        if let Some(direct) = self.rates.find_rate(from, to).await? {
            if direct.is_valid_at(now) {
                return Ok(direct);
            }
        }

        if let Some(reverse) = self.rates.find_rate(to, from).await? {
            if reverse.is_valid_at(now) {
                if let Some(inverse) = reverse.inverse() {
                    return Ok(inverse);
                }
            }
        }

        Err(DomainError::not_found("currency", format!("no exchange rate from {from} to {to}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::CurrencyConverter;
    use crate::errors::ErrorKind;
    use crate::testing::{rate, StubCatalog};

    fn converter() -> CurrencyConverter {
        CurrencyConverter::new(StubCatalog::seeded().shared(), "EUR")
    }

    #[tokio::test]
    async fn base_currency_passes_through_with_unit_rate() {
        let result = converter().to_base(Decimal::new(4250, 2), "eur").await.expect("identity");

        assert_eq!(result.converted_amount, Decimal::new(4250, 2));
        assert_eq!(result.rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn tabulated_direction_uses_direct_rate() {
        let result = converter().to_base(Decimal::from(100), "GBP").await.expect("gbp to eur");

        assert_eq!(result.converted_amount, Decimal::from(125));
        assert_eq!(result.target_currency, "EUR");
    }

    #[tokio::test]
    async fn untabulated_direction_uses_inverse_rate() {
        let result = converter().from_base(Decimal::from(100), "GBP").await.expect("eur to gbp");

        assert_eq!(result.rate, Decimal::new(8, 1));
        assert_eq!(result.converted_amount, Decimal::from(80));
    }

    #[tokio::test]
    async fn round_trip_through_inverse_returns_original_amount() {
        let mut catalog = StubCatalog::seeded();
        catalog.rates = vec![rate("USD", "EUR", Decimal::new(92, 2))];
        let converter = CurrencyConverter::new(catalog.shared(), "EUR");

        let there = converter.to_base(Decimal::ONE, "USD").await.expect("usd to eur");
        let back = converter.from_base(there.converted_amount, "USD").await.expect("eur to usd");

        assert!((back.converted_amount - Decimal::ONE).abs() < Decimal::new(1, 20));
    }

    #[tokio::test]
    async fn expired_rate_is_ignored() {
        let mut catalog = StubCatalog::seeded();
        let mut stale = rate("GBP", "EUR", Decimal::new(125, 2));
        stale.valid_to = Some(Utc::now() - Duration::days(1));
        catalog.rates = vec![stale];
        let converter = CurrencyConverter::new(catalog.shared(), "EUR");

        let error = converter.to_base(Decimal::ONE, "GBP").await.expect_err("stale rate");
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unknown_pair_is_not_found() {
        let error = converter().to_base(Decimal::ONE, "JPY").await.expect_err("no JPY rate");

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains("JPY"));
    }
}
