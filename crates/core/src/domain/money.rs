use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Rounds to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub value: Decimal,
    pub currency_code: String,
}

impl Money {
    pub fn new(value: Decimal, currency_code: impl Into<String>) -> Self {
        Self { value, currency_code: currency_code.into() }
    }

    pub fn is_currency(&self, code: &str) -> bool {
        self.currency_code.eq_ignore_ascii_case(code)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{round_money, Money};

    #[test]
    fn rounds_half_cents_away_from_zero() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
        assert_eq!(round_money(Decimal::new(10049, 4)), Decimal::new(100, 2));
    }

    #[test]
    fn currency_comparison_ignores_case() {
        let money = Money::new(Decimal::ONE, "eur");
        assert!(money.is_currency("EUR"));
        assert!(!money.is_currency("GBP"));
    }
}
