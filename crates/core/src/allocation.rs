use rust_decimal::Decimal;

/// Splits a whole into `count` weights that sum to one.
pub trait AllocationStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn allocate(&self, count: usize) -> Vec<Decimal>;
}

/// Gives every participant the same `1/N` share regardless of size or proximity.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqualAllocation;

impl AllocationStrategy for EqualAllocation {
    fn name(&self) -> &'static str {
        "equal"
    }

    fn allocate(&self, count: usize) -> Vec<Decimal> {
        if count == 0 {
            return Vec::new();
        }

        let share = Decimal::ONE / Decimal::from(count as u64);
        vec![share; count]
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AllocationStrategy, EqualAllocation};

    #[test]
    fn no_participants_yields_no_weights() {
        assert!(EqualAllocation.allocate(0).is_empty());
    }

    #[test]
    fn equal_weights_sum_to_one() {
        let weights = EqualAllocation.allocate(4);
        assert_eq!(weights, vec![Decimal::new(25, 2); 4]);
        assert_eq!(weights.iter().copied().sum::<Decimal>(), Decimal::ONE);
    }

    #[test]
    fn thirds_sum_to_one_within_precision() {
        let total: Decimal = EqualAllocation.allocate(3).into_iter().sum();
        assert!((total - Decimal::ONE).abs() < Decimal::new(1, 20));
    }
}
