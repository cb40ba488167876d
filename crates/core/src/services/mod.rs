//! Calculators and resolvers composed by the quote orchestrator.

pub mod carbon;
pub mod currency;
pub mod customer;
pub mod fee;
pub mod organisation;
pub mod pricing;
pub mod tax;

pub use carbon::{CarbonFactorLookup, FootprintCalculator, FootprintRequest};
pub use currency::CurrencyConverter;
pub use customer::CustomerResolver;
pub use fee::ServiceFeeCalculator;
pub use organisation::OrganisationValidator;
pub use pricing::{BlendedPrice, BlendedPriceCalculator, WeightedProject};
pub use tax::{SalesTaxCalculator, TaxCalculationInput};
