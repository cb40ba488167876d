//! Storage and lookup collaborators used by the quoting services.
//!
//! Implementations live in `carbonquote-db`. Stores return exact matches only; fallback
//! rules (inverse rates, wildcard factors, default fees, tax precedence) belong to the
//! services in [`crate::services`].

use async_trait::async_trait;

use crate::domain::carbon::{CarbonFactor, Footprint, FootprintId};
use crate::domain::country::{Country, CountryId};
use crate::domain::currency::ExchangeRate;
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::fee::FeeConfig;
use crate::domain::organisation::{Organisation, OrganisationId};
use crate::domain::partner::{ImpactPartner, ImpactProject, PartnerId};
use crate::domain::quote::{Quote, QuoteId};
use crate::domain::tax::TaxRate;
use crate::errors::DomainError;

#[async_trait]
pub trait OrganisationRepository: Send + Sync {
    async fn get_by_id(&self, id: &OrganisationId) -> Result<Organisation, DomainError>;
    async fn list_children(&self, parent: &OrganisationId)
        -> Result<Vec<Organisation>, DomainError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, DomainError>;
    async fn get_by_reference(
        &self,
        organisation_id: &OrganisationId,
        reference: &str,
    ) -> Result<Customer, DomainError>;
    async fn create(&self, customer: Customer) -> Result<Customer, DomainError>;
}

#[async_trait]
pub trait CountryRepository: Send + Sync {
    /// Accepts ISO 3166 alpha-2 or alpha-3 codes.
    async fn get_by_code(&self, code: &str) -> Result<Country, DomainError>;
}

#[async_trait]
pub trait ExchangeRateRepository: Send + Sync {
    async fn find_rate(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, DomainError>;
}

#[async_trait]
pub trait CarbonFactorRepository: Send + Sync {
    async fn find_factor(
        &self,
        merchant_category_code: &str,
        country_id: &CountryId,
    ) -> Result<Option<CarbonFactor>, DomainError>;
}

#[async_trait]
pub trait FootprintRepository: Send + Sync {
    async fn create(&self, footprint: Footprint) -> Result<Footprint, DomainError>;
    async fn get_by_id(&self, id: &FootprintId) -> Result<Footprint, DomainError>;
}

#[async_trait]
pub trait FeeConfigRepository: Send + Sync {
    async fn find_fee_config(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<Option<FeeConfig>, DomainError>;
}

#[async_trait]
pub trait TaxRateRepository: Send + Sync {
    /// Exact match on customer location. `state: None` selects the country-wide record.
    async fn find_tax_rate(
        &self,
        country: &str,
        state: Option<&str>,
    ) -> Result<Option<TaxRate>, DomainError>;
}

#[async_trait]
pub trait ImpactPartnerRepository: Send + Sync {
    async fn get_by_id(&self, id: &PartnerId) -> Result<ImpactPartner, DomainError>;
}

#[async_trait]
pub trait ImpactProjectRepository: Send + Sync {
    /// Projects of one partner, ordered by project id.
    async fn list_by_partner(
        &self,
        partner: &PartnerId,
    ) -> Result<Vec<ImpactProject>, DomainError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: Quote) -> Result<Quote, DomainError>;
    async fn get_by_id(&self, id: &QuoteId) -> Result<Quote, DomainError>;
    async fn update(&self, quote: Quote) -> Result<Quote, DomainError>;
}
