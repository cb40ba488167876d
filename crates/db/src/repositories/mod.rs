use carbonquote_core::errors::DomainError;
use thiserror::Error;

pub mod memory;
pub mod quote;

pub use memory::{
    InMemoryCarbonFactorRepository, InMemoryCountryRepository, InMemoryCustomerRepository,
    InMemoryExchangeRateRepository, InMemoryFeeConfigRepository, InMemoryFootprintRepository,
    InMemoryImpactPartnerRepository, InMemoryImpactProjectRepository,
    InMemoryOrganisationRepository, InMemoryQuoteRepository, InMemoryTaxRateRepository,
    MemoryCatalog,
};
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn into_domain(self, domain: &'static str) -> DomainError {
        DomainError::internal(domain, "storage operation failed", self)
    }
}

impl From<RepositoryError> for DomainError {
    fn from(error: RepositoryError) -> Self {
        error.into_domain("storage")
    }
}
