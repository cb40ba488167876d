pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod orchestrator;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use allocation::{AllocationStrategy, EqualAllocation};
pub use domain::money::{round_money, Money};
pub use domain::organisation::{Organisation, OrganisationId};
pub use domain::quote::{Quote, QuoteId, QuoteStatus};
pub use errors::{DomainError, ErrorKind, InterfaceError, PipelineStep, QuoteError};
pub use orchestrator::{
    CreateQuoteRequest, QuoteDependencies, QuoteOrchestrator, QuoteResponse, QuoteSettings,
};
