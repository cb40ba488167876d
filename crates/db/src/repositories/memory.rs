//! `RwLock`-guarded map stores for every quoting port.
//!
//! Lookup tables are seeded once through `from_records` and read concurrently afterwards.
//! Writable stores (customers, footprints, quotes) take the write lock only for the insert.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use carbonquote_core::allocation::{AllocationStrategy, EqualAllocation};
use carbonquote_core::domain::carbon::{CarbonFactor, Footprint, FootprintId};
use carbonquote_core::domain::country::{Country, CountryId};
use carbonquote_core::domain::currency::ExchangeRate;
use carbonquote_core::domain::customer::{Customer, CustomerId};
use carbonquote_core::domain::fee::FeeConfig;
use carbonquote_core::domain::organisation::{Organisation, OrganisationId};
use carbonquote_core::domain::partner::{ImpactPartner, ImpactProject, PartnerId};
use carbonquote_core::domain::quote::{Quote, QuoteId};
use carbonquote_core::domain::tax::TaxRate;
use carbonquote_core::errors::DomainError;
use carbonquote_core::orchestrator::QuoteDependencies;
use carbonquote_core::ports::{
    CarbonFactorRepository, CountryRepository, CustomerRepository, ExchangeRateRepository,
    FeeConfigRepository, FootprintRepository, ImpactPartnerRepository, ImpactProjectRepository,
    OrganisationRepository, QuoteRepository, TaxRateRepository,
};

fn pair_key(left: &str, right: &str) -> String {
    format!("{left}:{right}")
}

fn missing(domain: &'static str, id: impl std::fmt::Display) -> DomainError {
    DomainError::not_found(domain, format!("{domain} {id} not found"))
}

#[derive(Default)]
pub struct InMemoryOrganisationRepository {
    organisations: RwLock<HashMap<String, Organisation>>,
}

impl InMemoryOrganisationRepository {
    pub fn from_records(records: impl IntoIterator<Item = Organisation>) -> Self {
        let organisations = records.into_iter().map(|org| (org.id.0.clone(), org)).collect();
        Self { organisations: RwLock::new(organisations) }
    }

    pub async fn insert(&self, organisation: Organisation) {
        self.organisations.write().await.insert(organisation.id.0.clone(), organisation);
    }
}

#[async_trait]
impl OrganisationRepository for InMemoryOrganisationRepository {
    async fn get_by_id(&self, id: &OrganisationId) -> Result<Organisation, DomainError> {
        self.organisations
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| missing("organisation", id))
    }

    async fn list_children(
        &self,
        parent: &OrganisationId,
    ) -> Result<Vec<Organisation>, DomainError> {
        let mut children: Vec<Organisation> = self
            .organisations
            .read()
            .await
            .values()
            .filter(|org| org.is_child_of(parent))
            .cloned()
            .collect();
        children.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(children)
    }
}

#[derive(Default)]
struct CustomerIndex {
    by_id: HashMap<String, Customer>,
    id_by_reference: HashMap<String, String>,
}

/// Customers indexed by id and by `(organisation, reference)`. Both indexes are updated
/// under one write lock so a reference never points at a missing record.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    index: RwLock<CustomerIndex>,
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, DomainError> {
        self.index
            .read()
            .await
            .by_id
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| missing("customer", id.as_str()))
    }

    async fn get_by_reference(
        &self,
        organisation_id: &OrganisationId,
        reference: &str,
    ) -> Result<Customer, DomainError> {
        let index = self.index.read().await;
        index
            .id_by_reference
            .get(&pair_key(organisation_id.as_str(), reference))
            .and_then(|id| index.by_id.get(id))
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(
                    "customer",
                    format!("customer `{reference}` not found for organisation {organisation_id}"),
                )
            })
    }

    async fn create(&self, customer: Customer) -> Result<Customer, DomainError> {
        let mut index = self.index.write().await;
        if index.by_id.contains_key(customer.id.as_str()) {
            return Err(DomainError::validation(
                "customer",
                format!("customer {} already exists", customer.id.0),
            ));
        }

        let reference_key = (!customer.reference.is_empty())
            .then(|| pair_key(customer.organisation_id.as_str(), &customer.reference));
        if let Some(key) = &reference_key {
            if index.id_by_reference.contains_key(key) {
                return Err(DomainError::validation(
                    "customer",
                    format!(
                        "customer reference `{}` already exists for organisation {}",
                        customer.reference, customer.organisation_id
                    ),
                ));
            }
        }

        if let Some(key) = reference_key {
            index.id_by_reference.insert(key, customer.id.0.clone());
        }
        index.by_id.insert(customer.id.0.clone(), customer.clone());
        Ok(customer)
    }
}

#[derive(Default)]
pub struct InMemoryCountryRepository {
    countries: RwLock<HashMap<String, Country>>,
}

impl InMemoryCountryRepository {
    pub fn from_records(records: impl IntoIterator<Item = Country>) -> Self {
        let countries =
            records.into_iter().map(|country| (country.id.0.clone(), country)).collect();
        Self { countries: RwLock::new(countries) }
    }
}

#[async_trait]
impl CountryRepository for InMemoryCountryRepository {
    async fn get_by_code(&self, code: &str) -> Result<Country, DomainError> {
        self.countries
            .read()
            .await
            .values()
            .find(|country| country.matches_code(code))
            .cloned()
            .ok_or_else(|| DomainError::not_found("country", format!("country `{code}` not found")))
    }
}

/// Directional rates keyed `SOURCE:TARGET`.
#[derive(Default)]
pub struct InMemoryExchangeRateRepository {
    rates: RwLock<HashMap<String, ExchangeRate>>,
}

impl InMemoryExchangeRateRepository {
    pub fn from_records(records: impl IntoIterator<Item = ExchangeRate>) -> Self {
        let rates = records
            .into_iter()
            .map(|rate| (pair_key(&rate.source_currency, &rate.target_currency), rate))
            .collect();
        Self { rates: RwLock::new(rates) }
    }
}

#[async_trait]
impl ExchangeRateRepository for InMemoryExchangeRateRepository {
    async fn find_rate(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, DomainError> {
        Ok(self.rates.read().await.get(&pair_key(from, to)).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryCarbonFactorRepository {
    factors: RwLock<HashMap<String, CarbonFactor>>,
}

impl InMemoryCarbonFactorRepository {
    pub fn from_records(records: impl IntoIterator<Item = CarbonFactor>) -> Self {
        let factors = records
            .into_iter()
            .map(|factor| (pair_key(&factor.merchant_category_code, &factor.country_id.0), factor))
            .collect();
        Self { factors: RwLock::new(factors) }
    }
}

#[async_trait]
impl CarbonFactorRepository for InMemoryCarbonFactorRepository {
    async fn find_factor(
        &self,
        merchant_category_code: &str,
        country_id: &CountryId,
    ) -> Result<Option<CarbonFactor>, DomainError> {
        let key = pair_key(merchant_category_code, &country_id.0);
        Ok(self.factors.read().await.get(&key).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryFootprintRepository {
    footprints: RwLock<HashMap<String, Footprint>>,
}

impl InMemoryFootprintRepository {
    pub async fn count(&self) -> usize {
        self.footprints.read().await.len()
    }
}

#[async_trait]
impl FootprintRepository for InMemoryFootprintRepository {
    async fn create(&self, footprint: Footprint) -> Result<Footprint, DomainError> {
        let mut footprints = self.footprints.write().await;
        if footprints.contains_key(footprint.id.as_str()) {
            return Err(DomainError::validation(
                "footprint",
                format!("footprint {} already exists", footprint.id.0),
            ));
        }
        footprints.insert(footprint.id.0.clone(), footprint.clone());
        Ok(footprint)
    }

    async fn get_by_id(&self, id: &FootprintId) -> Result<Footprint, DomainError> {
        self.footprints
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| missing("footprint", id.as_str()))
    }
}

#[derive(Default)]
pub struct InMemoryFeeConfigRepository {
    configs: RwLock<HashMap<String, FeeConfig>>,
}

impl InMemoryFeeConfigRepository {
    pub fn from_records(records: impl IntoIterator<Item = FeeConfig>) -> Self {
        let configs =
            records.into_iter().map(|config| (config.organisation_id.0.clone(), config)).collect();
        Self { configs: RwLock::new(configs) }
    }
}

#[async_trait]
impl FeeConfigRepository for InMemoryFeeConfigRepository {
    async fn find_fee_config(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<Option<FeeConfig>, DomainError> {
        Ok(self.configs.read().await.get(organisation_id.as_str()).cloned())
    }
}

/// Tax rates keyed on the customer location, `COUNTRY:STATE` (empty state for the
/// country-wide record).
#[derive(Default)]
pub struct InMemoryTaxRateRepository {
    rates: RwLock<HashMap<String, TaxRate>>,
}

impl InMemoryTaxRateRepository {
    pub fn from_records(records: impl IntoIterator<Item = TaxRate>) -> Self {
        let rates = records
            .into_iter()
            .map(|rate| {
                let state = rate.customer_state.clone().unwrap_or_default();
                (pair_key(&rate.customer_country, &state), rate)
            })
            .collect();
        Self { rates: RwLock::new(rates) }
    }
}

#[async_trait]
impl TaxRateRepository for InMemoryTaxRateRepository {
    async fn find_tax_rate(
        &self,
        country: &str,
        state: Option<&str>,
    ) -> Result<Option<TaxRate>, DomainError> {
        let key = pair_key(country, state.unwrap_or_default());
        Ok(self.rates.read().await.get(&key).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryImpactPartnerRepository {
    partners: RwLock<HashMap<String, ImpactPartner>>,
}

impl InMemoryImpactPartnerRepository {
    pub fn from_records(records: impl IntoIterator<Item = ImpactPartner>) -> Self {
        let partners =
            records.into_iter().map(|partner| (partner.id.0.clone(), partner)).collect();
        Self { partners: RwLock::new(partners) }
    }
}

#[async_trait]
impl ImpactPartnerRepository for InMemoryImpactPartnerRepository {
    async fn get_by_id(&self, id: &PartnerId) -> Result<ImpactPartner, DomainError> {
        self.partners
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| missing("impact_partner", id.as_str()))
    }
}

#[derive(Default)]
pub struct InMemoryImpactProjectRepository {
    projects: RwLock<HashMap<String, ImpactProject>>,
}

impl InMemoryImpactProjectRepository {
    pub fn from_records(records: impl IntoIterator<Item = ImpactProject>) -> Self {
        let projects =
            records.into_iter().map(|project| (project.id.0.clone(), project)).collect();
        Self { projects: RwLock::new(projects) }
    }
}

#[async_trait]
impl ImpactProjectRepository for InMemoryImpactProjectRepository {
    async fn list_by_partner(
        &self,
        partner: &PartnerId,
    ) -> Result<Vec<ImpactProject>, DomainError> {
        let mut projects: Vec<ImpactProject> = self
            .projects
            .read()
            .await
            .values()
            .filter(|project| project.partner_id == *partner)
            .cloned()
            .collect();
        projects.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(projects)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl InMemoryQuoteRepository {
    pub async fn count(&self) -> usize {
        self.quotes.read().await.len()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: Quote) -> Result<Quote, DomainError> {
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(quote.id.as_str()) {
            let message = format!("quote {} already exists", quote.id);
            return Err(DomainError::validation("quote", message));
        }
        quotes.insert(quote.id.0.clone(), quote.clone());
        Ok(quote)
    }

    async fn get_by_id(&self, id: &QuoteId) -> Result<Quote, DomainError> {
        self.quotes
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| missing("quote", id))
    }

    async fn update(&self, quote: Quote) -> Result<Quote, DomainError> {
        let mut quotes = self.quotes.write().await;
        match quotes.get_mut(quote.id.as_str()) {
            Some(stored) => {
                *stored = quote.clone();
                Ok(quote)
            }
            None => Err(missing("quote", &quote.id)),
        }
    }
}

/// One in-memory store per port. Cloning shares the underlying stores.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    pub organisations: Arc<InMemoryOrganisationRepository>,
    pub customers: Arc<InMemoryCustomerRepository>,
    pub countries: Arc<InMemoryCountryRepository>,
    pub exchange_rates: Arc<InMemoryExchangeRateRepository>,
    pub carbon_factors: Arc<InMemoryCarbonFactorRepository>,
    pub footprints: Arc<InMemoryFootprintRepository>,
    pub fee_configs: Arc<InMemoryFeeConfigRepository>,
    pub tax_rates: Arc<InMemoryTaxRateRepository>,
    pub partners: Arc<InMemoryImpactPartnerRepository>,
    pub projects: Arc<InMemoryImpactProjectRepository>,
    pub quotes: Arc<InMemoryQuoteRepository>,
}

impl MemoryCatalog {
    pub fn dependencies(&self) -> QuoteDependencies {
        self.dependencies_with_quotes(self.quotes.clone())
    }

    /// Same lookup tables, quotes persisted elsewhere.
    pub fn dependencies_with_quotes(
        &self,
        quotes: Arc<dyn QuoteRepository>,
    ) -> QuoteDependencies {
        let allocation: Arc<dyn AllocationStrategy> = Arc::new(EqualAllocation);
        QuoteDependencies {
            organisations: self.organisations.clone(),
            customers: self.customers.clone(),
            countries: self.countries.clone(),
            exchange_rates: self.exchange_rates.clone(),
            carbon_factors: self.carbon_factors.clone(),
            footprints: self.footprints.clone(),
            fee_configs: self.fee_configs.clone(),
            tax_rates: self.tax_rates.clone(),
            partners: self.partners.clone(),
            projects: self.projects.clone(),
            quotes,
            allocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use carbonquote_core::domain::customer::{Customer, CustomerId, CustomerLocation};
    use carbonquote_core::domain::organisation::OrganisationId;
    use carbonquote_core::domain::partner::PartnerId;
    use carbonquote_core::domain::quote::{QuoteId, QuoteStatus};
    use carbonquote_core::errors::ErrorKind;
    use carbonquote_core::ports::{
        CountryRepository, CustomerRepository, ExchangeRateRepository, ImpactProjectRepository,
        OrganisationRepository, QuoteRepository, TaxRateRepository,
    };

    use super::InMemoryCustomerRepository;
    use crate::fixtures::{sample_catalog, sample_quote};

    fn customer(org: &str, reference: &str) -> Customer {
        Customer::new(
            OrganisationId::new(org),
            reference,
            CustomerLocation { country: "GBR".to_string(), ..CustomerLocation::default() },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn customer_is_reachable_by_id_and_reference() {
        let repo = InMemoryCustomerRepository::default();
        let created = repo.create(customer("org-1", "ref-1")).await.expect("create");

        let by_id = repo.get_by_id(&created.id).await.expect("by id");
        let by_reference =
            repo.get_by_reference(&OrganisationId::new("org-1"), "ref-1").await.expect("by ref");

        assert_eq!(by_id, created);
        assert_eq!(by_reference, created);
    }

    #[tokio::test]
    async fn duplicate_customer_reference_is_rejected() {
        let repo = InMemoryCustomerRepository::default();
        repo.create(customer("org-1", "ref-1")).await.expect("first");

        let error = repo.create(customer("org-1", "ref-1")).await.expect_err("duplicate");
        assert_eq!(error.kind(), ErrorKind::Validation);

        repo.create(customer("org-2", "ref-1")).await.expect("other organisation");
    }

    #[tokio::test]
    async fn missing_customer_is_not_found() {
        let repo = InMemoryCustomerRepository::default();
        let error = repo
            .get_by_id(&CustomerId("missing".to_string()))
            .await
            .expect_err("no such customer");
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn country_lookup_accepts_both_iso_codes() {
        let catalog = sample_catalog().expect("sample catalog");

        let by_alpha3 = catalog.countries.get_by_code("GBR").await.expect("alpha-3");
        let by_alpha2 = catalog.countries.get_by_code("gb").await.expect("alpha-2");

        assert_eq!(by_alpha3, by_alpha2);
        assert!(catalog.countries.get_by_code("ATA").await.expect_err("unknown").is_not_found());
    }

    #[tokio::test]
    async fn exchange_rates_are_directional() {
        let catalog = sample_catalog().expect("sample catalog");

        let gbp = catalog.exchange_rates.find_rate("GBP", "EUR").await.expect("lookup");
        let reverse = catalog.exchange_rates.find_rate("EUR", "GBP").await.expect("lookup");

        assert_eq!(gbp.map(|rate| rate.rate), Some(Decimal::new(117, 2)));
        assert!(reverse.is_none());
    }

    #[tokio::test]
    async fn tax_rates_are_keyed_on_customer_state() {
        let catalog = sample_catalog().expect("sample catalog");

        let california = catalog.tax_rates.find_tax_rate("USA", Some("CA")).await.expect("ca");
        let national = catalog.tax_rates.find_tax_rate("USA", None).await.expect("usa");
        let oregon = catalog.tax_rates.find_tax_rate("USA", Some("OR")).await.expect("or");

        assert_eq!(california.map(|rate| rate.carbon_credit_rate), Some(Decimal::new(725, 4)));
        assert_eq!(national.map(|rate| rate.carbon_credit_rate), Some(Decimal::ZERO));
        assert!(oregon.is_none());
    }

    #[tokio::test]
    async fn partner_projects_are_listed_in_id_order() {
        let catalog = sample_catalog().expect("sample catalog");
        let projects =
            catalog.projects.list_by_partner(&PartnerId::new("partner-1")).await.expect("list");

        let ids: Vec<&str> = projects.iter().map(|project| project.id.as_str()).collect();
        assert_eq!(ids, vec!["project-1", "project-4", "project-5"]);
    }

    #[tokio::test]
    async fn children_of_parent_are_listed() {
        let catalog = sample_catalog().expect("sample catalog");
        let children = catalog
            .organisations
            .list_children(&OrganisationId::new("org-parent-1"))
            .await
            .expect("children");

        let ids: Vec<&str> = children.iter().map(|org| org.id.as_str()).collect();
        assert_eq!(ids, vec!["org-child-1", "org-child-2"]);
    }

    #[tokio::test]
    async fn quote_store_creates_updates_and_rejects_duplicates() {
        let catalog = sample_catalog().expect("sample catalog");
        let quote = sample_quote("quote-1");

        catalog.quotes.create(quote.clone()).await.expect("create");
        let duplicate = catalog.quotes.create(quote.clone()).await.expect_err("duplicate");
        assert_eq!(duplicate.kind(), ErrorKind::Validation);

        let mut accepted = quote.clone();
        accepted.transition_to(QuoteStatus::Accepted, Utc::now()).expect("transition");
        catalog.quotes.update(accepted).await.expect("update");

        let stored = catalog.quotes.get_by_id(&quote.id).await.expect("stored");
        assert_eq!(stored.status, QuoteStatus::Accepted);
        assert_eq!(catalog.quotes.count().await, 1);
    }

    #[tokio::test]
    async fn updating_unknown_quote_is_not_found() {
        let catalog = sample_catalog().expect("sample catalog");
        let error = catalog.quotes.update(sample_quote("ghost")).await.expect_err("unknown");
        assert!(error.is_not_found());

        let error =
            catalog.quotes.get_by_id(&QuoteId("ghost".to_string())).await.expect_err("get");
        assert!(error.is_not_found());
    }
}
