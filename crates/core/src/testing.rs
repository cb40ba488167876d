//! In-process port doubles shared by the service and orchestrator tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::carbon::{CarbonFactor, Footprint, FootprintId};
use crate::domain::country::{Country, CountryId, WILDCARD};
use crate::domain::currency::ExchangeRate;
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::fee::FeeConfig;
use crate::domain::organisation::{Address, Organisation, OrganisationId};
use crate::domain::partner::{ImpactPartner, ImpactProject, PartnerId, ProjectId};
use crate::domain::quote::{Quote, QuoteId};
use crate::domain::tax::TaxRate;
use crate::errors::DomainError;
use crate::ports::{
    CarbonFactorRepository, CountryRepository, CustomerRepository, ExchangeRateRepository,
    FeeConfigRepository, FootprintRepository, ImpactPartnerRepository, ImpactProjectRepository,
    OrganisationRepository, QuoteRepository, TaxRateRepository,
};

#[derive(Default)]
pub struct StubCatalog {
    pub organisations: Vec<Organisation>,
    pub countries: Vec<Country>,
    pub rates: Vec<ExchangeRate>,
    pub factors: Vec<CarbonFactor>,
    pub fee_configs: Vec<FeeConfig>,
    pub tax_rates: Vec<TaxRate>,
    pub partners: Vec<ImpactPartner>,
    pub projects: Vec<ImpactProject>,
    pub customers: Mutex<Vec<Customer>>,
    pub footprints: Mutex<HashMap<String, Footprint>>,
    pub quotes: Mutex<HashMap<String, Quote>>,
    pub fail_quote_writes: bool,
}

pub fn organisation(id: &str, parent: Option<&str>, partners: &[&str]) -> Organisation {
    let mut org = Organisation::new(
        OrganisationId::new(id),
        format!("{id} name"),
        "EUR",
        Address {
            address1: "1 High Street".to_string(),
            city: "London".to_string(),
            postal_code: "EC1A 1BB".to_string(),
            country: "GBR".to_string(),
            ..Address::default()
        },
        Utc::now(),
    );
    if let Some(parent) = parent {
        org.assign_parent(OrganisationId::new(parent)).expect("stub parent");
    }
    org.merchant_category_code = Some("5812".to_string());
    org.impact_partner_ids = partners.iter().map(|id| PartnerId::new(*id)).collect();
    org
}

fn country(id: &str, iso2: &str, iso3: &str, currency: &str) -> Country {
    Country {
        id: CountryId::new(id),
        iso2: iso2.to_string(),
        iso3: iso3.to_string(),
        name: iso3.to_string(),
        currency: currency.to_string(),
        is_eu: false,
    }
}

pub fn factor(mcc: &str, country: &str, value: Decimal) -> CarbonFactor {
    CarbonFactor {
        merchant_category_code: mcc.to_string(),
        country_id: CountryId::new(country),
        factor: value,
        description: format!("{mcc}:{country}"),
    }
}

pub fn rate(from: &str, to: &str, value: Decimal) -> ExchangeRate {
    let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
    ExchangeRate {
        source_currency: from.to_string(),
        target_currency: to.to_string(),
        rate: value,
        conversion_date: since,
        valid_from: since,
        valid_to: None,
    }
}

pub fn project(
    id: &str,
    partner: &str,
    price: Decimal,
    country: &str,
    region: &str,
) -> ImpactProject {
    ImpactProject {
        id: ProjectId::new(id),
        partner_id: PartnerId::new(partner),
        name: format!("{id} name"),
        unit_price: price,
        country: country.to_string(),
        region: Some(region.to_string()),
    }
}

pub fn tax_rate(country: &str, state: Option<&str>, carbon: Decimal, fee: Decimal) -> TaxRate {
    TaxRate {
        merchant_country: None,
        merchant_state: None,
        customer_country: country.to_string(),
        customer_state: state.map(str::to_string),
        carbon_credit_rate: carbon,
        service_fee_rate: fee,
    }
}

impl StubCatalog {
    /// Small fixed world: a parent with one child and one unrelated organisation, two
    /// partners (only `p1` has a partner record) and a GBP/EUR rate of 1.25.
    pub fn seeded() -> Self {
        Self {
            organisations: vec![
                organisation("org-parent", None, &["p1", "p2"]),
                organisation("org-child", Some("org-parent"), &["p1"]),
                organisation("org-other", Some("org-elsewhere"), &["p2"]),
            ],
            countries: vec![
                country("1", "GB", "GBR", "GBP"),
                country("2", "IE", "IRL", "EUR"),
                country("5", "US", "USA", "USD"),
            ],
            rates: vec![rate("GBP", "EUR", Decimal::new(125, 2))],
            factors: vec![
                factor(WILDCARD, WILDCARD, Decimal::new(2, 1)),
                factor("5812", WILDCARD, Decimal::new(5, 1)),
                factor("5812", "1", Decimal::new(4, 1)),
            ],
            fee_configs: vec![FeeConfig {
                organisation_id: OrganisationId::new("org-parent"),
                fee_percentage: Decimal::new(10, 2),
                minimum_fee: Decimal::new(50, 2),
                maximum_fee: Decimal::from(2),
            }],
            tax_rates: vec![
                tax_rate("GBR", None, Decimal::new(20, 2), Decimal::new(20, 2)),
                tax_rate("USA", Some("CA"), Decimal::ZERO, Decimal::new(725, 4)),
                tax_rate("USA", None, Decimal::ZERO, Decimal::ZERO),
            ],
            partners: vec![ImpactPartner {
                id: PartnerId::new("p1"),
                name: "Peat Trust".to_string(),
                short_description: Some("Peatland restoration".to_string()),
                description: Some("Restores upland peat bogs".to_string()),
                logo_url: Some("https://example.com/peat.png".to_string()),
                website: None,
            }],
            projects: vec![
                project("proj-a", "p1", Decimal::new(20, 3), "GBR", "Scotland"),
                project("proj-c", "p1", Decimal::new(40, 3), "IRL", "Connacht"),
                project("proj-b", "p2", Decimal::new(10, 3), "BRA", "Para"),
            ],
            ..Self::default()
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.lock().expect("quotes lock").len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().expect("customers lock").len()
    }
}

fn not_found(domain: &'static str, id: &str) -> DomainError {
    DomainError::not_found(domain, format!("{domain} {id} not found"))
}

#[async_trait]
impl OrganisationRepository for StubCatalog {
    async fn get_by_id(&self, id: &OrganisationId) -> Result<Organisation, DomainError> {
        self.organisations
            .iter()
            .find(|org| org.id == *id)
            .cloned()
            .ok_or_else(|| not_found("organisation", id.as_str()))
    }

    async fn list_children(
        &self,
        parent: &OrganisationId,
    ) -> Result<Vec<Organisation>, DomainError> {
        Ok(self.organisations.iter().filter(|org| org.is_child_of(parent)).cloned().collect())
    }
}

#[async_trait]
impl CustomerRepository for StubCatalog {
    async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, DomainError> {
        let customers = self.customers.lock().expect("customers lock");
        customers
            .iter()
            .find(|customer| customer.id == *id)
            .cloned()
            .ok_or_else(|| not_found("customer", id.as_str()))
    }

    async fn get_by_reference(
        &self,
        organisation_id: &OrganisationId,
        reference: &str,
    ) -> Result<Customer, DomainError> {
        let customers = self.customers.lock().expect("customers lock");
        customers
            .iter()
            .find(|customer| {
                customer.organisation_id == *organisation_id && customer.reference == reference
            })
            .cloned()
            .ok_or_else(|| not_found("customer", reference))
    }

    async fn create(&self, customer: Customer) -> Result<Customer, DomainError> {
        let mut customers = self.customers.lock().expect("customers lock");
        if customers.iter().any(|existing| existing.id == customer.id) {
            return Err(DomainError::validation("customer", "customer already exists"));
        }
        customers.push(customer.clone());
        Ok(customer)
    }
}

#[async_trait]
impl CountryRepository for StubCatalog {
    async fn get_by_code(&self, code: &str) -> Result<Country, DomainError> {
        self.countries
            .iter()
            .find(|country| country.matches_code(code))
            .cloned()
            .ok_or_else(|| not_found("country", code))
    }
}

#[async_trait]
impl ExchangeRateRepository for StubCatalog {
    async fn find_rate(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, DomainError> {
        Ok(self
            .rates
            .iter()
            .find(|rate| rate.source_currency == from && rate.target_currency == to)
            .cloned())
    }
}

#[async_trait]
impl CarbonFactorRepository for StubCatalog {
    async fn find_factor(
        &self,
        merchant_category_code: &str,
        country_id: &CountryId,
    ) -> Result<Option<CarbonFactor>, DomainError> {
        Ok(self
            .factors
            .iter()
            .find(|factor| {
                factor.merchant_category_code == merchant_category_code
                    && factor.country_id == *country_id
            })
            .cloned())
    }
}

#[async_trait]
impl FootprintRepository for StubCatalog {
    async fn create(&self, footprint: Footprint) -> Result<Footprint, DomainError> {
        let mut footprints = self.footprints.lock().expect("footprints lock");
        footprints.insert(footprint.id.0.clone(), footprint.clone());
        Ok(footprint)
    }

    async fn get_by_id(&self, id: &FootprintId) -> Result<Footprint, DomainError> {
        let footprints = self.footprints.lock().expect("footprints lock");
        footprints.get(id.as_str()).cloned().ok_or_else(|| not_found("footprint", id.as_str()))
    }
}

#[async_trait]
impl FeeConfigRepository for StubCatalog {
    async fn find_fee_config(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<Option<FeeConfig>, DomainError> {
        Ok(self
            .fee_configs
            .iter()
            .find(|config| config.organisation_id == *organisation_id)
            .cloned())
    }
}

#[async_trait]
impl TaxRateRepository for StubCatalog {
    async fn find_tax_rate(
        &self,
        country: &str,
        state: Option<&str>,
    ) -> Result<Option<TaxRate>, DomainError> {
        Ok(self
            .tax_rates
            .iter()
            .find(|rate| {
                rate.customer_country == country && rate.customer_state.as_deref() == state
            })
            .cloned())
    }
}

#[async_trait]
impl ImpactPartnerRepository for StubCatalog {
    async fn get_by_id(&self, id: &PartnerId) -> Result<ImpactPartner, DomainError> {
        self.partners
            .iter()
            .find(|partner| partner.id == *id)
            .cloned()
            .ok_or_else(|| not_found("impact_partner", id.as_str()))
    }
}

#[async_trait]
impl ImpactProjectRepository for StubCatalog {
    async fn list_by_partner(
        &self,
        partner: &PartnerId,
    ) -> Result<Vec<ImpactProject>, DomainError> {
        let mut projects: Vec<ImpactProject> = self
            .projects
            .iter()
            .filter(|project| project.partner_id == *partner)
            .cloned()
            .collect();
        projects.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(projects)
    }
}

#[async_trait]
impl QuoteRepository for StubCatalog {
    async fn create(&self, quote: Quote) -> Result<Quote, DomainError> {
        if self.fail_quote_writes {
            return Err(DomainError::internal("quote", "storing quote", "disk full"));
        }
        let mut quotes = self.quotes.lock().expect("quotes lock");
        quotes.insert(quote.id.0.clone(), quote.clone());
        Ok(quote)
    }

    async fn get_by_id(&self, id: &QuoteId) -> Result<Quote, DomainError> {
        let quotes = self.quotes.lock().expect("quotes lock");
        quotes.get(id.as_str()).cloned().ok_or_else(|| not_found("quote", id.as_str()))
    }

    async fn update(&self, quote: Quote) -> Result<Quote, DomainError> {
        let mut quotes = self.quotes.lock().expect("quotes lock");
        if !quotes.contains_key(quote.id.as_str()) {
            return Err(not_found("quote", quote.id.as_str()));
        }
        quotes.insert(quote.id.0.clone(), quote.clone());
        Ok(quote)
    }
}
