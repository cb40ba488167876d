//! Deterministic sample data for local runs and integration tests.
//!
//! One parent bank (`org-parent-1`) with two subsidiaries, seven countries, MCC emission
//! factors, EUR cross rates, per-organisation fee configuration, destination sales tax
//! rates and three impact partners with their projects.
//!
//! Project prices are per kg CO2e in EUR (`0.015` is 15.00 EUR per tonne).

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use carbonquote_core::domain::carbon::{CarbonFactor, FootprintId};
use carbonquote_core::domain::country::{Country, CountryId, WILDCARD};
use carbonquote_core::domain::currency::ExchangeRate;
use carbonquote_core::domain::customer::CustomerId;
use carbonquote_core::domain::fee::FeeConfig;
use carbonquote_core::domain::money::Money;
use carbonquote_core::domain::organisation::{Address, Organisation, OrganisationId};
use carbonquote_core::domain::partner::{ImpactPartner, ImpactProject, PartnerId, ProjectId};
use carbonquote_core::domain::quote::{
    ContributionDetails, OrderItem, PartnerContribution, Quote, QuoteId, QuoteStatus, API_PRODUCT,
};
use carbonquote_core::domain::tax::TaxRate;
use carbonquote_core::errors::DomainError;

use crate::repositories::memory::{
    InMemoryCarbonFactorRepository, InMemoryCountryRepository, InMemoryExchangeRateRepository,
    InMemoryFeeConfigRepository, InMemoryImpactPartnerRepository, InMemoryImpactProjectRepository,
    InMemoryOrganisationRepository, InMemoryTaxRateRepository, MemoryCatalog,
};

pub const SAMPLE_PARENT_ORGANISATION: &str = "org-parent-1";

/// Builds a catalog whose lookup tables hold the sample data and whose writable stores
/// (customers, footprints, quotes) start empty.
pub fn sample_catalog() -> Result<MemoryCatalog, DomainError> {
    Ok(MemoryCatalog {
        organisations: InMemoryOrganisationRepository::from_records(sample_organisations()?)
            .into(),
        countries: InMemoryCountryRepository::from_records(sample_countries()).into(),
        exchange_rates: InMemoryExchangeRateRepository::from_records(sample_exchange_rates())
            .into(),
        carbon_factors: InMemoryCarbonFactorRepository::from_records(sample_carbon_factors())
            .into(),
        fee_configs: InMemoryFeeConfigRepository::from_records(sample_fee_configs()).into(),
        tax_rates: InMemoryTaxRateRepository::from_records(sample_tax_rates()).into(),
        partners: InMemoryImpactPartnerRepository::from_records(sample_partners()).into(),
        projects: InMemoryImpactProjectRepository::from_records(sample_projects()).into(),
        ..MemoryCatalog::default()
    })
}

fn address(line: &str, city: &str, postal_code: &str, country: &str) -> Address {
    Address {
        address1: line.to_string(),
        city: city.to_string(),
        postal_code: postal_code.to_string(),
        country: country.to_string(),
        ..Address::default()
    }
}

fn bank(
    id: &str,
    name: &str,
    legal_name: &str,
    address: Address,
    partners: &[&str],
) -> Organisation {
    let mut organisation =
        Organisation::new(OrganisationId::new(id), name, "EUR", address, Utc::now());
    organisation.legal_name = legal_name.to_string();
    organisation.merchant_category_code = Some("6011".to_string());
    organisation.service_fee_percentage = Decimal::new(5, 2);
    organisation.impact_partner_ids = partners.iter().map(|id| PartnerId::new(*id)).collect();
    organisation
}

pub fn sample_organisations() -> Result<Vec<Organisation>, DomainError> {
    let parent = bank(
        SAMPLE_PARENT_ORGANISATION,
        "Acme Bank",
        "Acme Bank PLC",
        address("100 Bank Street", "London", "EC1A 1BB", "GBR"),
        &["partner-1", "partner-2"],
    );

    let mut ireland = bank(
        "org-child-1",
        "Acme Bank Ireland",
        "Acme Bank Ireland Ltd",
        address("50 Finance Street", "Dublin", "D02", "IRL"),
        &["partner-1"],
    );
    ireland.assign_parent(parent.id.clone())?;

    let mut germany = bank(
        "org-child-2",
        "Acme Bank Germany",
        "Acme Bank Germany GmbH",
        address("25 Bankstrasse", "Berlin", "10115", "DEU"),
        &["partner-1", "partner-2"],
    );
    germany.assign_parent(parent.id.clone())?;

    Ok(vec![parent, ireland, germany])
}

fn country(id: &str, iso2: &str, iso3: &str, name: &str, currency: &str, is_eu: bool) -> Country {
    Country {
        id: CountryId::new(id),
        iso2: iso2.to_string(),
        iso3: iso3.to_string(),
        name: name.to_string(),
        currency: currency.to_string(),
        is_eu,
    }
}

pub fn sample_countries() -> Vec<Country> {
    vec![
        country("1", "GB", "GBR", "United Kingdom", "GBP", false),
        country("2", "IE", "IRL", "Ireland", "EUR", true),
        country("3", "DE", "DEU", "Germany", "EUR", true),
        country("4", "FR", "FRA", "France", "EUR", true),
        country("5", "US", "USA", "United States", "USD", false),
        country("6", "NL", "NLD", "Netherlands", "EUR", true),
        country("7", "ES", "ESP", "Spain", "EUR", true),
    ]
}

/// Rates into EUR, valid from a day before seeding with no end date.
pub fn sample_exchange_rates() -> Vec<ExchangeRate> {
    let now = Utc::now();
    let rates = [
        ("GBP", 117, 2),
        ("USD", 92, 2),
        ("CHF", 105, 2),
        ("SEK", 88, 3),
        ("NOK", 86, 3),
        ("DKK", 134, 3),
    ];
    rates
        .into_iter()
        .map(|(currency, mantissa, scale)| ExchangeRate {
            source_currency: currency.to_string(),
            target_currency: "EUR".to_string(),
            rate: Decimal::new(mantissa, scale),
            conversion_date: now,
            valid_from: now - Duration::days(1),
            valid_to: None,
        })
        .collect()
}

fn factor(mcc: &str, country_id: &str, value: Decimal, description: &str) -> CarbonFactor {
    CarbonFactor {
        merchant_category_code: mcc.to_string(),
        country_id: CountryId::new(country_id),
        factor: value,
        description: description.to_string(),
    }
}

/// kg CO2e per EUR spent. Every factor applies to all countries.
pub fn sample_carbon_factors() -> Vec<CarbonFactor> {
    vec![
        factor(WILDCARD, WILDCARD, Decimal::new(23, 2), "Average spend"),
        factor("4511", WILDCARD, Decimal::new(12, 1), "Airlines"),
        factor("5812", WILDCARD, Decimal::new(35, 2), "Restaurants"),
        factor("5541", WILDCARD, Decimal::new(25, 1), "Gas stations"),
        factor("5411", WILDCARD, Decimal::new(18, 2), "Grocery stores"),
        factor("6011", WILDCARD, Decimal::new(5, 2), "Banks/Financial"),
        factor("5732", WILDCARD, Decimal::new(45, 2), "Electronics"),
        factor("5651", WILDCARD, Decimal::new(40, 2), "Clothing"),
    ]
}

pub fn sample_fee_configs() -> Vec<FeeConfig> {
    let config = |org: &str, percentage: i64, minimum: i64, maximum: i64| FeeConfig {
        organisation_id: OrganisationId::new(org),
        fee_percentage: Decimal::new(percentage, 2),
        minimum_fee: Decimal::new(minimum, 2),
        maximum_fee: Decimal::new(maximum, 2),
    };

    vec![
        config(SAMPLE_PARENT_ORGANISATION, 10, 1, 1000),
        config("org-child-1", 8, 1, 500),
        config("org-child-2", 12, 2, 1500),
    ]
}

fn tax_rate(country: &str, state: Option<&str>, rate: Decimal) -> TaxRate {
    TaxRate {
        merchant_country: Some(country.to_string()),
        merchant_state: state.map(str::to_string),
        customer_country: country.to_string(),
        customer_state: state.map(str::to_string),
        carbon_credit_rate: rate,
        service_fee_rate: Decimal::ZERO,
    }
}

pub fn sample_tax_rates() -> Vec<TaxRate> {
    vec![
        tax_rate("GBR", None, Decimal::new(20, 2)),
        tax_rate("DEU", None, Decimal::new(19, 2)),
        tax_rate("FRA", None, Decimal::new(20, 2)),
        tax_rate("IRL", None, Decimal::new(23, 2)),
        tax_rate("NLD", None, Decimal::new(21, 2)),
        tax_rate("ESP", None, Decimal::new(21, 2)),
        tax_rate("USA", Some("CA"), Decimal::new(725, 4)),
        tax_rate("USA", Some("NY"), Decimal::new(8, 2)),
        tax_rate("USA", Some("TX"), Decimal::new(625, 4)),
        tax_rate("USA", None, Decimal::ZERO),
    ]
}

pub fn sample_partners() -> Vec<ImpactPartner> {
    let partner = |id: &str, name: &str, summary: &str, description: &str, logo: &str| {
        ImpactPartner {
            id: PartnerId::new(id),
            name: name.to_string(),
            short_description: Some(summary.to_string()),
            description: Some(description.to_string()),
            logo_url: Some(format!("https://example.com/{logo}-logo.png")),
            website: None,
        }
    };

    vec![
        partner(
            "partner-1",
            "Green Carbon Trust",
            "Leading carbon offset certification body",
            "Certifies carbon offsets for environmental and social impact.",
            "goldstandard",
        ),
        partner(
            "partner-2",
            "Ocean Conservation Fund",
            "Climate action through reforestation",
            "Funds reforestation and ecosystem restoration projects worldwide.",
            "ekko",
        ),
        partner(
            "partner-3",
            "Green Energy Co",
            "Renewable energy solutions",
            "Provides renewable energy certificates and carbon reduction projects.",
            "greenenergy",
        ),
    ]
}

fn project(
    id: &str,
    partner: &str,
    name: &str,
    price_per_kg: Decimal,
    country: &str,
    region: &str,
) -> ImpactProject {
    ImpactProject {
        id: ProjectId::new(id),
        partner_id: PartnerId::new(partner),
        name: name.to_string(),
        unit_price: price_per_kg,
        country: country.to_string(),
        region: Some(region.to_string()),
    }
}

pub fn sample_projects() -> Vec<ImpactProject> {
    vec![
        project(
            "project-1",
            "partner-1",
            "Amazon Rainforest Conservation",
            Decimal::new(15, 3),
            "BRA",
            "South America",
        ),
        project(
            "project-2",
            "partner-2",
            "Solar Farm Initiative India",
            Decimal::new(85, 4),
            "IND",
            "Asia",
        ),
        project(
            "project-3",
            "partner-2",
            "Wind Energy Project Denmark",
            Decimal::new(10, 3),
            "DNK",
            "Europe",
        ),
        project(
            "project-4",
            "partner-1",
            "Mangrove Restoration Program",
            Decimal::new(22, 3),
            "VNM",
            "Southeast Asia",
        ),
        project(
            "project-5",
            "partner-1",
            "Flow Country Peatland Restoration",
            Decimal::new(25, 3),
            "GBR",
            "Scotland",
        ),
    ]
}

/// A pending quote with one order item and a single-partner contribution, for store tests.
pub fn sample_quote(id: &str) -> Quote {
    let now = Utc::now();
    Quote {
        id: QuoteId(id.to_string()),
        quote_reference: format!("ref-{id}"),
        calculation_reference: FootprintId(format!("fp-{id}")),
        organisation_id: OrganisationId::new(SAMPLE_PARENT_ORGANISATION),
        customer_id: CustomerId(format!("cust-{id}")),
        currency: "EUR".to_string(),
        total_amount: Decimal::new(11, 2),
        impact_amount: Decimal::new(8, 2),
        impact_sales_tax_amount: Decimal::new(2, 2),
        impact_sales_tax_rate: Decimal::new(20, 2),
        service_fee_amount: Decimal::new(1, 2),
        service_fee_sales_tax_amount: Decimal::ZERO,
        service_fee_sales_tax_rate: Decimal::new(20, 2),
        round_up_amount: Decimal::ZERO,
        price_per_tonne: Decimal::new(161, 1),
        service_fee_share: Decimal::new(10, 2),
        contribution: ContributionDetails {
            impact_percentage: Decimal::new(8, 2) / Decimal::new(11, 2),
            impact_sales_tax_percentage: Decimal::new(2, 2) / Decimal::new(11, 2),
            service_fee_percentage: Decimal::new(1, 2) / Decimal::new(11, 2),
            service_fee_sales_tax_percentage: Decimal::ZERO,
            partners: vec![PartnerContribution {
                partner_id: PartnerId::new("partner-1"),
                impact_percentage: Decimal::ONE,
                impact_sales_tax_percentage: Decimal::new(20, 2),
                service_fee_percentage: Decimal::ONE,
                service_fee_sales_tax_percentage: Decimal::new(20, 2),
                project_ids: vec![ProjectId::new("project-1"), ProjectId::new("project-5")],
            }],
        },
        order_items: vec![OrderItem {
            item_id: "item-1".to_string(),
            sku: Some("SKU-1".to_string()),
            name: "Dinner".to_string(),
            category: "restaurants".to_string(),
            quantity: 1,
            unit_price: Money::new(Decimal::new(10000, 2), "EUR"),
        }],
        customer_location_filter: false,
        include_partner_detail: true,
        include_project_detail: false,
        product: API_PRODUCT.to_string(),
        is_merchant_tax_liable: false,
        status: QuoteStatus::Pending,
        expires_at: now + Duration::hours(24),
        created_at: now,
        updated_at: now,
    }
}
