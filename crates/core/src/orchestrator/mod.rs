//! Turns a quote request into a priced, taxed and persisted quote.
//!
//! The pipeline is strictly sequential: organisation, customer, merchant country, amount,
//! currency, footprint, blended price, price conversion, impact, fee, tax, totals,
//! location match, partner grouping, contribution split, persistence. Any failure aborts
//! the request with the step that produced it; nothing is persisted on failure.

pub mod dto;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocation::{AllocationStrategy, EqualAllocation};
use crate::config::QuotingConfig;
use crate::domain::carbon::{Footprint, KG_PER_TONNE};
use crate::domain::customer::CustomerLocation;
use crate::domain::fee::FeeResult;
use crate::domain::money::round_money;
use crate::domain::organisation::{Organisation, OrganisationId};
use crate::domain::partner::{PartnerId, ProjectId};
use crate::domain::quote::{
    ContributionDetails, CustomerLocationMatch, PartnerContribution, Quote, QuoteId, QuoteStatus,
    API_PRODUCT,
};
use crate::domain::tax::{Location, TaxResult};
use crate::errors::{DomainError, PipelineStep, QuoteError};
use crate::ports::{
    CarbonFactorRepository, CountryRepository, CustomerRepository, ExchangeRateRepository,
    FeeConfigRepository, FootprintRepository, ImpactPartnerRepository, ImpactProjectRepository,
    OrganisationRepository, QuoteRepository, TaxRateRepository,
};
use crate::services::{
    BlendedPrice, BlendedPriceCalculator, CarbonFactorLookup, CurrencyConverter, CustomerResolver,
    FootprintCalculator, FootprintRequest, OrganisationValidator, SalesTaxCalculator,
    ServiceFeeCalculator, TaxCalculationInput,
};

pub use dto::{
    Contribution, ContributionPartner, CreateQuoteRequest, Credits, CustomerRequest, Equivalent,
    FootprintSummary, ImpactPartnerSummary, MerchantRequest, ProjectReference, QuoteFilters,
    QuoteResponse,
};

pub const TREE_EQUIVALENT_KEY: &str = "tree";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteSettings {
    pub base_currency: String,
    /// Used when a request carries no order items.
    pub default_transaction_amount: Decimal,
    pub quote_ttl: Duration,
    pub kg_co2e_per_tree: Decimal,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self::from(&QuotingConfig::default())
    }
}

impl From<&QuotingConfig> for QuoteSettings {
    fn from(config: &QuotingConfig) -> Self {
        Self {
            base_currency: config.base_currency.clone(),
            default_transaction_amount: config.default_transaction_amount,
            quote_ttl: Duration::hours(i64::from(config.quote_ttl_hours)),
            kg_co2e_per_tree: config.kg_co2e_per_tree,
        }
    }
}

/// Every collaborator the pipeline reads from or writes to.
#[derive(Clone)]
pub struct QuoteDependencies {
    pub organisations: Arc<dyn OrganisationRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub countries: Arc<dyn CountryRepository>,
    pub exchange_rates: Arc<dyn ExchangeRateRepository>,
    pub carbon_factors: Arc<dyn CarbonFactorRepository>,
    pub footprints: Arc<dyn FootprintRepository>,
    pub fee_configs: Arc<dyn FeeConfigRepository>,
    pub tax_rates: Arc<dyn TaxRateRepository>,
    pub partners: Arc<dyn ImpactPartnerRepository>,
    pub projects: Arc<dyn ImpactProjectRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub allocation: Arc<dyn AllocationStrategy>,
}

impl QuoteDependencies {
    /// Wires every port to one value implementing all of them, with equal allocation.
    pub fn from_catalog<C>(catalog: Arc<C>) -> Self
    where
        C: OrganisationRepository
            + CustomerRepository
            + CountryRepository
            + ExchangeRateRepository
            + CarbonFactorRepository
            + FootprintRepository
            + FeeConfigRepository
            + TaxRateRepository
            + ImpactPartnerRepository
            + ImpactProjectRepository
            + QuoteRepository
            + 'static,
    {
        Self {
            organisations: catalog.clone(),
            customers: catalog.clone(),
            countries: catalog.clone(),
            exchange_rates: catalog.clone(),
            carbon_factors: catalog.clone(),
            footprints: catalog.clone(),
            fee_configs: catalog.clone(),
            tax_rates: catalog.clone(),
            partners: catalog.clone(),
            projects: catalog.clone(),
            quotes: catalog,
            allocation: Arc::new(EqualAllocation),
        }
    }
}

/// Merchant identity after request overrides have been applied to organisation defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
struct MerchantProfile {
    mcc: String,
    country: String,
    state: Option<String>,
}

impl MerchantProfile {
    fn resolve(organisation: &Organisation, request: &CreateQuoteRequest) -> Self {
        let mut profile = Self {
            mcc: organisation.mcc().to_string(),
            country: organisation.address.country.clone(),
            state: organisation.address.state.clone(),
        };

        if let Some(merchant) = &request.merchant {
            if !merchant.mcc.trim().is_empty() {
                profile.mcc = merchant.mcc.trim().to_string();
            }
            if !merchant.address.country.trim().is_empty() {
                profile.country = merchant.address.country.trim().to_string();
            }
            if let Some(state) = merchant.address.state.as_deref() {
                if !state.trim().is_empty() {
                    profile.state = Some(state.trim().to_string());
                }
            }
        }

        profile
    }
}

struct PartnerGroup {
    partner_id: PartnerId,
    project_ids: Vec<ProjectId>,
    name: Option<String>,
    description: Option<String>,
    logo: Option<String>,
}

fn at_step(step: PipelineStep) -> impl FnOnce(DomainError) -> QuoteError {
    move |source| {
        warn!(
            event_name = "quote.pipeline.step_failed",
            step = step.label(),
            error_kind = ?source.kind(),
            error = %source,
            "quote pipeline step failed"
        );
        QuoteError::new(step, source)
    }
}

pub struct QuoteOrchestrator {
    settings: QuoteSettings,
    validator: OrganisationValidator,
    customers: CustomerResolver,
    countries: Arc<dyn CountryRepository>,
    converter: CurrencyConverter,
    footprints: FootprintCalculator,
    blended_price: BlendedPriceCalculator,
    service_fee: ServiceFeeCalculator,
    sales_tax: SalesTaxCalculator,
    partners: Arc<dyn ImpactPartnerRepository>,
    quotes: Arc<dyn QuoteRepository>,
    allocation: Arc<dyn AllocationStrategy>,
}

impl QuoteOrchestrator {
    pub fn new(dependencies: QuoteDependencies, settings: QuoteSettings) -> Self {
        let QuoteDependencies {
            organisations,
            customers,
            countries,
            exchange_rates,
            carbon_factors,
            footprints,
            fee_configs,
            tax_rates,
            partners,
            projects,
            quotes,
            allocation,
        } = dependencies;

        Self {
            validator: OrganisationValidator::new(organisations.clone()),
            customers: CustomerResolver::new(customers),
            countries,
            converter: CurrencyConverter::new(exchange_rates, settings.base_currency.clone()),
            footprints: FootprintCalculator::new(
                CarbonFactorLookup::new(carbon_factors),
                footprints,
            ),
            blended_price: BlendedPriceCalculator::new(organisations, projects, allocation.clone()),
            service_fee: ServiceFeeCalculator::new(fee_configs),
            sales_tax: SalesTaxCalculator::new(tax_rates),
            partners,
            quotes,
            allocation,
            settings,
        }
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub async fn create_quote(
        &self,
        request: &CreateQuoteRequest,
        caller: &OrganisationId,
    ) -> Result<QuoteResponse, QuoteError> {
        let requested = OrganisationId::new(request.organisation_id.trim());
        let organisation = self
            .validator
            .validate(caller, &requested)
            .await
            .map_err(at_step(PipelineStep::ValidateOrganisation))?;

        // Pricing and tax follow the location on this request; an existing customer record
        // only supplies the id.
        let location = customer_location(request);
        let customer = self
            .customers
            .get_or_create(&organisation.id, &request.customer.reference, location.clone())
            .await
            .map_err(at_step(PipelineStep::ResolveCustomer))?;

        let merchant = MerchantProfile::resolve(&organisation, request);
        let merchant_country = self
            .countries
            .get_by_code(&merchant.country)
            .await
            .map_err(at_step(PipelineStep::ResolveMerchantCountry))?;

        let (transaction_amount, quote_currency) = self
            .transaction_amount(request)
            .map_err(at_step(PipelineStep::ConvertTransactionAmount))?;
        let base_amount = self
            .converter
            .to_base(transaction_amount, &quote_currency)
            .await
            .map_err(at_step(PipelineStep::ConvertTransactionAmount))?
            .converted_amount;

        let footprint = self
            .footprints
            .calculate(FootprintRequest {
                transaction_id: Uuid::new_v4().to_string(),
                amount: base_amount,
                currency: self.settings.base_currency.clone(),
                merchant_category_code: merchant.mcc.clone(),
                country_id: merchant_country.id.clone(),
                organisation_id: organisation.id.clone(),
                customer_id: customer.id.clone(),
            })
            .await
            .map_err(at_step(PipelineStep::CalculateFootprint))?;

        let filter_by_location = request.filter_by_customer_location();
        let blended = self
            .blended_price
            .calculate(&organisation.id, filter_by_location, Some(location.country.as_str()))
            .await
            .map_err(at_step(PipelineStep::BlendedPrice))?;

        let price_per_tonne = self
            .converter
            .from_base(blended.unit_price * KG_PER_TONNE, &quote_currency)
            .await
            .map_err(at_step(PipelineStep::ConvertPrice))?
            .converted_amount;

        // Round-up contributions are not offered yet; the amount stays zero.
        let round_up_amount = Decimal::ZERO;
        let impact_amount = footprint
            .carbon_tonnes()
            .checked_mul(price_per_tonne)
            .map(round_money)
            .ok_or_else(|| {
                DomainError::validation("quote", "impact amount exceeds the supported range")
            })
            .map_err(at_step(PipelineStep::ConvertPrice))?;

        let fee = self
            .service_fee
            .calculate(&organisation.id, impact_amount)
            .await
            .map_err(at_step(PipelineStep::ServiceFee))?;

        let merchant_location = Location::new(merchant.country.clone(), merchant.state.clone());
        let customer_tax_location = Location::new(location.country.clone(), location.state.clone());
        let impact_tax = self
            .sales_tax
            .calculate(&TaxCalculationInput {
                merchant: merchant_location.clone(),
                customer: customer_tax_location.clone(),
                amount: impact_amount,
            })
            .await
            .map_err(at_step(PipelineStep::ImpactSalesTax))?;
        let fee_tax = self
            .sales_tax
            .calculate(&TaxCalculationInput {
                merchant: merchant_location,
                customer: customer_tax_location,
                amount: fee.fee_amount,
            })
            .await
            .map_err(at_step(PipelineStep::ServiceFeeSalesTax))?;

        let total_amount = [impact_tax.tax_amount, fee.fee_amount, fee_tax.tax_amount]
            .into_iter()
            .try_fold(impact_amount, |sum, part| sum.checked_add(part))
            .map(round_money)
            .ok_or_else(|| {
                DomainError::validation("quote", "total amount exceeds the supported range")
            })
            .map_err(at_step(PipelineStep::ServiceFeeSalesTax))?;

        let location_match = if filter_by_location {
            customer_location_match(&blended, &location)
        } else {
            CustomerLocationMatch::World
        };

        let groups = self.group_partners(&blended, request.include_impact_partner_details).await;
        let contribution = self.contribution_details(
            &groups,
            total_amount,
            impact_amount,
            &impact_tax,
            &fee,
            &fee_tax,
        );

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::generate(),
            quote_reference: Uuid::new_v4().to_string(),
            calculation_reference: footprint.id.clone(),
            organisation_id: organisation.id.clone(),
            customer_id: customer.id.clone(),
            currency: quote_currency,
            total_amount,
            impact_amount,
            impact_sales_tax_amount: impact_tax.tax_amount,
            impact_sales_tax_rate: impact_tax.tax_rate,
            service_fee_amount: fee.fee_amount,
            service_fee_sales_tax_amount: fee_tax.tax_amount,
            service_fee_sales_tax_rate: fee_tax.tax_rate,
            round_up_amount,
            price_per_tonne,
            service_fee_share: fee.fee_percentage,
            contribution,
            order_items: request.order_items.clone(),
            customer_location_filter: filter_by_location,
            include_partner_detail: request.include_impact_partner_details,
            include_project_detail: false,
            product: API_PRODUCT.to_string(),
            is_merchant_tax_liable: false,
            status: QuoteStatus::Pending,
            expires_at: now + self.settings.quote_ttl,
            created_at: now,
            updated_at: now,
        };

        let quote = self.quotes.create(quote).await.map_err(at_step(PipelineStep::PersistQuote))?;

        info!(
            event_name = "quote.created",
            quote_id = quote.id.as_str(),
            organisation_id = %quote.organisation_id,
            customer_id = quote.customer_id.as_str(),
            currency = %quote.currency,
            total_amount = %quote.total_amount,
            partner_count = groups.len(),
            "quote created"
        );

        Ok(self.response(&quote, &footprint, &groups, location_match))
    }

    pub async fn get_quote(&self, id: &QuoteId) -> Result<Quote, DomainError> {
        self.quotes.get_by_id(id).await
    }

    /// Moves a stored quote along its lifecycle and persists the change.
    pub async fn transition_quote(
        &self,
        id: &QuoteId,
        next: QuoteStatus,
    ) -> Result<Quote, DomainError> {
        let mut quote = self.quotes.get_by_id(id).await?;
        quote.transition_to(next, Utc::now())?;
        let quote = self.quotes.update(quote).await?;

        info!(
            event_name = "quote.status_changed",
            quote_id = quote.id.as_str(),
            status = quote.status.as_str(),
            "quote status changed"
        );
        Ok(quote)
    }

    fn transaction_amount(
        &self,
        request: &CreateQuoteRequest,
    ) -> Result<(Decimal, String), DomainError> {
        let Some(first) = request.order_items.first() else {
            return Ok((
                self.settings.default_transaction_amount,
                self.settings.base_currency.clone(),
            ));
        };

        let total = request
            .order_items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| item.line_total()?.checked_add(sum))
            .ok_or_else(|| {
                DomainError::validation("quote", "order item totals exceed the supported range")
            })?;

        Ok((total, first.unit_price.currency_code.trim().to_ascii_uppercase()))
    }

    async fn group_partners(
        &self,
        blended: &BlendedPrice,
        with_details: bool,
    ) -> Vec<PartnerGroup> {
        let mut groups: Vec<PartnerGroup> = Vec::new();
        for weighted in &blended.projects {
            let project = &weighted.project;
            match groups.iter_mut().find(|group| group.partner_id == project.partner_id) {
                Some(group) => group.project_ids.push(project.id.clone()),
                None => groups.push(PartnerGroup {
                    partner_id: project.partner_id.clone(),
                    project_ids: vec![project.id.clone()],
                    name: None,
                    description: None,
                    logo: None,
                }),
            }
        }

        if with_details {
            for group in &mut groups {
                match self.partners.get_by_id(&group.partner_id).await {
                    Ok(partner) => {
                        group.name = Some(partner.name);
                        group.description = partner.short_description;
                        group.logo = partner.logo_url;
                    }
                    Err(error) => debug!(
                        event_name = "quote.partner_enrichment_skipped",
                        partner_id = group.partner_id.as_str(),
                        error = %error,
                        "partner details unavailable"
                    ),
                }
            }
        }

        groups
    }

    fn contribution_details(
        &self,
        groups: &[PartnerGroup],
        total_amount: Decimal,
        impact_amount: Decimal,
        impact_tax: &TaxResult,
        fee: &FeeResult,
        fee_tax: &TaxResult,
    ) -> ContributionDetails {
        let share = |amount: Decimal| {
            if total_amount > Decimal::ZERO {
                amount / total_amount
            } else {
                Decimal::ZERO
            }
        };

        let weights = self.allocation.allocate(groups.len());
        let partners = groups
            .iter()
            .zip(weights)
            .map(|(group, weight)| PartnerContribution {
                partner_id: group.partner_id.clone(),
                impact_percentage: weight,
                impact_sales_tax_percentage: impact_tax.tax_rate * weight,
                service_fee_percentage: weight,
                service_fee_sales_tax_percentage: fee_tax.tax_rate * weight,
                project_ids: group.project_ids.clone(),
            })
            .collect();

        ContributionDetails {
            impact_percentage: share(impact_amount),
            impact_sales_tax_percentage: share(impact_tax.tax_amount),
            service_fee_percentage: share(fee.fee_amount),
            service_fee_sales_tax_percentage: share(fee_tax.tax_amount),
            partners,
        }
    }

    fn tree_equivalent(&self, carbon_kg: Decimal) -> Equivalent {
        let value = carbon_kg / self.settings.kg_co2e_per_tree;
        let mut display = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        display.rescale(1);
        Equivalent {
            key: TREE_EQUIVALENT_KEY.to_string(),
            value,
            template: format!("That's like planting {display} trees"),
        }
    }

    fn response(
        &self,
        quote: &Quote,
        footprint: &Footprint,
        groups: &[PartnerGroup],
        location_match: CustomerLocationMatch,
    ) -> QuoteResponse {
        let projects = |group: &PartnerGroup| -> Vec<ProjectReference> {
            group.project_ids.iter().map(|id| ProjectReference { id: id.0.clone() }).collect()
        };

        let impact_partners = groups
            .iter()
            .map(|group| ImpactPartnerSummary {
                id: group.partner_id.0.clone(),
                name: group.name.clone(),
                description: group.description.clone(),
                logo: group.logo.clone(),
                projects: projects(group),
            })
            .collect();

        let contribution_partners = groups
            .iter()
            .zip(&quote.contribution.partners)
            .map(|(group, split)| ContributionPartner {
                id: group.partner_id.0.clone(),
                impact_percentage: split.impact_percentage,
                impact_sales_tax_percentage: split.impact_sales_tax_percentage,
                service_fee_percentage: split.service_fee_percentage,
                service_fee_sales_tax_percentage: split.service_fee_sales_tax_percentage,
                name: group.name.clone(),
                description: group.description.clone(),
                logo: group.logo.clone(),
                projects: projects(group),
            })
            .collect();

        QuoteResponse {
            id: quote.id.0.clone(),
            quote_reference: quote.quote_reference.clone(),
            footprint: FootprintSummary {
                co2e_grams: footprint.carbon_grams,
                co2e_ounces: footprint.carbon_ounces,
                equivalents: vec![self.tree_equivalent(footprint.carbon_kg)],
            },
            credits: Credits {
                total_amount: quote.total_amount,
                impact_amount: quote.impact_amount,
                impact_sales_tax_amount: quote.impact_sales_tax_amount,
                service_fee_amount: quote.service_fee_amount,
                service_fee_sales_tax_amount: quote.service_fee_sales_tax_amount,
                price_per_tonne_co2e: quote.price_per_tonne,
                impact_partners,
                customer_location_match: location_match,
            },
            contribution: Contribution {
                impact_percentage: quote.contribution.impact_percentage,
                impact_sales_tax_percentage: quote.contribution.impact_sales_tax_percentage,
                service_fee_percentage: quote.contribution.service_fee_percentage,
                service_fee_sales_tax_percentage: quote
                    .contribution
                    .service_fee_sales_tax_percentage,
                impact_partners: contribution_partners,
            },
        }
    }
}

fn customer_location(request: &CreateQuoteRequest) -> CustomerLocation {
    let customer = &request.customer;
    CustomerLocation {
        postal_code: customer.postal_code.clone(),
        city: customer.city.clone(),
        state: customer
            .state
            .as_deref()
            .map(str::trim)
            .filter(|state| !state.is_empty())
            .map(str::to_string),
        country: customer.country.trim().to_string(),
    }
}

/// The first funded project in the requested customer country decides the label.
fn customer_location_match(
    blended: &BlendedPrice,
    location: &CustomerLocation,
) -> CustomerLocationMatch {
    let Some(project) = blended
        .projects
        .iter()
        .map(|weighted| &weighted.project)
        .find(|project| project.is_in_country(&location.country))
    else {
        return CustomerLocationMatch::World;
    };

    match location.state.as_deref() {
        Some(state) if project.is_in_region(state) => CustomerLocationMatch::State,
        _ => CustomerLocationMatch::Country,
    }
}
