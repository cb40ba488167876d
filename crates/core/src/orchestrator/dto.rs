use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::organisation::Address;
use crate::domain::quote::{CustomerLocationMatch, OrderItem};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub organisation_id: String,
    pub customer: CustomerRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<MerchantRequest>,
    pub order_items: Vec<OrderItem>,
    pub include_impact_partner_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<QuoteFilters>,
}

impl CreateQuoteRequest {
    /// Names of required fields that are missing or blank, in request order.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.organisation_id.trim().is_empty() {
            missing.push("organisationId");
        }
        if self.customer.reference.trim().is_empty() {
            missing.push("customer.reference");
        }
        if self.customer.country.trim().is_empty() {
            missing.push("customer.country");
        }
        missing
    }

    pub fn filter_by_customer_location(&self) -> bool {
        self.filters.as_ref().is_some_and(|filters| filters.customer_location)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MerchantRequest {
    pub mcc: String,
    pub name: String,
    pub address: Address,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteFilters {
    pub customer_location: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub id: String,
    pub quote_reference: String,
    pub footprint: FootprintSummary,
    pub credits: Credits,
    pub contribution: Contribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintSummary {
    pub co2e_grams: Decimal,
    pub co2e_ounces: Decimal,
    pub equivalents: Vec<Equivalent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equivalent {
    pub key: String,
    pub value: Decimal,
    pub template: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credits {
    pub total_amount: Decimal,
    pub impact_amount: Decimal,
    pub impact_sales_tax_amount: Decimal,
    pub service_fee_amount: Decimal,
    pub service_fee_sales_tax_amount: Decimal,
    pub price_per_tonne_co2e: Decimal,
    pub impact_partners: Vec<ImpactPartnerSummary>,
    pub customer_location_match: CustomerLocationMatch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReference {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPartnerSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub projects: Vec<ProjectReference>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub impact_percentage: Decimal,
    pub impact_sales_tax_percentage: Decimal,
    pub service_fee_percentage: Decimal,
    pub service_fee_sales_tax_percentage: Decimal,
    pub impact_partners: Vec<ContributionPartner>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionPartner {
    pub id: String,
    pub impact_percentage: Decimal,
    pub impact_sales_tax_percentage: Decimal,
    pub service_fee_percentage: Decimal,
    pub service_fee_sales_tax_percentage: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub projects: Vec<ProjectReference>,
}
