use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::carbon::FootprintId;
use crate::domain::customer::CustomerId;
use crate::domain::money::Money;
use crate::domain::organisation::OrganisationId;
use crate::domain::partner::{PartnerId, ProjectId};
use crate::errors::DomainError;

pub const API_PRODUCT: &str = "API";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "completed" => Ok(Self::Completed),
            other => {
                Err(DomainError::validation("quote", format!("unknown quote status `{other}`")))
            }
        }
    }
}

/// How closely the funded projects match where the customer lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerLocationMatch {
    #[default]
    World,
    Country,
    State,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// `unit_price * quantity`, or `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.value.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerContribution {
    pub partner_id: PartnerId,
    pub impact_percentage: Decimal,
    pub impact_sales_tax_percentage: Decimal,
    pub service_fee_percentage: Decimal,
    pub service_fee_sales_tax_percentage: Decimal,
    pub project_ids: Vec<ProjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDetails {
    pub impact_percentage: Decimal,
    pub impact_sales_tax_percentage: Decimal,
    pub service_fee_percentage: Decimal,
    pub service_fee_sales_tax_percentage: Decimal,
    pub partners: Vec<PartnerContribution>,
}

impl ContributionDetails {
    pub fn total_percentage(&self) -> Decimal {
        self.impact_percentage
            + self.impact_sales_tax_percentage
            + self.service_fee_percentage
            + self.service_fee_sales_tax_percentage
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub quote_reference: String,
    pub calculation_reference: FootprintId,
    pub organisation_id: OrganisationId,
    pub customer_id: CustomerId,
    pub currency: String,
    pub total_amount: Decimal,
    pub impact_amount: Decimal,
    pub impact_sales_tax_amount: Decimal,
    pub impact_sales_tax_rate: Decimal,
    pub service_fee_amount: Decimal,
    pub service_fee_sales_tax_amount: Decimal,
    pub service_fee_sales_tax_rate: Decimal,
    pub round_up_amount: Decimal,
    pub price_per_tonne: Decimal,
    pub service_fee_share: Decimal,
    pub contribution: ContributionDetails,
    pub order_items: Vec<OrderItem>,
    pub customer_location_filter: bool,
    pub include_partner_detail: bool,
    pub include_project_detail: bool,
    pub product: String,
    pub is_merchant_tax_liable: bool,
    pub status: QuoteStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Pending, QuoteStatus::Accepted)
                | (QuoteStatus::Pending, QuoteStatus::Rejected)
                | (QuoteStatus::Pending, QuoteStatus::Expired)
                | (QuoteStatus::Accepted, QuoteStatus::Completed)
                | (QuoteStatus::Accepted, QuoteStatus::Expired)
        )
    }

    pub fn transition_to(
        &mut self,
        next: QuoteStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::validation(
                "quote",
                format!(
                    "quote {} cannot move from {} to {}",
                    self.id,
                    self.status.as_str(),
                    next.as_str()
                ),
            ));
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }
}
