use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

impl PartnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPartner {
    pub id: PartnerId,
    pub name: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
}

/// A carbon credit project. `unit_price` is in the base currency per kg CO2e.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactProject {
    pub id: ProjectId,
    pub partner_id: PartnerId,
    pub name: String,
    pub unit_price: Decimal,
    pub country: String,
    pub region: Option<String>,
}

impl ImpactProject {
    pub fn is_in_country(&self, country: &str) -> bool {
        self.country.eq_ignore_ascii_case(country)
    }

    pub fn is_in_region(&self, region: &str) -> bool {
        self.region.as_deref().is_some_and(|own| own.eq_ignore_ascii_case(region))
    }
}
