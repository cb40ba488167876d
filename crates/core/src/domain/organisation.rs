use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::partner::PartnerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganisationId(pub String);

impl OrganisationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganisationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganisationStatus {
    Active,
    Inactive,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address3: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    parent_id: Option<OrganisationId>,
    pub name: String,
    pub legal_name: String,
    pub merchant_category_code: Option<String>,
    pub currency: String,
    pub address: Address,
    pub service_fee_percentage: Decimal,
    pub status: OrganisationStatus,
    pub impact_partner_ids: Vec<PartnerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organisation {
    pub fn new(
        id: OrganisationId,
        name: impl Into<String>,
        currency: impl Into<String>,
        address: Address,
        now: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            parent_id: None,
            legal_name: name.clone(),
            name,
            merchant_category_code: None,
            currency: currency.into(),
            address,
            service_fee_percentage: Decimal::ZERO,
            status: OrganisationStatus::Active,
            impact_partner_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn parent_id(&self) -> Option<&OrganisationId> {
        self.parent_id.as_ref()
    }

    /// Attaches the organisation to a parent. The link cannot be changed once made.
    pub fn assign_parent(&mut self, parent: OrganisationId) -> Result<(), DomainError> {
        if parent == self.id {
            return Err(DomainError::validation(
                "organisation",
                format!("organisation {} cannot be its own parent", self.id),
            ));
        }

        match &self.parent_id {
            Some(existing) if *existing == parent => Ok(()),
            Some(existing) => Err(DomainError::validation(
                "organisation",
                format!("organisation {} already belongs to parent {existing}", self.id),
            )),
            None => {
                self.parent_id = Some(parent);
                Ok(())
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrganisationStatus::Active
    }

    pub fn is_child_of(&self, parent: &OrganisationId) -> bool {
        self.parent_id.as_ref() == Some(parent)
    }

    /// Default merchant category code, empty when none is configured.
    pub fn mcc(&self) -> &str {
        self.merchant_category_code.as_deref().unwrap_or_default()
    }

    pub fn has_impact_partner(&self, partner: &PartnerId) -> bool {
        self.impact_partner_ids.iter().any(|candidate| candidate == partner)
    }
}
