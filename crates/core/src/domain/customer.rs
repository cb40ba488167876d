use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::organisation::OrganisationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerLocation {
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub organisation_id: OrganisationId,
    pub reference: String,
    pub location: CustomerLocation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        organisation_id: OrganisationId,
        reference: impl Into<String>,
        location: CustomerLocation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CustomerId::generate(),
            organisation_id,
            reference: reference.into(),
            location,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn country(&self) -> &str {
        &self.location.country
    }

    pub fn state(&self) -> Option<&str> {
        self.location.state.as_deref()
    }
}
