use std::sync::Arc;

use rust_decimal::Decimal;

use crate::allocation::AllocationStrategy;
use crate::domain::organisation::OrganisationId;
use crate::domain::partner::ImpactProject;
use crate::errors::DomainError;
use crate::ports::{ImpactProjectRepository, OrganisationRepository};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedProject {
    pub project: ImpactProject,
    pub weight: Decimal,
}

/// Per-kg price across the eligible projects, in the base currency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlendedPrice {
    pub unit_price: Decimal,
    pub projects: Vec<WeightedProject>,
}

impl BlendedPrice {
    pub fn empty() -> Self {
        Self { unit_price: Decimal::ZERO, projects: Vec::new() }
    }
}

#[derive(Clone)]
pub struct BlendedPriceCalculator {
    organisations: Arc<dyn OrganisationRepository>,
    projects: Arc<dyn ImpactProjectRepository>,
    allocation: Arc<dyn AllocationStrategy>,
}

impl BlendedPriceCalculator {
    pub fn new(
        organisations: Arc<dyn OrganisationRepository>,
        projects: Arc<dyn ImpactProjectRepository>,
        allocation: Arc<dyn AllocationStrategy>,
    ) -> Self {
        Self { organisations, projects, allocation }
    }

    pub async fn calculate(
        &self,
        organisation_id: &OrganisationId,
        filter_by_location: bool,
        location_country: Option<&str>,
    ) -> Result<BlendedPrice, DomainError> {
        let organisation = self.organisations.get_by_id(organisation_id).await?;

        let mut eligible = Vec::new();
        for partner_id in &organisation.impact_partner_ids {
            eligible.extend(self.projects.list_by_partner(partner_id).await?);
        }

        if let (true, Some(country)) = (filter_by_location, location_country) {
            eligible.retain(|project| project.is_in_country(country));
        }

        if eligible.is_empty() {
            return Ok(BlendedPrice::empty());
        }

        let weights = self.allocation.allocate(eligible.len());
        let projects: Vec<WeightedProject> = eligible
            .into_iter()
            .zip(weights)
            .map(|(project, weight)| WeightedProject { project, weight })
            .collect();
        let unit_price =
            projects.iter().map(|weighted| weighted.project.unit_price * weighted.weight).sum();

        Ok(BlendedPrice { unit_price, projects })
    }
}
