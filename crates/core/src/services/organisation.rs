use std::sync::Arc;

use crate::domain::organisation::{Organisation, OrganisationId};
use crate::errors::DomainError;
use crate::ports::OrganisationRepository;

/// Checks that a caller acts for itself or for one of its direct children.
#[derive(Clone)]
pub struct OrganisationValidator {
    organisations: Arc<dyn OrganisationRepository>,
}

impl OrganisationValidator {
    pub fn new(organisations: Arc<dyn OrganisationRepository>) -> Self {
        Self { organisations }
    }

    pub async fn validate(
        &self,
        caller: &OrganisationId,
        target: &OrganisationId,
    ) -> Result<Organisation, DomainError> {
        let organisation = self.organisations.get_by_id(target).await?;
        if caller == target {
            return Ok(organisation);
        }

        // Only one level of hierarchy is honoured; grandparents are not searched.
        if !organisation.is_child_of(caller) {
            return Err(DomainError::forbidden(
                "organisation",
                format!("organisation {target} is not a child of {caller}"),
            ));
        }

        Ok(organisation)
    }
}
