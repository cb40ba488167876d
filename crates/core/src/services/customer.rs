use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::domain::customer::{Customer, CustomerLocation};
use crate::domain::organisation::OrganisationId;
use crate::errors::{DomainError, ErrorKind};
use crate::ports::CustomerRepository;

#[derive(Clone)]
pub struct CustomerResolver {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerResolver {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    /// Returns the customer registered under `(organisation_id, reference)`, creating it when
    /// absent. Existing records are returned unchanged. An empty reference skips the lookup
    /// and always creates a new customer.
    pub async fn get_or_create(
        &self,
        organisation_id: &OrganisationId,
        reference: &str,
        location: CustomerLocation,
    ) -> Result<Customer, DomainError> {
        if !reference.is_empty() {
            match self.customers.get_by_reference(organisation_id, reference).await {
                Ok(existing) => return Ok(existing),
                Err(error) if error.is_not_found() => {}
                Err(error) => return Err(error),
            }
        }

        let customer = Customer::new(organisation_id.clone(), reference, location, Utc::now());
        match self.customers.create(customer).await {
            Ok(created) => {
                debug!(
                    event_name = "customer.created",
                    organisation_id = %organisation_id,
                    customer_id = created.id.as_str(),
                    "registered new customer"
                );
                Ok(created)
            }
            // A concurrent request registered the same reference first.
            Err(error) if error.kind() == ErrorKind::Validation && !reference.is_empty() => {
                self.customers.get_by_reference(organisation_id, reference).await
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CustomerResolver;
    use crate::domain::customer::CustomerLocation;
    use crate::domain::organisation::OrganisationId;
    use crate::testing::StubCatalog;

    fn location(city: &str) -> CustomerLocation {
        CustomerLocation {
            postal_code: None,
            city: Some(city.to_string()),
            state: None,
            country: "GBR".to_string(),
        }
    }

    #[tokio::test]
    async fn repeated_reference_returns_same_customer() {
        let catalog = StubCatalog::seeded().shared();
        let resolver = CustomerResolver::new(catalog.clone());
        let org = OrganisationId::new("org-parent");

        let first =
            resolver.get_or_create(&org, "cust-42", location("Leeds")).await.expect("first");
        let second =
            resolver.get_or_create(&org, "cust-42", location("York")).await.expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(second.location.city.as_deref(), Some("Leeds"));
        assert_eq!(catalog.customer_count(), 1);
    }

    #[tokio::test]
    async fn same_reference_in_other_organisation_is_a_different_customer() {
        let catalog = StubCatalog::seeded().shared();
        let resolver = CustomerResolver::new(catalog.clone());

        let parent = resolver
            .get_or_create(&OrganisationId::new("org-parent"), "cust-1", location("Leeds"))
            .await
            .expect("parent customer");
        let child = resolver
            .get_or_create(&OrganisationId::new("org-child"), "cust-1", location("Leeds"))
            .await
            .expect("child customer");

        assert_ne!(parent.id, child.id);
        assert_eq!(catalog.customer_count(), 2);
    }

    #[tokio::test]
    async fn empty_reference_always_creates() {
        let catalog = StubCatalog::seeded().shared();
        let resolver = CustomerResolver::new(catalog.clone());
        let org = OrganisationId::new("org-parent");

        let first = resolver.get_or_create(&org, "", location("Leeds")).await.expect("first");
        let second = resolver.get_or_create(&org, "", location("Leeds")).await.expect("second");

        assert_ne!(first.id, second.id);
        assert_eq!(catalog.customer_count(), 2);
    }
}
