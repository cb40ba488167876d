use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use carbonquote_core::domain::carbon::FootprintId;
use carbonquote_core::domain::customer::CustomerId;
use carbonquote_core::domain::organisation::OrganisationId;
use carbonquote_core::domain::quote::{ContributionDetails, OrderItem, Quote, QuoteId, QuoteStatus};
use carbonquote_core::errors::DomainError;
use carbonquote_core::ports::QuoteRepository;

use super::RepositoryError;
use crate::DbPool;

const DOMAIN: &str = "quote";

const SELECT_QUOTE: &str = "SELECT id, quote_reference, calculation_reference, organisation_id,
        customer_id, currency, total_amount, impact_amount, impact_sales_tax_amount,
        impact_sales_tax_rate, service_fee_amount, service_fee_sales_tax_amount,
        service_fee_sales_tax_rate, round_up_amount, price_per_tonne, service_fee_share,
        contribution_json, order_items_json, customer_location_filter, include_partner_detail,
        include_project_detail, product, is_merchant_tax_liable, status, expires_at,
        created_at, updated_at
     FROM quotes WHERE id = ?";

/// Quotes in SQLite. Decimals are stored as TEXT, the contribution breakdown and order
/// items as JSON documents.
pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(SELECT_QUOTE).bind(id.as_str()).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_quote).transpose()
    }

    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let contribution = encode_json(&quote.contribution)?;
        let order_items = encode_json(&quote.order_items)?;

        sqlx::query(
            "INSERT INTO quotes (id, quote_reference, calculation_reference, organisation_id,
                                 customer_id, currency, total_amount, impact_amount,
                                 impact_sales_tax_amount, impact_sales_tax_rate,
                                 service_fee_amount, service_fee_sales_tax_amount,
                                 service_fee_sales_tax_rate, round_up_amount, price_per_tonne,
                                 service_fee_share, contribution_json, order_items_json,
                                 customer_location_filter, include_partner_detail,
                                 include_project_detail, product, is_merchant_tax_liable,
                                 status, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                     ?, ?)",
        )
        .bind(quote.id.as_str())
        .bind(&quote.quote_reference)
        .bind(quote.calculation_reference.as_str())
        .bind(quote.organisation_id.as_str())
        .bind(quote.customer_id.as_str())
        .bind(&quote.currency)
        .bind(quote.total_amount.to_string())
        .bind(quote.impact_amount.to_string())
        .bind(quote.impact_sales_tax_amount.to_string())
        .bind(quote.impact_sales_tax_rate.to_string())
        .bind(quote.service_fee_amount.to_string())
        .bind(quote.service_fee_sales_tax_amount.to_string())
        .bind(quote.service_fee_sales_tax_rate.to_string())
        .bind(quote.round_up_amount.to_string())
        .bind(quote.price_per_tonne.to_string())
        .bind(quote.service_fee_share.to_string())
        .bind(contribution)
        .bind(order_items)
        .bind(quote.customer_location_filter)
        .bind(quote.include_partner_detail)
        .bind(quote.include_project_detail)
        .bind(&quote.product)
        .bind(quote.is_merchant_tax_liable)
        .bind(quote.status.as_str())
        .bind(quote.expires_at.to_rfc3339())
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrites the mutable part of a quote. Returns the number of rows touched.
    async fn rewrite(&self, quote: &Quote) -> Result<u64, RepositoryError> {
        let contribution = encode_json(&quote.contribution)?;

        let result = sqlx::query(
            "UPDATE quotes
             SET status = ?, contribution_json = ?, expires_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(quote.status.as_str())
        .bind(contribution)
        .bind(quote.expires_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .bind(quote.id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|error| invalid("JSON", column, error))
}

fn text(row: &SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool, RepositoryError> {
    row.try_get(column).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn invalid(kind: &str, column: &str, error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(format!("invalid {kind} in `{column}`: {error}"))
}

fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw = text(row, column)?;
    Decimal::from_str(&raw).map_err(|error| invalid("decimal", column, error))
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw = text(row, column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| invalid("timestamp", column, error))
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let status = QuoteStatus::from_str(&text(row, "status")?)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let contribution: ContributionDetails =
        decode_json("contribution_json", &text(row, "contribution_json")?)?;
    let order_items: Vec<OrderItem> =
        decode_json("order_items_json", &text(row, "order_items_json")?)?;

    Ok(Quote {
        id: QuoteId(text(row, "id")?),
        quote_reference: text(row, "quote_reference")?,
        calculation_reference: FootprintId(text(row, "calculation_reference")?),
        organisation_id: OrganisationId::new(text(row, "organisation_id")?),
        customer_id: CustomerId(text(row, "customer_id")?),
        currency: text(row, "currency")?,
        total_amount: decimal(row, "total_amount")?,
        impact_amount: decimal(row, "impact_amount")?,
        impact_sales_tax_amount: decimal(row, "impact_sales_tax_amount")?,
        impact_sales_tax_rate: decimal(row, "impact_sales_tax_rate")?,
        service_fee_amount: decimal(row, "service_fee_amount")?,
        service_fee_sales_tax_amount: decimal(row, "service_fee_sales_tax_amount")?,
        service_fee_sales_tax_rate: decimal(row, "service_fee_sales_tax_rate")?,
        round_up_amount: decimal(row, "round_up_amount")?,
        price_per_tonne: decimal(row, "price_per_tonne")?,
        service_fee_share: decimal(row, "service_fee_share")?,
        contribution,
        order_items,
        customer_location_filter: flag(row, "customer_location_filter")?,
        include_partner_detail: flag(row, "include_partner_detail")?,
        include_project_detail: flag(row, "include_project_detail")?,
        product: text(row, "product")?,
        is_merchant_tax_liable: flag(row, "is_merchant_tax_liable")?,
        status,
        expires_at: timestamp(row, "expires_at")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn is_unique_violation(error: &RepositoryError) -> bool {
    match error {
        RepositoryError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn create(&self, quote: Quote) -> Result<Quote, DomainError> {
        match self.insert(&quote).await {
            Ok(()) => {
                debug!(
                    event_name = "db.quote.inserted",
                    quote_id = quote.id.as_str(),
                    "quote row inserted"
                );
                Ok(quote)
            }
            Err(error) if is_unique_violation(&error) => Err(DomainError::validation(
                DOMAIN,
                format!("quote {} already exists", quote.id),
            )),
            Err(error) => Err(error.into_domain(DOMAIN)),
        }
    }

    async fn get_by_id(&self, id: &QuoteId) -> Result<Quote, DomainError> {
        self.find(id)
            .await
            .map_err(|error| error.into_domain(DOMAIN))?
            .ok_or_else(|| DomainError::not_found(DOMAIN, format!("quote {id} not found")))
    }

    async fn update(&self, quote: Quote) -> Result<Quote, DomainError> {
        let touched = self.rewrite(&quote).await.map_err(|error| error.into_domain(DOMAIN))?;
        if touched == 0 {
            return Err(DomainError::not_found(DOMAIN, format!("quote {} not found", quote.id)));
        }
        Ok(quote)
    }
}
