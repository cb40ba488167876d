use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Internal,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("[{domain}] not found: {message}")]
    NotFound { domain: &'static str, message: String },
    #[error("[{domain}] validation failed: {message}")]
    Validation { domain: &'static str, message: String },
    #[error("[{domain}] forbidden: {message}")]
    Forbidden { domain: &'static str, message: String },
    #[error("[{domain}] internal error: {message}: {cause}")]
    Internal { domain: &'static str, message: String, cause: String },
}

impl DomainError {
    pub fn not_found(domain: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { domain, message: message.into() }
    }

    pub fn validation(domain: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { domain, message: message.into() }
    }

    pub fn forbidden(domain: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden { domain, message: message.into() }
    }

    pub fn internal(
        domain: &'static str,
        message: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        Self::Internal { domain, message: message.into(), cause: cause.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Self::NotFound { domain, .. }
            | Self::Validation { domain, .. }
            | Self::Forbidden { domain, .. }
            | Self::Internal { domain, .. } => domain,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Identifies which stage of quote creation produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStep {
    ValidateOrganisation,
    ResolveCustomer,
    ResolveMerchantCountry,
    ConvertTransactionAmount,
    CalculateFootprint,
    BlendedPrice,
    ConvertPrice,
    ServiceFee,
    ImpactSalesTax,
    ServiceFeeSalesTax,
    PersistQuote,
}

impl PipelineStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ValidateOrganisation => "step 1 - validate organisation",
            Self::ResolveCustomer => "step 2 - get/create customer",
            Self::ResolveMerchantCountry => "step 4 - get merchant country",
            Self::ConvertTransactionAmount => "step 6 - convert transaction amount",
            Self::CalculateFootprint => "step 7 - calculate carbon footprint",
            Self::BlendedPrice => "step 8 - get blended price",
            Self::ConvertPrice => "step 9 - convert price to quote currency",
            Self::ServiceFee => "step 11 - calculate service fee",
            Self::ImpactSalesTax => "step 12.1 - calculate impact sales tax",
            Self::ServiceFeeSalesTax => "step 12.2 - calculate service fee sales tax",
            Self::PersistQuote => "step 17 - save quote",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{step}: {source}")]
pub struct QuoteError {
    pub step: PipelineStep,
    #[source]
    pub source: DomainError,
}

impl QuoteError {
    pub fn new(step: PipelineStep, source: DomainError) -> Self {
        Self { step, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError::classify(self.kind(), self.to_string(), correlation_id.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    fn classify(kind: ErrorKind, message: String, correlation_id: String) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound { message, correlation_id },
            ErrorKind::Validation => Self::BadRequest { message, correlation_id },
            ErrorKind::Forbidden => Self::Forbidden { message, correlation_id },
            ErrorKind::Internal => Self::Internal { message, correlation_id },
        }
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "The caller may not act on behalf of this organisation.",
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "VALIDATION_ERROR",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl DomainError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError::classify(self.kind(), self.to_string(), correlation_id.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DomainError, ErrorKind, InterfaceError, PipelineStep, QuoteError};

    #[test]
    fn not_found_maps_to_not_found_interface_error() {
        let interface =
            DomainError::not_found("quote", "quote not found").into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotFound { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.code(), "NOT_FOUND");
    }

    #[test]
    fn forbidden_step_error_keeps_step_label_and_original_message() {
        let error = QuoteError::new(
            PipelineStep::ValidateOrganisation,
            DomainError::forbidden("organisation", "organisation b is not a child of a"),
        );

        assert_eq!(error.kind(), ErrorKind::Forbidden);
        let interface = error.into_interface("req-2");
        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert!(interface.message().starts_with("step 1 - validate organisation"));
        assert!(interface.message().contains("is not a child of"));
    }

    #[test]
    fn validation_maps_to_bad_request_with_user_safe_message() {
        let interface =
            DomainError::validation("customer", "customer already exists").into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn internal_error_display_includes_cause() {
        let error = DomainError::internal("quote", "storing quote", "database lock timeout");

        assert_eq!(error.kind(), ErrorKind::Internal);
        assert_eq!(error.domain(), "quote");
        assert!(error.to_string().contains("database lock timeout"));
        assert!(matches!(error.into_interface("req-4"), InterfaceError::Internal { .. }));
    }
}
