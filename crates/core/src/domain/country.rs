use serde::{Deserialize, Serialize};

/// Key segment that matches any country or merchant category.
pub const WILDCARD: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryId(pub String);

impl CountryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub iso2: String,
    pub iso3: String,
    pub name: String,
    pub currency: String,
    pub is_eu: bool,
}

impl Country {
    /// Matches either the ISO 3166 alpha-2 or alpha-3 code.
    pub fn matches_code(&self, code: &str) -> bool {
        let code = code.trim();
        self.iso2.eq_ignore_ascii_case(code) || self.iso3.eq_ignore_ascii_case(code)
    }
}
