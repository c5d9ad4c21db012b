use serde::Deserialize;

/// Fixed window size for list endpoints.
pub const API_PAGE_SIZE: u64 = 250;

/// Largest bulk create payload accepted by default.
pub const MAX_BULK_RECORDS: usize = 250;

/// Settings shared by the filter builder, paginator and router.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust,ignore
/// let config = ApiConfig::from_json(r#"{"base_url": "https://api.example.com"}"#)?;
/// assert_eq!(config.page_size, 250);
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Records per page on list endpoints
    pub page_size: u64,
    /// Upper bound on the number of records accepted by a bulk create
    pub max_bulk_records: usize,
    /// Column compared against the `since` / `until` timestamps
    pub updated_at_field: String,
    /// Scheme and authority prepended to generated links
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: API_PAGE_SIZE,
            max_bulk_records: MAX_BULK_RECORDS,
            updated_at_field: "updated_at".to_string(),
            base_url: "http://localhost".to_string(),
        }
    }
}

impl ApiConfig {
    /// Load a configuration from a JSON document, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document is malformed.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_updated_at_field(mut self, field: impl Into<String>) -> Self {
        self.updated_at_field = field.into();
        self
    }

    #[must_use]
    pub fn with_max_bulk_records(mut self, max: usize) -> Self {
        self.max_bulk_records = max;
        self
    }
}
