//! Bulk create payloads.
//!
//! A bulk request carries a JSON array of records. The whole request is
//! rejected when the body is not JSON, not an array, or larger than the
//! configured limit. Past that point failures are per record: they are
//! collected in a [`BulkReport`] and returned in the envelope's `errors`
//! next to the records that were created.

use serde_json::{Value, json};

use crate::errors::{ApiError, ErrorDescriptor};
use crate::filtering::FilterQuery;

/// Validated body of a bulk create request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPayload {
    records: Vec<Value>,
}

impl BulkPayload {
    /// Decode and check a bulk request body.
    ///
    /// # Errors
    ///
    /// - [`ApiError::UnexpectedValue`] when the body is not valid JSON
    /// - [`ApiError::InvalidArgument`] when the JSON is not an array
    /// - [`ApiError::UnexpectedValue`] when there are more than `max_records` records
    pub fn parse(body: &[u8], max_records: usize) -> Result<Self, ApiError> {
        let data: Value = match serde_json::from_slice(body) {
            Ok(Value::Null) | Err(_) => {
                tracing::warn!("Rejecting bulk payload: body is not valid JSON");
                return Err(ApiError::expected_valid_json());
            }
            Ok(data) => data,
        };

        let Value::Array(records) = data else {
            tracing::warn!("Rejecting bulk payload: body is not a list");
            return Err(ApiError::invalid_argument(
                "Api data is not valid for BULK",
                "invalid argument",
            ));
        };

        if records.len() > max_records {
            tracing::warn!(count = records.len(), max_records, "Rejecting bulk payload: request too large");
            return Err(ApiError::unexpected_value("Request too large", "Invalid request"));
        }

        Ok(Self { records })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Value> {
        self.records.iter()
    }
}

impl IntoIterator for BulkPayload {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Outcome of a bulk create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    pub created_ids: Vec<i64>,
    pub errors: Vec<ErrorDescriptor>,
}

impl BulkReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&mut self, id: i64) {
        self.created_ids.push(id);
    }

    /// Record a rejected input as a validation error carrying the messages and the input.
    pub fn rejected(&mut self, record: &Value, messages: Vec<String>) {
        let error = ApiError::validation()
            .with_info(json!({ "errors": messages }))
            .with_info(json!({ "context": record }));
        self.errors.push(error.descriptor());
    }

    /// Record a failure that isn't a validation problem.
    pub fn failed(&mut self, error: &ApiError) {
        self.errors.push(error.descriptor());
    }

    /// Query selecting the created records, in creation order of their ids.
    #[must_use]
    pub fn created_query(&self, id_column: &str) -> FilterQuery {
        FilterQuery::by_ids(id_column, &self.created_ids)
    }
}
