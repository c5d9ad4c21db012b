//! Query parameter to filter query translation.
//!
//! Filtering is permissive: unknown fields, blank values and values that
//! don't fit the field are skipped, never reported back to the client.

use chrono::{DateTime, Utc};

use super::fields::{EntityMetadata, FieldKind, field_exists, resolve};
use super::params::{
    FilterParam, ORDER_BY_PARAM, ORDER_BY_SORT_PARAM, SINCE_PARAM, UNTIL_PARAM, is_reserved,
    merge_params, param_value,
};
use super::predicate::{
    FieldPath, FilterOperator, FilterQuery, PredicateError, PredicateValue, QueryPredicate,
    SortDirection,
};

const MAX_FIELD_VALUE_LENGTH: usize = 10_000;
const LIST_SEPARATOR: char = ',';

/// Builds a [`FilterQuery`] from request parameters for one entity.
pub struct QueryFilterBuilder<'a, M: EntityMetadata + ?Sized> {
    metadata: &'a M,
    updated_at_field: &'a str,
}

impl<'a, M: EntityMetadata + ?Sized> QueryFilterBuilder<'a, M> {
    pub fn new(metadata: &'a M, updated_at_field: &'a str) -> Self {
        Self {
            metadata,
            updated_at_field,
        }
    }

    /// Translate query parameters plus caller-supplied filters into a query.
    ///
    /// `extra` takes precedence over `params` for the same key.
    pub fn build(&self, params: &[(String, String)], extra: &[(String, String)]) -> FilterQuery {
        let all_params = merge_params(params, extra);
        let mut query = FilterQuery::new();

        if let Some(raw) = param_value(&all_params, SINCE_PARAM) {
            self.push_range(&mut query, SINCE_PARAM, raw, FilterOperator::Gt);
        }
        if let Some(raw) = param_value(&all_params, UNTIL_PARAM) {
            self.push_range(&mut query, UNTIL_PARAM, raw, FilterOperator::Lt);
        }
        if let Some(field) = param_value(&all_params, ORDER_BY_PARAM) {
            let direction = SortDirection::parse(param_value(&all_params, ORDER_BY_SORT_PARAM));
            self.push_order(&mut query, field, direction);
        }

        for (key, value) in &all_params {
            if is_reserved(key) {
                continue;
            }

            let param = FilterParam::parse(key, value);
            if param.is_blank() {
                continue;
            }

            // Dropping is intentional: a malformed filter must not fail the request.
            match self.predicate_for(&param) {
                Ok(Some(predicate)) => query.push(predicate),
                Ok(None) => {
                    tracing::debug!(key = %param.key, "Ignoring filter on unknown field");
                }
                Err(error) => {
                    tracing::debug!(key = %param.key, error = %error, "Dropping malformed filter");
                }
            }
        }

        query
    }

    /// Build the predicate for one filter, `Ok(None)` when the field is unknown.
    fn predicate_for(&self, param: &FilterParam) -> Result<Option<QueryPredicate>, PredicateError> {
        if param.raw_value.len() > MAX_FIELD_VALUE_LENGTH {
            return Err(PredicateError::ValueTooLong(param.raw_value.len()));
        }

        let descriptor = resolve(self.metadata, &param.key);

        let predicate = if descriptor.kind == FieldKind::Unknown {
            // Nested keys pass through without checking the related entity's fields.
            let Some(path) = FieldPath::nested(&param.key) else {
                return Ok(None);
            };
            QueryPredicate {
                path,
                operator: FilterOperator::equals(param.negated),
                value: PredicateValue::Single(param.raw_value.clone()),
                kind: FieldKind::Unknown,
            }
        } else {
            let column = self
                .metadata
                .column_name(&param.key)
                .unwrap_or_else(|| param.key.clone());
            let is_list = descriptor.kind.is_integer_like() && param.raw_value.contains(LIST_SEPARATOR);
            let operator = FilterOperator::for_kind(descriptor.kind, param.negated, is_list);

            let value = match operator {
                FilterOperator::Like | FilterOperator::NotLike => {
                    PredicateValue::Single(format!("%{}%", param.raw_value))
                }
                FilterOperator::In | FilterOperator::NotIn => PredicateValue::List(
                    param
                        .raw_value
                        .split(LIST_SEPARATOR)
                        .map(|item| item.trim().to_string())
                        .collect(),
                ),
                _ => PredicateValue::Single(param.raw_value.clone()),
            };

            QueryPredicate {
                path: FieldPath::Direct(column),
                operator,
                value,
                kind: descriptor.kind,
            }
        };

        predicate.bind_values()?;
        Ok(Some(predicate))
    }

    fn push_range(&self, query: &mut FilterQuery, key: &str, raw: &str, operator: FilterOperator) {
        let Some(at) = parse_timestamp(raw) else {
            tracing::debug!(key, value = raw, "Ignoring unparseable timestamp");
            return;
        };

        query.push(QueryPredicate {
            path: FieldPath::Direct(self.updated_at_field.to_string()),
            operator,
            value: PredicateValue::Timestamp(at),
            kind: FieldKind::Scalar,
        });
    }

    fn push_order(&self, query: &mut FilterQuery, field: &str, direction: SortDirection) {
        if !field_exists(self.metadata, field) {
            tracing::debug!(field, "Ignoring orderBy on unknown field");
            return;
        }
        let column = self
            .metadata
            .column_name(field)
            .unwrap_or_else(|| field.to_string());
        query.order_by(column, direction);
    }
}

/// Unix seconds to UTC timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}
