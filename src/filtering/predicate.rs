//! Typed filter predicates and sort orders.

use chrono::{DateTime, Utc};
use sea_orm::Value;
use std::fmt;

use super::fields::FieldKind;

/// Separator between entity and field in a nested filter key (`owner_name`).
pub const NESTED_SEPARATOR: char = '_';

/// Comparison operators produced by the filter builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equality (=)
    Eq,
    /// Not equal (!=)
    Neq,
    /// Substring match
    Like,
    /// Negated substring match
    NotLike,
    /// Member of a list
    In,
    /// Not a member of a list
    NotIn,
    /// Greater than (>), only used for `since`
    Gt,
    /// Less than (<), only used for `until`
    Lt,
}

impl FilterOperator {
    /// Pick the operator for a field kind.
    ///
    /// Strings always use a substring match; integer-like fields switch to a
    /// list match when the value holds several comma separated entries.
    #[must_use]
    pub const fn for_kind(kind: FieldKind, negated: bool, is_list: bool) -> Self {
        match (kind, is_list) {
            (FieldKind::String, _) => Self::like(negated),
            (FieldKind::Integer | FieldKind::Association, true) => Self::is_in(negated),
            _ => Self::equals(negated),
        }
    }

    #[must_use]
    pub const fn equals(negated: bool) -> Self {
        if negated { Self::Neq } else { Self::Eq }
    }

    #[must_use]
    pub const fn like(negated: bool) -> Self {
        if negated { Self::NotLike } else { Self::Like }
    }

    #[must_use]
    pub const fn is_in(negated: bool) -> Self {
        if negated { Self::NotIn } else { Self::In }
    }

    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Where a predicate points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// Column on the queried entity
    Direct(String),
    /// Column on a joined relation, addressed by the relation's alias
    Nested { relation: String, field: String },
}

impl FieldPath {
    /// Split a nested filter key on its first underscore.
    ///
    /// Returns `None` when the key has no underscore or either side is empty.
    #[must_use]
    pub fn nested(key: &str) -> Option<Self> {
        let (relation, field) = key.split_once(NESTED_SEPARATOR)?;
        if relation.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self::Nested {
            relation: relation.to_string(),
            field: field.to_string(),
        })
    }

    #[must_use]
    pub const fn is_nested(&self) -> bool {
        matches!(self, Self::Nested { .. })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(field) => f.write_str(field),
            Self::Nested { relation, field } => write!(f, "{relation}.{field}"),
        }
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateValue {
    Single(String),
    List(Vec<String>),
    Timestamp(DateTime<Utc>),
}

/// Why a predicate could not be built. The builder drops such predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    /// Integer-like field received a value that isn't an integer
    NotAnInteger(String),
    /// Value longer than the accepted maximum
    ValueTooLong(usize),
    /// List operator without list value, or the reverse
    ShapeMismatch(FilterOperator),
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnInteger(value) => write!(f, "expected an integer, got '{value}'"),
            Self::ValueTooLong(len) => write!(f, "value of {len} characters is too long"),
            Self::ShapeMismatch(op) => write!(f, "value shape does not fit operator {op}"),
        }
    }
}

impl std::error::Error for PredicateError {}

/// A single AND-conjoined filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    pub path: FieldPath,
    pub operator: FilterOperator,
    pub value: PredicateValue,
    /// Kind the value is bound as; nested paths are not typed
    pub kind: FieldKind,
}

impl QueryPredicate {
    /// Bind the value(s) as database values, typed by the field kind.
    ///
    /// # Errors
    ///
    /// Fails when an integer-like field holds a non-integer value or when the
    /// value shape doesn't match the operator.
    pub fn bind_values(&self) -> Result<Vec<Value>, PredicateError> {
        match (&self.value, self.operator.is_list()) {
            (PredicateValue::Single(value), false) => Ok(vec![self.bind(value)?]),
            (PredicateValue::List(values), true) => {
                values.iter().map(|value| self.bind(value)).collect()
            }
            (PredicateValue::Timestamp(at), false) => Ok(vec![Value::from(*at)]),
            _ => Err(PredicateError::ShapeMismatch(self.operator)),
        }
    }

    fn bind(&self, value: &str) -> Result<Value, PredicateError> {
        if self.kind.is_integer_like() {
            let trimmed = value.trim();
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| PredicateError::NotAnInteger(trimmed.to_string()))
        } else {
            Ok(Value::from(value.to_string()))
        }
    }
}

impl fmt::Display for QueryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PredicateValue::Single(value) => write!(f, "{} {} '{value}'", self.path, self.operator),
            PredicateValue::List(values) => {
                write!(f, "{} {} ({})", self.path, self.operator, values.join(","))
            }
            PredicateValue::Timestamp(at) => {
                write!(f, "{} {} '{}'", self.path, self.operator, at.to_rfc3339())
            }
        }
    }
}

/// Sort direction; anything but `DESC` (case-insensitive) sorts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_uppercase()).as_deref() {
            Some("DESC") => Self::Desc,
            _ => Self::Asc,
        }
    }
}

impl From<SortDirection> for sea_orm::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// Ordering on a column of the queried entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// A composed, source-independent list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub predicates: Vec<QueryPredicate>,
    pub order: Vec<OrderBy>,
}

impl FilterQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whose id column is one of `ids`. An empty list matches nothing.
    #[must_use]
    pub fn by_ids(id_column: &str, ids: &[i64]) -> Self {
        Self {
            predicates: vec![QueryPredicate {
                path: FieldPath::Direct(id_column.to_string()),
                operator: FilterOperator::In,
                value: PredicateValue::List(ids.iter().map(ToString::to_string).collect()),
                kind: FieldKind::Integer,
            }],
            order: vec![OrderBy {
                column: id_column.to_string(),
                direction: SortDirection::Asc,
            }],
        }
    }

    pub fn push(&mut self, predicate: QueryPredicate) {
        self.predicates.push(predicate);
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: SortDirection) {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
    }

    /// Predicates touching `path`, in insertion order.
    pub fn predicates_on<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a QueryPredicate> {
        self.predicates
            .iter()
            .filter(move |predicate| predicate.path.to_string() == path)
    }
}

impl fmt::Display for FilterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions: Vec<String> = self.predicates.iter().map(ToString::to_string).collect();
        f.write_str(&conditions.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicate(kind: FieldKind, operator: FilterOperator, value: PredicateValue) -> QueryPredicate {
        QueryPredicate {
            path: FieldPath::Direct("field".to_string()),
            operator,
            value,
            kind,
        }
    }

    #[test]
    fn test_operator_selection() {
        assert_eq!(FilterOperator::for_kind(FieldKind::String, false, true), FilterOperator::Like);
        assert_eq!(FilterOperator::for_kind(FieldKind::String, true, false), FilterOperator::NotLike);
        assert_eq!(FilterOperator::for_kind(FieldKind::Integer, false, true), FilterOperator::In);
        assert_eq!(FilterOperator::for_kind(FieldKind::Association, true, true), FilterOperator::NotIn);
        assert_eq!(FilterOperator::for_kind(FieldKind::Integer, true, false), FilterOperator::Neq);
        assert_eq!(FilterOperator::for_kind(FieldKind::Scalar, false, true), FilterOperator::Eq);
    }

    #[test]
    fn test_nested_path_split() {
        assert_eq!(
            FieldPath::nested("owner_display_name"),
            Some(FieldPath::Nested {
                relation: "owner".to_string(),
                field: "display_name".to_string()
            })
        );
        assert_eq!(FieldPath::nested("owner_name").unwrap().to_string(), "owner.name");
        assert_eq!(FieldPath::nested("_name"), None);
        assert_eq!(FieldPath::nested("owner_"), None);
        assert_eq!(FieldPath::nested("plain"), None);
    }

    #[test]
    fn test_integer_binding() {
        let p = predicate(
            FieldKind::Integer,
            FilterOperator::In,
            PredicateValue::List(vec!["1".into(), "2".into(), "3".into()]),
        );
        assert_eq!(
            p.bind_values().unwrap(),
            vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]
        );

        let p = predicate(FieldKind::Integer, FilterOperator::Eq, PredicateValue::Single("x".into()));
        assert_eq!(p.bind_values(), Err(PredicateError::NotAnInteger("x".into())));
    }

    #[test]
    fn test_string_binding_keeps_text() {
        let p = predicate(FieldKind::String, FilterOperator::Like, PredicateValue::Single("%abc%".into()));
        assert_eq!(p.bind_values().unwrap(), vec![Value::from("%abc%".to_string())]);
    }

    #[test]
    fn test_shape_mismatch() {
        let p = predicate(FieldKind::Integer, FilterOperator::In, PredicateValue::Single("1".into()));
        assert_eq!(p.bind_values(), Err(PredicateError::ShapeMismatch(FilterOperator::In)));
    }

    #[test]
    fn test_sort_direction_parsing() {
        assert_eq!(SortDirection::parse(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some(" DESC ")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(None), SortDirection::Asc);
    }

    #[test]
    fn test_by_ids_query() {
        let query = FilterQuery::by_ids("id", &[4, 9]);
        assert_eq!(query.to_string(), "id IN (4,9)");
        assert_eq!(query.order[0].column, "id");
    }

    #[test]
    fn test_display() {
        let p = predicate(FieldKind::String, FilterOperator::NotLike, PredicateValue::Single("%a%".into()));
        assert_eq!(p.to_string(), "field NOT LIKE '%a%'");
    }
}
