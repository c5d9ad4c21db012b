use sea_orm::{
    Condition, Order,
    sea_query::{Alias, Expr, SimpleExpr},
};

use super::predicate::{
    FieldPath, FilterOperator, FilterQuery, PredicateError, PredicateValue, QueryPredicate,
};

/// Column reference for a path; direct columns are qualified by `table`.
#[must_use]
pub fn column_expr(path: &FieldPath, table: &str) -> Expr {
    match path {
        FieldPath::Direct(column) => Expr::col((Alias::new(table), Alias::new(column))),
        FieldPath::Nested { relation, field } => {
            Expr::col((Alias::new(relation), Alias::new(field)))
        }
    }
}

/// Translate one predicate into a SQL expression.
///
/// # Errors
///
/// Returns a [`PredicateError`] when the value can't be bound for the
/// predicate's field kind or doesn't fit the operator.
pub fn predicate_expr(predicate: &QueryPredicate, table: &str) -> Result<SimpleExpr, PredicateError> {
    let column = column_expr(&predicate.path, table);

    if let FilterOperator::Like | FilterOperator::NotLike = predicate.operator {
        let PredicateValue::Single(pattern) = &predicate.value else {
            return Err(PredicateError::ShapeMismatch(predicate.operator));
        };
        return Ok(if predicate.operator == FilterOperator::Like {
            column.like(pattern.as_str())
        } else {
            column.not_like(pattern.as_str())
        });
    }

    let mut values = predicate.bind_values()?;
    if predicate.operator.is_list() {
        return Ok(if predicate.operator == FilterOperator::In {
            column.is_in(values)
        } else {
            column.is_not_in(values)
        });
    }

    let value = values
        .pop()
        .ok_or(PredicateError::ShapeMismatch(predicate.operator))?;
    Ok(match predicate.operator {
        FilterOperator::Neq => column.ne(value),
        FilterOperator::Gt => column.gt(value),
        FilterOperator::Lt => column.lt(value),
        _ => column.eq(value),
    })
}

/// AND-conjoin every predicate of the query.
///
/// Predicates that fail to translate are left out of the condition.
#[must_use]
pub fn build_condition(query: &FilterQuery, table: &str) -> Condition {
    query
        .predicates
        .iter()
        .fold(Condition::all(), |condition, predicate| {
            match predicate_expr(predicate, table) {
                Ok(expr) => condition.add(expr),
                Err(error) => {
                    tracing::debug!(predicate = %predicate, error = %error, "Skipping predicate");
                    condition
                }
            }
        })
}

/// Sort expressions for the query, in order of precedence.
#[must_use]
pub fn order_exprs(query: &FilterQuery, table: &str) -> Vec<(SimpleExpr, Order)> {
    query
        .order
        .iter()
        .map(|order| {
            let column = column_expr(&FieldPath::Direct(order.column.clone()), table);
            (SimpleExpr::from(column), order.direction.into())
        })
        .collect()
}
