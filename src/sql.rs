//! Render compiled arguments with SeaORM's query builder.
//!
//! For stores built on SeaORM: [`condition_from_where`] turns a compiled
//! `where` tree into a [`Condition`], and [`apply_native_args`] applies the
//! condition, ordering and paging of a [`NativeArgs`] to a `SELECT`.
//!
//! Shapes with no single-table rendering (relation filters such as `some`,
//! `every` and `none`, unknown operators, negative `take`) are rejected with
//! [`UnsupportedCondition`]. Dropping them would widen the result set.

use sea_orm::sea_query::{Alias, Condition, Expr, Func, LikeExpr, Order, SelectStatement, SimpleExpr};
use serde_json::{Map, Value};

use crate::filtering::conditions::{AND, CASE_INSENSITIVE, EQUALS, NOT, OR};
use crate::filtering::search::escape_like_wildcards;
use crate::filtering::sort::{SortOrder, order_entries};
use crate::models::NativeArgs;

/// A compiled argument that cannot be expressed as a single-table `SELECT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCondition {
    pub field: String,
    pub operator: Option<String>,
}

impl UnsupportedCondition {
    fn new(field: &str, operator: Option<&str>) -> Self {
        Self {
            field: field.to_owned(),
            operator: operator.map(str::to_owned),
        }
    }
}

impl std::fmt::Display for UnsupportedCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.operator {
            Some(operator) => write!(f, "Cannot render `{}` on `{}` as SQL", operator, self.field),
            None => write!(f, "Cannot render condition on `{}` as SQL", self.field),
        }
    }
}

impl std::error::Error for UnsupportedCondition {}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Clone, Copy)]
enum LikeKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// Build a SeaORM condition from a compiled `where` tree.
///
/// `AND` and `OR` take an object or a list of objects. `NOT` with a list
/// requires every clause to be false; with an object, the object as a whole.
///
/// # Errors
///
/// Returns [`UnsupportedCondition`] for the first entry that has no SQL
/// rendering, such as a relation filter or an unknown operator.
pub fn condition_from_where(where_clause: &Map<String, Value>) -> Result<Condition, UnsupportedCondition> {
    let mut condition = Condition::all();

    for (key, value) in where_clause {
        let part = match key.as_str() {
            AND => {
                let mut all = Condition::all();
                for clause in clauses(key, value)? {
                    all = all.add(condition_from_where(clause)?);
                }
                all
            }
            OR => {
                let mut any = Condition::any();
                for clause in clauses(key, value)? {
                    any = any.add(condition_from_where(clause)?);
                }
                any
            }
            NOT => match value {
                Value::Array(_) => {
                    let mut none = Condition::all();
                    for clause in clauses(key, value)? {
                        none = none.add(condition_from_where(clause)?.not());
                    }
                    none
                }
                _ => {
                    let inner = clauses(key, value)?;
                    let mut all = Condition::all();
                    for clause in inner {
                        all = all.add(condition_from_where(clause)?);
                    }
                    all.not()
                }
            },
            field => field_condition(field, value, false)?,
        };
        condition = condition.add(part);
    }

    Ok(condition)
}

/// Apply `where`, `orderBy`, `take` and `skip` to a select statement
///
/// # Errors
///
/// Returns [`UnsupportedCondition`] if the `where` tree cannot be rendered,
/// or if `skip` or `take` is negative.
pub fn apply_native_args(select: &mut SelectStatement, args: &NativeArgs) -> Result<(), UnsupportedCondition> {
    if let Some(where_clause) = &args.where_clause {
        select.cond_where(condition_from_where(where_clause)?);
    }
    if let Some(order_by) = &args.order_by {
        for (field, order) in order_entries(order_by) {
            select.order_by(Alias::new(field), Order::from(order));
        }
    }
    if let Some(take) = args.take {
        let take = u64::try_from(take).map_err(|_| UnsupportedCondition::new("take", None))?;
        select.limit(take);
    }
    if let Some(skip) = args.skip {
        let skip = u64::try_from(skip).map_err(|_| UnsupportedCondition::new("skip", None))?;
        select.offset(skip);
    }
    Ok(())
}

fn clauses<'a>(key: &str, value: &'a Value) -> Result<Vec<&'a Map<String, Value>>, UnsupportedCondition> {
    match value {
        Value::Object(clause) => Ok(vec![clause]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_object().ok_or_else(|| UnsupportedCondition::new(key, None)))
            .collect(),
        _ => Err(UnsupportedCondition::new(key, None)),
    }
}

fn field_condition(field: &str, value: &Value, inherited_ci: bool) -> Result<Condition, UnsupportedCondition> {
    let Value::Object(operators) = value else {
        let expr = equality(field, value).ok_or_else(|| UnsupportedCondition::new(field, None))?;
        return Ok(Condition::all().add(expr));
    };

    let case_insensitive = inherited_ci || operators.get(CASE_INSENSITIVE) == Some(&Value::Bool(true));
    let mut condition = Condition::all();
    for (operator, operand) in operators {
        if operator == CASE_INSENSITIVE {
            continue;
        }
        let part = operator_condition(field, operator, operand, case_insensitive)
            .ok_or_else(|| UnsupportedCondition::new(field, Some(operator)))?;
        condition = condition.add(part);
    }
    Ok(condition)
}

fn operator_condition(
    field: &str,
    operator: &str,
    operand: &Value,
    case_insensitive: bool,
) -> Option<Condition> {
    let column = || Expr::col(Alias::new(field));
    let expr = match operator {
        EQUALS => equality(field, operand),
        "not" => match operand {
            Value::Null => Some(column().is_not_null()),
            Value::Object(_) => {
                return field_condition(field, operand, case_insensitive)
                    .ok()
                    .map(Condition::not);
            }
            Value::Array(_) => None,
            scalar => sql_value(scalar).map(|value| column().ne(value)),
        },
        "gt" => sql_value(operand).map(|value| column().gt(value)),
        "gte" => sql_value(operand).map(|value| column().gte(value)),
        "lt" => sql_value(operand).map(|value| column().lt(value)),
        "lte" => sql_value(operand).map(|value| column().lte(value)),
        "contains" => like(field, operand, LikeKind::Contains, case_insensitive),
        "startsWith" => like(field, operand, LikeKind::StartsWith, case_insensitive),
        "endsWith" => like(field, operand, LikeKind::EndsWith, case_insensitive),
        "in" => sql_values(operand).map(|values| column().is_in(values)),
        "notIn" => sql_values(operand).map(|values| column().is_not_in(values)),
        _ => None,
    };
    expr.map(|expr| Condition::all().add(expr))
}

fn equality(field: &str, value: &Value) -> Option<SimpleExpr> {
    let column = Expr::col(Alias::new(field));
    if value.is_null() {
        return Some(column.is_null());
    }
    sql_value(value).map(|value| column.eq(value))
}

fn like(field: &str, operand: &Value, kind: LikeKind, case_insensitive: bool) -> Option<SimpleExpr> {
    let term = escape_like_wildcards(operand.as_str()?);
    let pattern = match kind {
        LikeKind::Contains => format!("%{term}%"),
        LikeKind::StartsWith => format!("{term}%"),
        LikeKind::EndsWith => format!("%{term}"),
    };

    let column = Expr::col(Alias::new(field));
    if case_insensitive {
        Some(Expr::expr(Func::upper(column)).like(LikeExpr::new(pattern.to_uppercase()).escape('\\')))
    } else {
        Some(column.like(LikeExpr::new(pattern).escape('\\')))
    }
}

fn sql_value(value: &Value) -> Option<sea_orm::Value> {
    match value {
        Value::Bool(flag) => Some((*flag).into()),
        Value::Number(number) => number
            .as_i64()
            .map(Into::into)
            .or_else(|| number.as_u64().map(Into::into))
            .or_else(|| number.as_f64().map(Into::into)),
        Value::String(text) => Some(text.clone().into()),
        _ => None,
    }
}

fn sql_values(value: &Value) -> Option<Vec<sea_orm::Value>> {
    match value {
        Value::Array(items) => items.iter().map(sql_value).collect(),
        scalar => sql_value(scalar).map(|value| vec![value]),
    }
}
