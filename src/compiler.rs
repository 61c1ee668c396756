use serde_json::{Map, Value};

use crate::filtering::conditions::{OR, merge_field, merge_maps, parse_filters};
use crate::filtering::nested::{FieldMode, build_nested_fields};
use crate::filtering::search::build_search_condition;
use crate::models::{NativeArgs, QueryOptions};

/// Field used to mark soft-deleted rows unless configured otherwise
pub const DEFAULT_SOFT_DELETE_FIELD: &str = "deletedAt";

/// Compiles [`QueryOptions`] into [`NativeArgs`].
///
/// Compilation is pure: equal options always give equal arguments, and
/// because every map is key-sorted, equal JSON text as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCompiler {
    soft_delete_field: Option<String>,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self {
            soft_delete_field: Some(DEFAULT_SOFT_DELETE_FIELD.to_owned()),
        }
    }
}

impl QueryCompiler {
    /// Compiler using `soft_delete_field` as the soft-delete marker; `None`
    /// makes `softDelete` a no-op
    #[must_use]
    pub fn new(soft_delete_field: Option<String>) -> Self {
        Self { soft_delete_field }
    }

    #[must_use]
    pub fn soft_delete_field(&self) -> Option<&str> {
        self.soft_delete_field.as_deref()
    }

    /// Build native arguments from shorthand options
    #[must_use]
    pub fn compile(&self, options: &QueryOptions) -> NativeArgs {
        let mut where_clause = Map::new();

        if let Some(filters) = options.filters.as_ref().filter(|filters| !filters.is_empty()) {
            merge_maps(&mut where_clause, parse_filters(filters));
        }

        if options.soft_delete {
            if let Some(marker) = &self.soft_delete_field {
                merge_field(&mut where_clause, marker, Value::Null);
            }
        }

        let select = overlay(
            build_nested_fields(options.select_fields.as_ref(), FieldMode::Select),
            options.select.as_ref(),
        );
        let include = overlay(
            build_nested_fields(options.include_fields.as_ref(), FieldMode::Include),
            options.include.as_ref(),
        );

        if let Some(disjunction) = options.search.as_ref().and_then(build_search_condition) {
            merge_field(&mut where_clause, OR, disjunction);
        }

        let (skip, take) = options
            .pagination
            .map_or((None, None), |pagination| pagination.to_skip_take());

        let order_by = options
            .order_by
            .as_ref()
            .filter(|order_by| !order_by.is_empty())
            .map(|order_by| order_by.to_value());

        let args = NativeArgs {
            where_clause: (!where_clause.is_empty()).then_some(where_clause),
            select,
            include,
            skip,
            take,
            order_by,
            data: options.data.clone(),
            aggregate: options.aggregate.clone(),
            extra: Map::new(),
        };

        tracing::trace!(
            has_where = args.where_clause.is_some(),
            has_select = args.select.is_some(),
            has_include = args.include.is_some(),
            skip = ?args.skip,
            take = ?args.take,
            "Compiled query options"
        );

        args
    }
}

/// Compile with the default soft-delete marker
#[must_use]
pub fn compile(options: &QueryOptions) -> NativeArgs {
    QueryCompiler::default().compile(options)
}

// Native entries replace built ones key by key.
fn overlay(
    built: Option<Map<String, Value>>,
    native: Option<&Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (built, native) {
        (built, None) => built,
        (None, Some(native)) => Some(native.clone()),
        (Some(mut built), Some(native)) => {
            for (key, value) in native {
                built.insert(key.clone(), value.clone());
            }
            Some(built)
        }
    }
}
