use querycrate::filtering::{FieldMode, build_nested_fields, parse_filters};
use querycrate::{FieldSet, NativeArgs, Pagination, QueryCompiler, QueryOptions, SortOrder, compile};
use serde_json::{Value, json};

mod common;
use common::object;

fn options(value: Value) -> QueryOptions {
    serde_json::from_value(value).expect("Failed to parse query options")
}

#[test]
fn test_filter_operators_through_compile() {
    let args = compile(&options(json!({
        "filters": {
            "age:gte": 18,
            "age:lt": 65,
            "name:startsWith": "Mo",
            "email:ends": "@example.com",
            "role:in": "admin",
            "status:ne": "banned",
        }
    })));

    assert_eq!(
        args.where_clause.map(Value::Object),
        Some(json!({
            "age": {"gte": 18, "lt": 65},
            "name": {"startsWith": "Mo", "caseInsensitive": true},
            "email": {"endsWith": "@example.com", "caseInsensitive": true},
            "role": {"in": ["admin"]},
            "status": {"not": "banned"},
        }))
    );
}

#[test]
fn test_relation_filter_object_is_untouched() {
    let relation = json!({"some": {"published": true, "title": {"contains": "rust"}}});
    let parsed = parse_filters(&object(json!({"posts": relation.clone()})));
    assert_eq!(parsed["posts"], relation);
}

#[test]
fn test_nested_select_example() {
    let fields: FieldSet = serde_json::from_value(json!(["id", {"profile": ["id", "bio"]}])).unwrap();
    let tree = build_nested_fields(Some(&fields), FieldMode::Select).map(Value::Object);
    assert_eq!(
        tree,
        Some(json!({"id": true, "profile": {"select": {"id": true, "bio": true}}}))
    );
}

#[test]
fn test_empty_field_list_requests_no_shape() {
    let empty = compile(&options(json!({"selectFields": [], "includeFields": {}})));
    assert!(empty.select.is_none());
    assert!(empty.include.is_none());

    let absent = compile(&QueryOptions::default());
    assert_eq!(empty, absent);
}

#[test]
fn test_deep_include_with_arguments() {
    let args = compile(&options(json!({
        "includeFields": [{
            "posts": {
                "where": {"published": true},
                "orderBy": {"createdAt": "desc"},
                "take": 3,
                "include": [{"comments": {"select": ["body"], "take": 1}}],
            }
        }]
    })));

    assert_eq!(
        args.include.map(Value::Object),
        Some(json!({
            "posts": {
                "where": {"published": true},
                "orderBy": {"createdAt": "desc"},
                "take": 3,
                "include": {"comments": {"select": {"body": true}, "take": 1}},
            }
        }))
    );
}

#[test]
fn test_search_or_has_one_clause_per_field() {
    let args = compile(&QueryOptions::new().search("mo", ["name", "bio", "email"]));
    let where_clause = args.where_clause.expect("search produces a where clause");
    let or = where_clause["OR"].as_array().expect("OR is a list");
    assert_eq!(or.len(), 3);
    assert_eq!(or[0], json!({"name": {"contains": "mo", "caseInsensitive": true}}));
}

#[test]
fn test_empty_search_is_ignored() {
    let args = compile(&QueryOptions::new().search("", ["name"]));
    assert!(args.where_clause.is_none());
}

#[test]
fn test_pagination_page_and_offset() {
    let paged = compile(&QueryOptions::new().paginate(Pagination::page(2, 10)));
    assert_eq!((paged.skip, paged.take), (Some(10), Some(10)));

    let first = compile(&QueryOptions::new().paginate(Pagination::page(1, 10)));
    assert_eq!(first.skip, Some(0));

    let offset = compile(&options(json!({"pagination": {"skip": 5}})));
    assert_eq!(offset.skip, Some(5));
    assert_eq!(offset.take, None);
    assert_eq!(offset.to_value(), json!({"skip": 5}));

    let backwards = compile(&options(json!({"pagination": {"skip": 1, "take": -10}})));
    assert_eq!((backwards.skip, backwards.take), (Some(1), Some(-10)));
}

#[test]
fn test_order_by_precedence_survives_compile() {
    // Parsed from text so the object's key order is the caller's
    let parsed: QueryOptions =
        serde_json::from_str(r#"{"orderBy": {"lastName": "asc", "firstName": "asc", "age": "DESC"}}"#)
            .unwrap();
    let args = compile(&parsed);
    assert_eq!(
        args.order_by,
        Some(json!([{"lastName": "asc"}, {"firstName": "asc"}, {"age": "desc"}]))
    );

    let single = compile(&QueryOptions::new().order_by("id", SortOrder::Asc));
    assert_eq!(single.order_by, Some(json!({"id": "asc"})));
}

#[test]
fn test_soft_delete_marker_merges_with_filters() {
    let args = compile(&options(json!({
        "filters": {"deletedAt:not": "2024-01-01"},
        "softDelete": true,
    })));
    assert_eq!(
        args.where_clause.unwrap()["deletedAt"],
        json!({"not": "2024-01-01", "equals": null})
    );

    let custom = QueryCompiler::new(Some("archivedAt".to_owned()))
        .compile(&QueryOptions::new().soft_delete(true));
    assert_eq!(custom.where_clause.map(Value::Object), Some(json!({"archivedAt": null})));
}

#[test]
fn test_full_options_compile_deterministically() {
    let raw = json!({
        "filters": {"age:gte": 18, "name:contains": "mo", "posts": {"some": {"published": true}}},
        "selectFields": ["id", "name", {"profile": ["bio"]}],
        "includeFields": {"posts": {"take": 2}},
        "search": {"term": "x", "fields": ["bio", "name"]},
        "pagination": {"page": 3, "limit": 25},
        "orderBy": {"createdAt": "desc"},
        "aggregate": {"_count": {"id": true}},
        "softDelete": true,
    });

    let first = compile(&options(raw.clone()));
    let second = compile(&options(raw));
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    assert_eq!((first.skip, first.take), (Some(50), Some(25)));
    assert_eq!(first.to_value()["_aggregate"], json!({"_count": {"id": true}}));
}

#[test]
fn test_native_args_round_trip_through_json() {
    let args = compile(&QueryOptions::new().filter("id", 1).paginate(Pagination::offset(None, Some(1))));
    let back: NativeArgs = serde_json::from_value(args.to_value()).unwrap();
    assert_eq!(back, args);
}
