//! Integration tests for the filter engine
//!
//! Filters are compiled against an in-memory catalog and rendered through a
//! backend that records every call as readable text.

use serde_json::json;
use siphon_core::{
    reconstruct, reconstruct_json, Backend, Catalog, Column, ColumnRestriction, Compiler, Expression,
    FilterError, FilterInput, Junction, Operator, OperatorKind, OrderBy, RestrictionPolicy,
    RestrictionSet, SelectedColumns, Selection, Table,
};

// =========================================================================
// Test Helpers
// =========================================================================

/// Query that records what the backend applied to it
#[derive(Debug, Clone, Default)]
struct RecordedQuery {
    selection: Selection,
    steps: Vec<String>,
}

struct RecordingBackend;

impl Backend for RecordingBackend {
    type Column = Column;
    type Predicate = String;
    type Query = RecordedQuery;

    fn selected_column(&self, query: &RecordedQuery, name: &str) -> Option<Column> {
        query.selection.selected(name)
    }

    fn evaluate(&self, column: &Column, operator: &Operator) -> String {
        format!("{} {}", column.name, operator)
    }

    fn and(&self, predicates: Vec<String>) -> String {
        format!("({})", predicates.join(" AND "))
    }

    fn or(&self, predicates: Vec<String>) -> String {
        format!("({})", predicates.join(" OR "))
    }

    fn apply_predicate(&self, mut query: RecordedQuery, predicate: String) -> RecordedQuery {
        query.steps.push(format!("where {}", predicate));
        query
    }

    fn apply_limit(&self, mut query: RecordedQuery, limit: u64) -> RecordedQuery {
        query.steps.push(format!("limit {}", limit));
        query
    }

    fn apply_offset(&self, mut query: RecordedQuery, offset: u64) -> RecordedQuery {
        query.steps.push(format!("offset {}", offset));
        query
    }

    fn apply_ordering(&self, mut query: RecordedQuery, order_by: &[OrderBy<Column>]) -> RecordedQuery {
        let specs: Vec<String> = order_by
            .iter()
            .map(|o| format!("{} {}", o.column.name, if o.ascending { "asc" } else { "desc" }))
            .collect();
        query.steps.push(format!("order by {}", specs.join(", ")));
        query
    }
}

fn people() -> Table {
    Table::new("tt", ["name", "age", "city"])
}

fn compiler() -> Compiler<Catalog> {
    Compiler::new(Catalog::new().with_table(people()))
}

fn select_people() -> RecordedQuery {
    RecordedQuery {
        selection: Selection::all_of(&people()),
        steps: Vec::new(),
    }
}

fn build(input: serde_json::Value, restrictions: &RestrictionSet) -> Result<Vec<String>, FilterError> {
    let input = FilterInput::from_json(&input)?;
    let query = compiler().build(&RecordingBackend, select_people(), &input, restrictions)?;
    Ok(query.steps)
}

fn compile(input: serde_json::Value) -> Expression<Column> {
    let input = FilterInput::from_json(&input).unwrap();
    compiler()
        .compile(&input, &Selection::all_of(&people()), &RestrictionSet::new())
        .unwrap()
        .expression
        .unwrap()
}

fn render(expression: &Expression<Column>) -> Option<String> {
    expression.render(&RecordingBackend)
}

// =========================================================================
// Compilation and rendering
// =========================================================================

#[test]
fn test_compile_and_render_junctions() {
    let expression = compile(json!({
        "and": {"name": {"eq": "John"}, "age": {"gt": 20}},
        "or": {"age": {"lt": 10}, "name": {"eq": "Doe"}}
    }));

    assert_eq!(expression.kind(), Some(Junction::And));
    assert_eq!(
        render(&expression).unwrap(),
        "((name eq John AND age gt 20) AND (age lt 10 OR name eq Doe))"
    );
}

#[test]
fn test_build_applies_predicate_then_modifiers() {
    let steps = build(
        json!({
            "order_by": ["+name", "-age"],
            "age": {"ge": 18},
            "offset": "20",
            "limit": 10
        }),
        &RestrictionSet::new(),
    )
    .unwrap();

    assert_eq!(
        steps,
        vec![
            "where age ge 18".to_string(),
            "limit 10".to_string(),
            "offset 20".to_string(),
            "order by name asc, age desc".to_string(),
        ]
    );
}

#[test]
fn test_build_without_filters() {
    assert!(build(json!({}), &RestrictionSet::new()).unwrap().is_empty());
    assert_eq!(
        build(json!({"limit": "12"}), &RestrictionSet::new()).unwrap(),
        vec!["limit 12".to_string()]
    );
    assert!(matches!(
        build(json!({"limit": "abc"}), &RestrictionSet::new()),
        Err(FilterError::InvalidValueType(_))
    ));
}

#[test]
fn test_build_resolves_query_labels() {
    let query = RecordedQuery {
        selection: Selection::new(vec![Column::new("tt", "name").labeled("who")]),
        steps: Vec::new(),
    };
    let input = FilterInput::from_json(&json!({"who": {"eq": "Ann"}})).unwrap();
    let query = compiler()
        .build(&RecordingBackend, query, &input, &RestrictionSet::new())
        .unwrap();
    assert_eq!(query.steps, vec!["where name eq Ann".to_string()]);

    // Columns outside the selection only resolve when qualified
    let query = RecordedQuery::default();
    let qualified = FilterInput::from_json(&json!({"tt.city": {"in": ["Oslo"]}})).unwrap();
    let query = compiler()
        .build(&RecordingBackend, query, &qualified, &RestrictionSet::new())
        .unwrap();
    assert_eq!(query.steps, vec!["where city in [Oslo]".to_string()]);

    let bare = FilterInput::from_json(&json!({"city": {"eq": "Oslo"}})).unwrap();
    assert!(matches!(
        compiler().build(&RecordingBackend, RecordedQuery::default(), &bare, &RestrictionSet::new()),
        Err(FilterError::ColumnError(_))
    ));
}

#[test]
fn test_parse_json_text() {
    let input = FilterInput::parse(r#"{"name": {"nin": ["a", "b"]}}"#).unwrap();
    let query = compiler()
        .build(&RecordingBackend, select_people(), &input, &RestrictionSet::new())
        .unwrap();
    assert_eq!(query.steps, vec!["where name not_in [a, b]".to_string()]);

    assert!(matches!(
        FilterInput::parse("[1, 2]"),
        Err(FilterError::InvalidFilteringStructure(_))
    ));
}

// =========================================================================
// Restrictions
// =========================================================================

#[test]
fn test_deny_restriction_gate() {
    let wildcard = RestrictionSet::from_model(RestrictionPolicy::Deny, &json!({"age": {"eq": {"any": true}}})).unwrap();
    assert!(matches!(
        build(json!({"age": {"eq": 20}}), &wildcard),
        Err(FilterError::FiltrationNotAllowed { .. })
    ));
    assert!(build(json!({"age": {"gt": 20}}), &wildcard).is_ok());

    let exact = RestrictionSet::from_model(RestrictionPolicy::Deny, &json!({"age": {"eq": 20}})).unwrap();
    assert!(matches!(
        build(json!({"age": {"eq": 20}}), &exact),
        Err(FilterError::FiltrationNotAllowed { .. })
    ));
    assert!(build(json!({"age": {"eq": 21}}), &exact).is_ok());
}

#[test]
fn test_allow_restriction_gate() {
    let restrictions = RestrictionSet::new().with(
        ColumnRestriction::allow("city")
            .any(OperatorKind::In)
            .exact(OperatorKind::Eq, "Oslo"),
    );

    assert!(build(json!({"city": {"in": ["Oslo", "Bergen"]}}), &restrictions).is_ok());
    assert!(build(json!({"city": {"eq": "Oslo"}}), &restrictions).is_ok());
    assert_eq!(
        build(json!({"city": {"eq": "Bergen"}}), &restrictions),
        Err(FilterError::FiltrationNotAllowed {
            column: "city".to_string(),
            operator: "eq".to_string(),
        })
    );
    // Other columns stay unrestricted
    assert!(build(json!({"name": {"ne": "x"}}), &restrictions).is_ok());
}

// =========================================================================
// Editing compiled trees
// =========================================================================

#[test]
fn test_find_remove_normalize() {
    let expression = compile(json!({
        "and": {"name": {"eq": "John"}, "age": {"gt": 20}},
        "or": {"age": {"lt": 10}, "name": {"eq": "Doe"}}
    }));

    let john = expression.find(["and", "name"]).unwrap().unwrap();
    assert_eq!(john.operator(), Some(Operator::new("eq", "John").unwrap()));
    assert!(expression.find("and.city").unwrap().is_none());
    assert!(matches!(
        expression.find("name.and"),
        Err(FilterError::CannotAdjustExpression(_))
    ));

    let or = expression.find("or").unwrap().unwrap();
    expression.remove(["or", "name"]).unwrap();
    assert_eq!(or.children().len(), 1);

    expression.normalize();
    assert!(or.is_leaf());
    assert_eq!(
        render(&expression).unwrap(),
        "((name eq John AND age gt 20) AND age lt 10)"
    );

    assert!(matches!(
        expression.remove(Vec::<String>::new()),
        Err(FilterError::CannotAdjustExpression(_))
    ));
}

#[test]
fn test_edit_then_apply() {
    let expression = compile(json!({"age": {"gt": 20}}));
    let age = Column::new("tt", "age");

    // Adding to a leaf promotes it in place
    expression
        .add_with("", Expression::leaf(age.clone(), Operator::new("lt", 60).unwrap()), Junction::Or)
        .unwrap();
    assert_eq!(render(&expression).unwrap(), "(age gt 20 OR age lt 60)");

    expression
        .replace("age:lt-60", &Expression::leaf(age, Operator::new("le", 65).unwrap()))
        .unwrap();
    assert_eq!(render(&expression).unwrap(), "(age gt 20 OR age le 65)");

    let query = expression.apply(&RecordingBackend, select_people());
    assert_eq!(query.steps, vec!["where (age gt 20 OR age le 65)".to_string()]);
}

// =========================================================================
// Reconstruction
// =========================================================================

#[test]
fn test_round_trip_through_reconstruct() {
    let input = FilterInput::from_json(&json!({
        "or": {
            "name": {"in": ["Ann", "Bob"]},
            "and": {"age": {"gt": 20, "lt": 60}, "city": {"ne": "Oslo"}}
        },
        "limit": 5,
        "order_by": ["-age", "+name"]
    }))
    .unwrap();
    let selection = Selection::all_of(&people());
    let restrictions = RestrictionSet::new();
    let compiled = compiler().compile(&input, &selection, &restrictions).unwrap();

    let rebuilt = reconstruct(compiled.expression.as_ref(), &compiled.modifiers).unwrap();
    let recompiled = compiler().compile(&rebuilt, &selection, &restrictions).unwrap();

    assert_eq!(recompiled, compiled);
    // The operators of `age` form their own AND junction
    assert_eq!(
        serde_json::Value::Object(reconstruct_json(recompiled.expression.as_ref(), &recompiled.modifiers).unwrap()),
        json!({
            "or": {
                "name": {"in": ["Ann", "Bob"]},
                "and": {"and": {"age": {"gt": 20, "lt": 60}}, "city": {"ne": "Oslo"}}
            },
            "limit": 5,
            "order_by": ["-age", "+name"]
        })
    );
}

#[test]
fn test_round_trip_keeps_table_qualifier() {
    // Only `name` is selected, so the other columns must stay qualified in the dump
    let selection = Selection::new(vec![Column::new("tt", "name")]);
    let restrictions = RestrictionSet::new();
    let input = FilterInput::from_json(&json!({
        "tt.city": {"eq": "Oslo"},
        "tt.age": {"gt": 20},
        "order_by": "-tt.age"
    }))
    .unwrap();
    let compiled = compiler().compile(&input, &selection, &restrictions).unwrap();

    assert_eq!(
        serde_json::Value::Object(reconstruct_json(compiled.expression.as_ref(), &compiled.modifiers).unwrap()),
        json!({"and": {"tt.city": {"eq": "Oslo"}, "tt.age": {"gt": 20}}, "order_by": "-tt.age"})
    );

    let rebuilt = reconstruct(compiled.expression.as_ref(), &compiled.modifiers).unwrap();
    let recompiled = compiler().compile(&rebuilt, &selection, &restrictions).unwrap();
    assert_eq!(recompiled, compiled);

    // Leaf selectors accept the qualified form as well as the bare name
    let expression = recompiled.expression.unwrap();
    assert!(expression.find(vec!["tt.city:eq"]).unwrap().is_some());
    assert!(expression.find("age:gt").unwrap().is_some());
}

#[test]
fn test_order_by_labeled_column() {
    let query = RecordedQuery {
        selection: Selection::new(vec![Column::new("tt", "name").labeled("full-name")]),
        steps: Vec::new(),
    };
    let input = FilterInput::from_json(&json!({"full-name": {"ne": "x"}, "order_by": "-full-name"})).unwrap();
    let query = compiler()
        .build(&RecordingBackend, query, &input, &RestrictionSet::new())
        .unwrap();
    assert_eq!(
        query.steps,
        vec!["where name ne x".to_string(), "order by name desc".to_string()]
    );
}
