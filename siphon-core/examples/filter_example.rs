//! Example demonstrating the filter engine
//!
//! This example shows how to:
//! - Initialize logging from configuration
//! - Compile a filter under per-column restrictions
//! - Edit the compiled tree by path and dump it back to the wire format

use siphon_core::{
    init_logging, reconstruct_json, Catalog, Column, ColumnRestriction, Compiler, Expression,
    FilterInput, Operator, OperatorKind, RestrictionSet, Selection, SiphonConfig, Table,
};

fn main() -> anyhow::Result<()> {
    let config = SiphonConfig::default();
    init_logging(&config.logging)?;

    let people = Table::new("people", ["name", "age", "city"]);
    let compiler = Compiler::with_settings(Catalog::new().with_table(people.clone()), config.compiler);

    println!("Filter Engine Example");
    println!("=====================");

    let input = FilterInput::parse(
        r#"{
            "or": {"age": {"lt": 18}, "city": {"in": ["Oslo", "Bergen"]}},
            "order_by": "-age",
            "limit": "20"
        }"#,
    )?;

    // Callers may only use `lt` on age and any list filter on city
    let restrictions = RestrictionSet::new()
        .with(ColumnRestriction::allow("age").any(OperatorKind::Lt))
        .with(ColumnRestriction::allow("city").any(OperatorKind::In));

    let compiled = compiler.compile(&input, &Selection::all_of(&people), &restrictions)?;
    let Some(expression) = compiled.expression.as_ref() else {
        println!("No filters");
        return Ok(());
    };
    println!("Compiled: {}", expression);

    let city = expression.find("city:in")?;
    println!("Found:    {:?}", city.map(|c| c.to_string()));

    // Adding to a leaf turns it into an AND junction in place
    expression.add(
        "age",
        Expression::leaf(Column::new("people", "age"), Operator::new("gt", 5)?),
    )?;
    println!("Edited:   {}", expression);

    let dumped = reconstruct_json(Some(expression), &compiled.modifiers)?;
    println!("Dumped:   {}", serde_json::to_string_pretty(&serde_json::Value::Object(dumped))?);

    Ok(())
}
