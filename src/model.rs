//! Model Transformer: refined schema in, target code model out.
//!
//! Builds one [`TargetEntityModel`] per table and per view with declared
//! columns. Tables designated as value sets by configuration become
//! [`ValueSetSpecification`]s built from their seed rows; everything else is
//! row-shaped with one property per column in ordinal order.

use std::collections::HashSet;

use crate::config::GeneratorConfig;
use crate::schema::{QualifiedName, RefinedSchema, SeedRow};
use crate::types::{ResolvedType, RuleSet};

/// One resolved property of a row-shaped entity.
#[derive(Debug, Clone)]
pub struct PropertyModel {
    /// Source column name
    pub name: String,
    /// Resolved target-language type
    pub target_type: ResolvedType,
    /// Whether the property is optional
    pub nullable: bool,
    /// Whether the property participates in the entity's identity
    pub primary_key: bool,
}

/// One entry of a closed value set.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSetEntry {
    /// Canonical value
    pub value: String,
    /// Display label
    pub label: String,
    /// Remaining (column, literal) attributes, in column order
    pub extras: Vec<(String, String)>,
}

/// Ordered entries of a value-set entity.
#[derive(Debug, Clone, Default)]
pub struct ValueSetSpecification {
    /// Entries in seed-row order
    pub entries: Vec<ValueSetEntry>,
}

/// The shape an entity is generated as.
#[derive(Debug, Clone)]
pub enum EntityShape {
    /// A row-shaped entity with one property per column
    Row {
        /// Properties in source ordinal order
        properties: Vec<PropertyModel>,
    },
    /// A closed, string-keyed value set
    ValueSet(ValueSetSpecification),
}

/// Target code model for one table or view.
#[derive(Debug, Clone)]
pub struct TargetEntityModel {
    /// Qualified source name of the entity
    pub name: QualifiedName,
    /// Row-shaped or value-set
    pub shape: EntityShape,
}

/// Build the target code model for every table and eligible view.
pub fn transform(
    schema: &RefinedSchema,
    rules: &RuleSet,
    config: &GeneratorConfig,
) -> Vec<TargetEntityModel> {
    let mut entities = Vec::new();

    for table in schema.tables.values() {
        let shape = match config.value_set_for(&table.name.schema, &table.name.name) {
            Some(designation) => {
                let rows = schema
                    .seed_rows
                    .get(&table.name.key())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                EntityShape::ValueSet(build_value_set(
                    &table.name,
                    rows,
                    &designation.value_column,
                    &designation.label_column,
                ))
            }
            None => EntityShape::Row {
                properties: table
                    .columns
                    .iter()
                    .map(|column| PropertyModel {
                        name: column.name.clone(),
                        target_type: rules.resolve(
                            &table.name.schema,
                            &table.name.name,
                            &column.name,
                            &column.source_type,
                        ),
                        nullable: column.nullable,
                        primary_key: column.primary_key,
                    })
                    .collect(),
            },
        };
        entities.push(TargetEntityModel {
            name: table.name.clone(),
            shape,
        });
    }

    // Views with an explicitly declared column list are row-shaped; their
    // columns carry no source type, so resolution runs on names alone.
    for view in schema.views.values() {
        if view.columns.is_empty() {
            continue;
        }
        entities.push(TargetEntityModel {
            name: view.name.clone(),
            shape: EntityShape::Row {
                properties: view
                    .columns
                    .iter()
                    .map(|column| PropertyModel {
                        name: column.clone(),
                        target_type: rules.resolve(
                            &view.name.schema,
                            &view.name.name,
                            column,
                            "",
                        ),
                        nullable: true,
                        primary_key: false,
                    })
                    .collect(),
            },
        });
    }

    entities
}

fn build_value_set(
    name: &QualifiedName,
    rows: &[SeedRow],
    value_column: &str,
    label_column: &str,
) -> ValueSetSpecification {
    let mut entries = Vec::with_capacity(rows.len());
    let mut seen_values = HashSet::new();
    for row in rows {
        let value = row
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(value_column))
            .map(|(_, literal)| literal.clone());
        let value = match value {
            Some(v) => v,
            // A row that never names the value column cannot become an entry
            None => continue,
        };
        // A value can map back to only one index, so later duplicates are
        // dropped and the first-declared row wins
        if !seen_values.insert(value.clone()) {
            continue;
        }
        let label = row
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(label_column))
            .map(|(_, literal)| literal.clone())
            .unwrap_or_else(|| value.clone());
        let extras = row
            .iter()
            .filter(|(column, _)| {
                !column.eq_ignore_ascii_case(value_column)
                    && !column.eq_ignore_ascii_case(label_column)
            })
            .cloned()
            .collect();
        entries.push(ValueSetEntry {
            value,
            label,
            extras,
        });
    }
    if entries.is_empty() && !rows.is_empty() {
        tracing::warn!(
            table = %name,
            column = value_column,
            "no seed row provides the configured value column"
        );
    }
    ValueSetSpecification { entries }
}
