//! Refiner: merges per-source raw models into one validated [`RefinedSchema`].
//!
//! This is the synchronization barrier of the pipeline: foreign keys can only
//! be resolved once every source has been ingested. Structural errors are
//! accumulated and reported together rather than one at a time; the only
//! ordering constraint is that reference resolution is skipped entirely when
//! the merge step failed, since it assumes a consistent namespace.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::schema::{IndexDefinition, RawModel, RefinedSchema, SeedRow, TableDefinition};

/// Merge, resolve and normalize the raw models. Any diagnostic is fatal.
pub fn refine(models: Vec<RawModel>) -> Result<RefinedSchema, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    // Step 1: merge tables and views into a single namespace keyed by
    // lowercase (schema, name). Tables and views share the namespace.
    let mut tables: BTreeMap<(String, String), TableDefinition> = BTreeMap::new();
    let mut views = BTreeMap::new();
    let mut declared_in: BTreeMap<(String, String), String> = BTreeMap::new();

    for model in &models {
        for table in &model.tables {
            let key = table.name.key();
            if let Some(first) = declared_in.get(&key) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateDefinition,
                        format!("'{}' is already declared in {}", table.name, first),
                    )
                    .with_source(model.source.clone()),
                );
                continue;
            }
            declared_in.insert(key.clone(), model.source.clone());

            let mut seen_columns = HashSet::new();
            for column in &table.columns {
                if !seen_columns.insert(column.name.to_lowercase()) {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::DuplicateDefinition,
                            format!("column '{}' declared twice in {}", column.name, table.name),
                        )
                        .with_source(model.source.clone()),
                    );
                }
            }
            tables.insert(key, table.clone());
        }

        for view in &model.views {
            let key = view.name.key();
            if let Some(first) = declared_in.get(&key) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateDefinition,
                        format!("'{}' is already declared in {}", view.name, first),
                    )
                    .with_source(model.source.clone()),
                );
                continue;
            }
            declared_in.insert(key.clone(), model.source.clone());
            views.insert(key, view.clone());
        }
    }

    // Seed rows are plain data and merge regardless of namespace problems.
    let mut seed_rows: BTreeMap<(String, String), Vec<SeedRow>> = BTreeMap::new();
    for model in &models {
        for (table, batch) in &model.seed_rows {
            let rows = seed_rows.entry(table.key()).or_default();
            for row in &batch.rows {
                rows.push(
                    batch
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect(),
                );
            }
        }
    }

    // Step 2 assumes a consistent merged namespace.
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    // Step 2: attach out-of-line declarations, then resolve every reference.
    for model in models {
        for (target, name, columns) in model.pending_primary_keys {
            match tables.get_mut(&target.key()) {
                Some(table) => {
                    let mut index_ok = true;
                    for column_name in &columns {
                        if table.column(column_name).is_none() {
                            diagnostics.push(
                                Diagnostic::new(
                                    DiagnosticKind::Reference,
                                    format!(
                                        "primary key '{}' names unknown column '{}' on {}",
                                        name, column_name, target
                                    ),
                                )
                                .with_source(model.source.clone()),
                            );
                            index_ok = false;
                        }
                    }
                    if index_ok {
                        for column in table.columns.iter_mut() {
                            if columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                                column.primary_key = true;
                                column.nullable = false;
                            }
                        }
                        table.indexes.push(IndexDefinition {
                            name,
                            unique: true,
                            clustered: false,
                            primary_key: true,
                            columns,
                        });
                    }
                }
                None => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Reference,
                        format!("primary key '{}' targets unknown table {}", name, target),
                    )
                    .with_source(model.source.clone()),
                ),
            }
        }

        for (target, index) in model.loose_indexes {
            match tables.get_mut(&target.key()) {
                Some(table) => table.indexes.push(index),
                None => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Reference,
                        format!("index '{}' targets unknown table {}", index.name, target),
                    )
                    .with_source(model.source.clone()),
                ),
            }
        }

        for (target, fk) in model.pending_foreign_keys {
            match tables.get_mut(&target.key()) {
                Some(table) => table.foreign_keys.push(fk),
                None => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Reference,
                        format!(
                            "foreign key on unknown table {} (references {}.{})",
                            target, fk.target_table, fk.target_column
                        ),
                    )
                    .with_source(model.source.clone()),
                ),
            }
        }
    }

    // Foreign keys: both endpoints must exist. Never silently dropped.
    let table_keys: Vec<(String, String)> = tables.keys().cloned().collect();
    for key in &table_keys {
        let owner = &tables[key];
        for fk in &owner.foreign_keys {
            if owner.column(&fk.column).is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Reference,
                    format!(
                        "foreign key column '{}' does not exist on {}",
                        fk.column, owner.name
                    ),
                ));
            }
            match tables.get(&fk.target_table.key()) {
                Some(target) => {
                    if target.column(&fk.target_column).is_none() {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::Reference,
                            format!(
                                "foreign key {}.{} references unknown column {}.{}",
                                owner.name, fk.column, fk.target_table, fk.target_column
                            ),
                        ));
                    }
                }
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Reference,
                    format!(
                        "foreign key {}.{} references unknown table {}",
                        owner.name, fk.column, fk.target_table
                    ),
                )),
            }
        }

        for index in &owner.indexes {
            for column in &index.columns {
                if owner.column(column).is_none() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::Reference,
                        format!(
                            "index '{}' names unknown column '{}' on {}",
                            index.name, column, owner.name
                        ),
                    ));
                }
            }
        }
    }

    // Step 3: normalize indexes and validate primary-key composition.
    for table in tables.values_mut() {
        let mut seen: HashSet<(String, bool)> = HashSet::new();
        table.indexes.retain(|index| {
            let signature = (
                index
                    .columns
                    .iter()
                    .map(|c| c.to_lowercase())
                    .collect::<Vec<_>>()
                    .join("\u{1f}"),
                index.unique,
            );
            seen.insert(signature)
        });

        let pk_set: BTreeSet<String> = table
            .primary_key_columns()
            .iter()
            .map(|c| c.to_lowercase())
            .collect();
        for index in &table.indexes {
            if !index.primary_key {
                continue;
            }
            let index_set: BTreeSet<String> =
                index.columns.iter().map(|c| c.to_lowercase()).collect();
            if index_set != pk_set {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Reference,
                    format!(
                        "primary key index '{}' on {} does not match the column-level primary key",
                        index.name, table.name
                    ),
                ));
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(RefinedSchema {
            tables,
            views,
            seed_rows,
        })
    } else {
        Err(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_source;

    fn raw(name: &str, sql: &str) -> RawModel {
        let (model, diagnostics) = parse_source(name, sql);
        assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
        model
    }

    #[test]
    fn test_merge_and_resolve_across_sources() {
        let users = raw("users.sql", "CREATE TABLE Users (Id INT PRIMARY KEY);");
        let orders = raw(
            "orders.sql",
            r#"
            CREATE TABLE Orders (Id INT PRIMARY KEY, UserId INT);
            ALTER TABLE Orders ADD CONSTRAINT FK_Orders_Users
                FOREIGN KEY (UserId) REFERENCES Users (Id);
            "#,
        );
        let schema = refine(vec![users, orders]).unwrap();
        assert_eq!(schema.tables.len(), 2);
        let orders = &schema.tables[&("dbo".to_string(), "orders".to_string())];
        assert_eq!(orders.foreign_keys.len(), 1);
    }

    #[test]
    fn test_duplicate_table_is_reported() {
        let a = raw("a.sql", "CREATE TABLE Users (Id INT);");
        let b = raw("b.sql", "CREATE TABLE users (Id INT);");
        let diagnostics = refine(vec![a, b]).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateDefinition);
        assert!(diagnostics[0].message.contains("a.sql"));
    }

    #[test]
    fn test_duplicate_column_is_reported() {
        let a = raw("a.sql", "CREATE TABLE T (Id INT, id NVARCHAR(10));");
        let diagnostics = refine(vec![a]).unwrap_err();
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateDefinition);
        assert!(diagnostics[0].message.contains("id"));
    }

    #[test]
    fn test_unresolved_foreign_key_is_a_reference_error() {
        let a = raw(
            "a.sql",
            "CREATE TABLE Orders (Id INT PRIMARY KEY, UserId INT REFERENCES Users(Id));",
        );
        let diagnostics = refine(vec![a]).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Reference);
        assert!(diagnostics[0].message.contains("Users"));
    }

    #[test]
    fn test_foreign_key_to_unknown_column_is_a_reference_error() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE Users (Id INT PRIMARY KEY);
            CREATE TABLE Orders (Id INT PRIMARY KEY, UserId INT REFERENCES Users(Uuid));
            "#,
        );
        let diagnostics = refine(vec![a]).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Uuid"));
    }

    #[test]
    fn test_duplicate_indexes_are_normalized_keeping_first() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE Users (Id INT PRIMARY KEY, Email NVARCHAR(255));
            CREATE UNIQUE INDEX IX_first ON Users (Email);
            CREATE UNIQUE INDEX IX_second ON Users (Email);
            "#,
        );
        let schema = refine(vec![a]).unwrap();
        let users = &schema.tables[&("dbo".to_string(), "users".to_string())];
        let email_indexes: Vec<_> = users
            .indexes
            .iter()
            .filter(|i| i.columns == vec!["Email"])
            .collect();
        assert_eq!(email_indexes.len(), 1);
        assert_eq!(email_indexes[0].name, "IX_first");
    }

    #[test]
    fn test_non_unique_duplicate_is_kept_separately() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE Users (Id INT PRIMARY KEY, Email NVARCHAR(255));
            CREATE UNIQUE INDEX IX_unique ON Users (Email);
            CREATE INDEX IX_plain ON Users (Email);
            "#,
        );
        let schema = refine(vec![a]).unwrap();
        let users = &schema.tables[&("dbo".to_string(), "users".to_string())];
        let email_indexes: Vec<_> = users
            .indexes
            .iter()
            .filter(|i| i.columns == vec!["Email"])
            .collect();
        assert_eq!(email_indexes.len(), 2);
    }

    #[test]
    fn test_primary_key_index_mismatch_is_reported() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE T (Id INT PRIMARY KEY, Other INT);
            ALTER TABLE T ADD CONSTRAINT PK_T PRIMARY KEY (Other);
            "#,
        );
        let diagnostics = refine(vec![a]).unwrap_err();
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Reference && d.message.contains("PK_T")));
    }

    #[test]
    fn test_alter_primary_key_sets_column_flags() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE T (Id INT NOT NULL, Name NVARCHAR(50));
            ALTER TABLE T ADD CONSTRAINT PK_T PRIMARY KEY (Id);
            "#,
        );
        let schema = refine(vec![a]).unwrap();
        let t = &schema.tables[&("dbo".to_string(), "t".to_string())];
        assert!(t.column("Id").unwrap().primary_key);
        assert_eq!(t.primary_key_columns(), vec!["Id"]);
    }

    #[test]
    fn test_seed_rows_merge_across_sources() {
        let a = raw(
            "a.sql",
            r#"
            CREATE TABLE S (Code NVARCHAR(10) PRIMARY KEY, Label NVARCHAR(50));
            INSERT INTO S (Code, Label) VALUES ('a', 'A');
            "#,
        );
        let b = raw("b.sql", "INSERT INTO S (Code, Label) VALUES ('b', 'B');");
        let schema = refine(vec![a, b]).unwrap();
        let rows = &schema.seed_rows[&("dbo".to_string(), "s".to_string())];
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], ("Code".to_string(), "a".to_string()));
        assert_eq!(rows[1][0], ("Code".to_string(), "b".to_string()));
    }

    #[test]
    fn test_merge_failure_skips_reference_resolution() {
        // The duplicate makes step 1 fail; the dangling FK in the same input
        // must not be reported because resolution never ran.
        let a = raw("a.sql", "CREATE TABLE T (Id INT);");
        let b = raw(
            "b.sql",
            "CREATE TABLE T (Id INT, X INT REFERENCES Missing(Id));",
        );
        let diagnostics = refine(vec![a, b]).unwrap_err();
        assert!(diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::DuplicateDefinition));
    }
}
