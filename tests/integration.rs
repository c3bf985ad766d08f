//! Integration tests for ddl-gen-entities
//!
//! These tests exercise the full generation pipeline from DDL text to
//! formatted Rust artifacts.

use ddl_gen_entities::config::{GeneratorConfig, TypeMappingRule, ValueSetTable};
use ddl_gen_entities::diagnostics::DiagnosticKind;
use ddl_gen_entities::ingest::SchemaSource;
use ddl_gen_entities::{GenerateRequest, GeneratorError, Phase};

fn request(sql: &str, config: GeneratorConfig) -> GenerateRequest {
    GenerateRequest {
        sources: vec![SchemaSource::new("schema.sql", sql)],
        config,
    }
}

fn rule(column: Option<&str>, source_type: &str, target_type: &str) -> TypeMappingRule {
    TypeMappingRule {
        schema: None,
        table: None,
        column: column.map(String::from),
        source_type: source_type.to_string(),
        target_type: target_type.to_string(),
        regex: false,
    }
}

fn value_set(table: &str, value_column: &str, label_column: &str) -> ValueSetTable {
    ValueSetTable {
        schema: "dbo".to_string(),
        table: table.to_string(),
        value_column: value_column.to_string(),
        label_column: label_column.to_string(),
    }
}

#[test]
fn test_generate_entities_without_rules() {
    // Two related tables and no type rules: generation must still succeed,
    // with every property resolving to the Unknown sentinel type.
    let sql = r#"
        CREATE TABLE Users (
            Id INT PRIMARY KEY,
            Email NVARCHAR(255) NOT NULL,
            DisplayName NVARCHAR(100)
        );
        CREATE TABLE Orders (
            Id INT PRIMARY KEY,
            UserId INT NOT NULL REFERENCES Users(Id),
            Total DECIMAL(10, 2)
        );
    "#;
    let output = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect("generation should succeed");

    assert_eq!(output.artifacts.len(), 2, "should generate two artifacts");

    let users = output.artifacts.get("dbo/users.rs").expect("users artifact");
    assert!(users.starts_with("//! Generated by ddl-gen-entities. Do not edit."));
    assert!(users.contains("pub struct Users"));
    assert!(users.contains("pub id: Unknown"), "unmapped type is Unknown");
    assert!(users.contains("pub display_name: Option<Unknown>"));
    assert!(users.contains("PartialEq"));
    assert!(users.contains("pub fn new"));

    let orders = output
        .artifacts
        .get("dbo/orders.rs")
        .expect("orders artifact");
    assert!(orders.contains("pub struct Orders"));
    assert!(orders.contains(r#"&["Id"]"#), "primary key column list");
}

#[test]
fn test_more_specific_rule_wins_regardless_of_order() {
    let sql = r#"
        CREATE TABLE Users (
            Id INT PRIMARY KEY,
            Email NVARCHAR(255) NOT NULL,
            Username NVARCHAR(50) NOT NULL
        );
    "#;
    let config = GeneratorConfig {
        rules: vec![
            rule(None, "NVARCHAR", "String"),
            rule(Some("Email"), "NVARCHAR", "EmailAddress"),
            rule(None, "INT", "i32"),
        ],
        value_sets: vec![],
    };
    let output =
        ddl_gen_entities::generate(&request(sql, config)).expect("generation should succeed");

    let users = output.artifacts.get("dbo/users.rs").expect("users artifact");
    assert!(
        users.contains("pub email: EmailAddress"),
        "column-specific rule should beat the broad one"
    );
    assert!(users.contains("pub username: String"));
    assert!(users.contains("pub id: i32"));
}

#[test]
fn test_duplicate_indexes_collapse_to_one() {
    // The inline UNIQUE and the CREATE UNIQUE INDEX cover the same column;
    // only one index must survive, and generation must succeed.
    let sql = r#"
        CREATE TABLE Users (
            Id INT PRIMARY KEY,
            Email NVARCHAR(255) UNIQUE
        );
        CREATE UNIQUE INDEX IX_Users_Email ON Users (Email);
    "#;
    let output = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect("generation should succeed");
    assert_eq!(output.artifacts.len(), 1);
}

#[test]
fn test_value_set_splits_into_three_artifacts() {
    let sql = r#"
        CREATE TABLE OrderStatus (
            Code NVARCHAR(20) PRIMARY KEY,
            Label NVARCHAR(50) NOT NULL,
            SortOrder INT NOT NULL
        );
        INSERT INTO OrderStatus (Code, Label, SortOrder) VALUES
            ('open', 'Open', 1),
            ('shipped', 'Shipped', 2),
            ('closed', 'Closed', 3);
    "#;
    let config = GeneratorConfig {
        rules: vec![],
        value_sets: vec![value_set("OrderStatus", "Code", "Label")],
    };
    let output =
        ddl_gen_entities::generate(&request(sql, config)).expect("generation should succeed");

    let names: Vec<&str> = output.artifacts.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "dbo/order_status.rs",
            "dbo/order_status_data.rs",
            "dbo/order_status_serde.rs",
        ],
        "value set should split into core, data, and serde artifacts"
    );

    let core = &output.artifacts["dbo/order_status.rs"];
    assert!(core.contains("pub struct OrderStatus(u16)"));
    assert!(core.contains("pub const COUNT: usize = 3"));
    assert!(core.contains("pub fn dispatch"), "3 values is under the dispatch limit");

    let data = &output.artifacts["dbo/order_status_data.rs"];
    assert!(data.contains("\"open\""));
    assert!(data.contains("\"Shipped\""));
    assert!(data.contains("\"SortOrder\""), "extra columns carried as attributes");

    let serde_adapter = &output.artifacts["dbo/order_status_serde.rs"];
    assert!(serde_adapter.contains("impl Serialize for OrderStatus"));
    assert!(serde_adapter.contains("impl<'de> Deserialize<'de> for OrderStatus"));
}

#[test]
fn test_dispatch_helper_omitted_for_large_value_sets() {
    let mut rows = Vec::new();
    for i in 0..30 {
        rows.push(format!("('code{}', 'Label {}')", i, i));
    }
    let sql = format!(
        r#"
        CREATE TABLE Status (Code NVARCHAR(20) PRIMARY KEY, Label NVARCHAR(50));
        INSERT INTO Status (Code, Label) VALUES {};
        "#,
        rows.join(", ")
    );
    let config = GeneratorConfig {
        rules: vec![],
        value_sets: vec![value_set("Status", "Code", "Label")],
    };
    let output =
        ddl_gen_entities::generate(&request(&sql, config)).expect("generation should succeed");

    let core = &output.artifacts["dbo/status.rs"];
    assert!(core.contains("pub const COUNT: usize = 30"));
    assert!(
        !core.contains("pub fn dispatch"),
        "30 values exceeds the dispatch helper limit"
    );
    assert!(core.contains("pub fn parse"), "lookup must still be generated");
}

#[test]
fn test_dispatch_helper_handler_count_matches_values() {
    let sql = r#"
        CREATE TABLE Priority (Code NVARCHAR(20) PRIMARY KEY, Label NVARCHAR(50));
        INSERT INTO Priority (Code, Label) VALUES
            ('p0', 'Critical'), ('p1', 'High'), ('p2', 'Medium'), ('p3', 'Low');
    "#;
    let config = GeneratorConfig {
        rules: vec![],
        value_sets: vec![value_set("Priority", "Code", "Label")],
    };
    let output =
        ddl_gen_entities::generate(&request(sql, config)).expect("generation should succeed");

    let core = &output.artifacts["dbo/priority.rs"];
    assert_eq!(
        core.matches("impl FnOnce() -> R").count(),
        4,
        "one handler parameter per value"
    );
}

#[test]
fn test_parse_error_is_fatal_but_fully_reported() {
    // Both statements are malformed; both must be diagnosed in one run.
    let sql = r#"
        CREATE TABLE broken (;
        CREATE TABLE also_broken (Id INT PRIMARY KEY;
        CREATE TABLE fine (Id INT PRIMARY KEY);
    "#;
    let err = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect_err("generation should fail");
    match err {
        GeneratorError::PhaseFailed { phase, diagnostics } => {
            assert_eq!(phase, Phase::Ingest);
            assert!(diagnostics.len() >= 2, "both errors should be reported");
            assert!(diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::ParseError));
            assert!(diagnostics
                .iter()
                .all(|d| d.source.as_deref() == Some("schema.sql")));
        }
        other => panic!("expected phase failure, got {:?}", other),
    }
}

#[test]
fn test_unresolved_foreign_key_is_a_reference_error() {
    let sql = "CREATE TABLE Orders (Id INT PRIMARY KEY, UserId INT REFERENCES Users(Id));";
    let err = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect_err("generation should fail");
    match err {
        GeneratorError::PhaseFailed { phase, diagnostics } => {
            assert_eq!(phase, Phase::Refine);
            assert!(diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::Reference));
            assert!(
                diagnostics.iter().any(|d| d.message.contains("Users")),
                "the missing table should be named"
            );
        }
        other => panic!("expected phase failure, got {:?}", other),
    }
}

#[test]
fn test_duplicate_tables_across_sources() {
    let request = GenerateRequest {
        sources: vec![
            SchemaSource::new("a.sql", "CREATE TABLE Users (Id INT PRIMARY KEY);"),
            SchemaSource::new("b.sql", "CREATE TABLE users (Id INT PRIMARY KEY);"),
        ],
        config: GeneratorConfig::default(),
    };
    let err = ddl_gen_entities::generate(&request).expect_err("generation should fail");
    match err {
        GeneratorError::PhaseFailed { phase, diagnostics } => {
            assert_eq!(phase, Phase::Refine);
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateDefinition);
            assert!(
                diagnostics[0].message.contains("a.sql"),
                "the earlier declaration's source should be named"
            );
        }
        other => panic!("expected phase failure, got {:?}", other),
    }
}

#[test]
fn test_malformed_rule_fails_before_transformation() {
    let sql = "CREATE TABLE Users (Id INT PRIMARY KEY);";
    let config = GeneratorConfig {
        rules: vec![TypeMappingRule {
            schema: None,
            table: None,
            column: Some("(unclosed".to_string()),
            source_type: "INT".to_string(),
            target_type: "i32".to_string(),
            regex: true,
        }],
        value_sets: vec![],
    };
    let err = ddl_gen_entities::generate(&request(sql, config)).expect_err("generation should fail");
    match err {
        GeneratorError::PhaseFailed { phase, diagnostics } => {
            assert_eq!(phase, Phase::CompileRules);
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::TypeRuleCompilation);
        }
        other => panic!("expected phase failure, got {:?}", other),
    }
}

#[test]
fn test_output_collision_names_both_entities() {
    // Two table names that normalize to the same artifact path.
    let sql = r#"
        CREATE TABLE OrderStatus (Id INT PRIMARY KEY);
        CREATE TABLE order_status (Id INT PRIMARY KEY);
    "#;
    let err = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect_err("generation should fail");
    match err {
        GeneratorError::PhaseFailed { phase, diagnostics } => {
            assert_eq!(phase, Phase::Emit);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::OutputCollision);
            assert!(diagnostics[0].message.contains("dbo.OrderStatus"));
            assert!(diagnostics[0].message.contains("dbo.order_status"));
        }
        other => panic!("expected phase failure, got {:?}", other),
    }
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let sql = r#"
        CREATE TABLE sales.Customers (Id BIGINT PRIMARY KEY, Name NVARCHAR(100));
        CREATE TABLE Users (Id INT PRIMARY KEY);
        CREATE TABLE Status (Code NVARCHAR(10) PRIMARY KEY, Label NVARCHAR(50));
        INSERT INTO Status (Code, Label) VALUES ('a', 'A'), ('b', 'B');
    "#;
    let config = GeneratorConfig {
        rules: vec![rule(None, "BIGINT", "i64")],
        value_sets: vec![value_set("Status", "Code", "Label")],
    };
    let first = ddl_gen_entities::generate(&request(sql, config.clone())).unwrap();
    let second = ddl_gen_entities::generate(&request(sql, config)).unwrap();
    assert_eq!(first.artifacts, second.artifacts);

    // Artifact names are ordered, schema directory first
    let names: Vec<&str> = first.artifacts.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "dbo/status.rs",
            "dbo/status_data.rs",
            "dbo/status_serde.rs",
            "dbo/users.rs",
            "sales/customers.rs",
        ]
    );
}

#[test]
fn test_alter_table_constraints_and_views() {
    let sql = r#"
        CREATE TABLE Users (Id INT NOT NULL, Email NVARCHAR(255) NOT NULL);
        ALTER TABLE Users ADD CONSTRAINT PK_Users PRIMARY KEY (Id);
        CREATE TABLE Orders (Id INT PRIMARY KEY, UserId INT NOT NULL);
        ALTER TABLE Orders ADD CONSTRAINT FK_Orders_Users
            FOREIGN KEY (UserId) REFERENCES Users (Id);
        CREATE VIEW user_orders (UserId, OrderCount) AS
            SELECT UserId, COUNT(*) FROM Orders GROUP BY UserId;
    "#;
    let output = ddl_gen_entities::generate(&request(sql, GeneratorConfig::default()))
        .expect("generation should succeed");

    let users = &output.artifacts["dbo/users.rs"];
    assert!(
        users.contains(r#"&["Id"]"#),
        "ALTER TABLE primary key should reach the entity"
    );

    let view = output
        .artifacts
        .get("dbo/user_orders.rs")
        .expect("view with declared columns should generate");
    assert!(view.contains("pub struct UserOrders"));
    assert!(
        view.contains("pub order_count: Option<Unknown>"),
        "view columns are nullable and untyped"
    );
}

#[test]
fn test_every_artifact_parses_as_rust() {
    let sql = r#"
        CREATE TABLE Users (Id INT PRIMARY KEY, [Order] INT, [2fa_enabled] BIT);
        CREATE TABLE Status (Code NVARCHAR(10) PRIMARY KEY, Label NVARCHAR(50));
        INSERT INTO Status (Code, Label) VALUES ('in-progress', 'In Progress'), ('done', 'Done');
    "#;
    let config = GeneratorConfig {
        rules: vec![],
        value_sets: vec![value_set("Status", "Code", "Label")],
    };
    let output =
        ddl_gen_entities::generate(&request(sql, config)).expect("generation should succeed");

    for (name, content) in &output.artifacts {
        syn::parse_file(content)
            .unwrap_or_else(|e| panic!("artifact {} is not valid Rust: {}", name, e));
    }
}
