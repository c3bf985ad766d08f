//! Generator configuration records.
//!
//! Configuration is plain data: type-mapping rules and the list of tables that
//! represent closed value sets. The records derive serde so the CLI can load
//! them from JSON, but the core accepts already-built values and never touches
//! the file system.

use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_SCHEMA;

/// One type-mapping rule.
///
/// A rule matches a column when every declared pattern is satisfied; absent
/// patterns mean "don't care". Patterns are case-insensitive literal equality
/// unless `regex` is set, in which case each pattern is compiled as a
/// case-insensitive regular expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeMappingRule {
    /// Schema-name pattern, if declared
    #[serde(default)]
    pub schema: Option<String>,
    /// Table-name pattern, if declared
    #[serde(default)]
    pub table: Option<String>,
    /// Column-name pattern, if declared
    #[serde(default)]
    pub column: Option<String>,
    /// Source-type pattern; always declared
    pub source_type: String,
    /// Target-language type emitted when the rule wins
    pub target_type: String,
    /// Whether the patterns are regular expressions rather than literals
    #[serde(default)]
    pub regex: bool,
}

/// Marks one table as a closed value set rather than a row-shaped entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSetTable {
    /// Schema of the value-set table
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Name of the value-set table
    pub table: String,
    /// Column holding the canonical value of each entry
    pub value_column: String,
    /// Column holding the display label of each entry
    pub label_column: String,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Type-mapping rules in declaration order
    #[serde(default)]
    pub rules: Vec<TypeMappingRule>,
    /// Tables to generate as value sets
    #[serde(default)]
    pub value_sets: Vec<ValueSetTable>,
}

impl GeneratorConfig {
    /// Find the value-set designation for a table, matching case-insensitively.
    pub fn value_set_for(&self, schema: &str, table: &str) -> Option<&ValueSetTable> {
        self.value_sets.iter().find(|v| {
            v.schema.eq_ignore_ascii_case(schema) && v.table.eq_ignore_ascii_case(table)
        })
    }
}
