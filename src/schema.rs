//! Raw and refined schema models.
//!
//! The ingest phase produces one [`RawModel`] per schema source. The refine
//! phase merges all raw models into a single validated [`RefinedSchema`],
//! which is immutable for the remainder of the pipeline run.

use std::collections::BTreeMap;
use std::fmt;

/// Schema namespace used when a declaration carries no explicit qualifier.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// A (schema, name) pair identifying a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Owning schema namespace
    pub schema: String,
    /// Object name within that schema
    pub name: String,
}

impl QualifiedName {
    /// Create a qualified name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Case-insensitive namespace key used for merging and lookup.
    pub fn key(&self) -> (String, String) {
        (self.schema.to_lowercase(), self.name.to_lowercase())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One column of a table.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    /// Column name as declared
    pub name: String,
    /// Source type name without parameters, e.g. `NVARCHAR`
    pub source_type: String,
    /// Numeric type parameters, e.g. length/precision from `NVARCHAR(255)`
    pub type_params: Vec<u32>,
    /// Whether the column admits NULL
    pub nullable: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Default value expression, if declared
    pub default: Option<String>,
    /// Zero-based position within the table; contiguous by construction
    pub ordinal: usize,
}

/// One index over a table.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// Index name
    pub name: String,
    /// Whether the index enforces uniqueness
    pub unique: bool,
    /// Whether the index is clustered
    pub clustered: bool,
    /// Whether the index was declared as the table's primary key
    pub primary_key: bool,
    /// Ordered, non-empty list of column names
    pub columns: Vec<String>,
}

/// A foreign key from one column of the owning table to a target column.
#[derive(Debug, Clone)]
pub struct ForeignKeyReference {
    /// Referencing column in the owning table
    pub column: String,
    /// Referenced table
    pub target_table: QualifiedName,
    /// Referenced column in the target table
    pub target_column: String,
}

/// A table declaration.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    /// Qualified table name
    pub name: QualifiedName,
    /// Columns in declaration order
    pub columns: Vec<ColumnDefinition>,
    /// Indexes declared on the table
    pub indexes: Vec<IndexDefinition>,
    /// Foreign keys owned by the table
    pub foreign_keys: Vec<ForeignKeyReference>,
}

impl TableDefinition {
    /// Names of the columns flagged as primary key, in ordinal order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Look up a column by name, case-insensitively.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A view declaration. The query text is opaque to the pipeline.
#[derive(Debug, Clone)]
pub struct ViewDefinition {
    /// Qualified view name
    pub name: QualifiedName,
    /// Explicitly declared column names, possibly empty
    pub columns: Vec<String>,
    /// Underlying query text, carried through but never parsed
    pub query: String,
}

/// A batch of seed rows from one INSERT statement.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    /// Column names the batch provides values for
    pub columns: Vec<String>,
    /// Row literals, each the same length as `columns`
    pub rows: Vec<Vec<String>>,
}

/// Per-source, unvalidated structural extraction of one schema source.
#[derive(Debug, Default)]
pub struct RawModel {
    /// Name of the source this model was parsed from
    pub source: String,
    /// Tables declared in the source
    pub tables: Vec<TableDefinition>,
    /// Views declared in the source
    pub views: Vec<ViewDefinition>,
    /// Indexes declared via CREATE INDEX, attached to tables during refinement
    pub loose_indexes: Vec<(QualifiedName, IndexDefinition)>,
    /// Foreign keys declared via ALTER TABLE, attached during refinement
    pub pending_foreign_keys: Vec<(QualifiedName, ForeignKeyReference)>,
    /// Primary keys declared via ALTER TABLE: (table, constraint name, columns)
    pub pending_primary_keys: Vec<(QualifiedName, String, Vec<String>)>,
    /// Seed-row batches from INSERT statements, keyed by table
    pub seed_rows: Vec<(QualifiedName, SeedBatch)>,
}

/// One seed row normalized to (column, literal) pairs in declaration order.
pub type SeedRow = Vec<(String, String)>;

/// Merged, cross-referenced, validated schema aggregate.
///
/// Never mutated after construction; maps are ordered so that iteration is
/// deterministic across runs.
#[derive(Debug)]
pub struct RefinedSchema {
    /// Tables keyed by lowercase (schema, name)
    pub tables: BTreeMap<(String, String), TableDefinition>,
    /// Views keyed by lowercase (schema, name)
    pub views: BTreeMap<(String, String), ViewDefinition>,
    /// Seed rows per table, in source order
    pub seed_rows: BTreeMap<(String, String), Vec<SeedRow>>,
}

impl RefinedSchema {
    /// Look up a table by qualified name.
    pub fn table(&self, name: &QualifiedName) -> Option<&TableDefinition> {
        self.tables.get(&name.key())
    }
}
