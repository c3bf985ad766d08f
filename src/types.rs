//! Type-mapping rule engine.
//!
//! Resolution is a precedence-ordered pattern match, not a first-match lookup:
//! every matching rule is scored by how many pattern fields it declared
//! (specificity), the highest score wins, and ties go to the earlier-declared
//! rule. Broad defaults and narrow overrides therefore coexist in one flat
//! rule list. A column no rule matches resolves to the designated Unknown
//! target type, a valid state rather than an error.

use regex::{Regex, RegexBuilder};

use crate::config::TypeMappingRule;
use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Target type name emitted for columns no rule matches.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// A single compiled pattern field.
#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    fn compile(pattern: &str, is_regex: bool) -> Result<Self, regex::Error> {
        if is_regex {
            Ok(Pattern::Regex(
                RegexBuilder::new(pattern).case_insensitive(true).build()?,
            ))
        } else {
            Ok(Pattern::Literal(pattern.to_string()))
        }
    }

    fn matches(&self, field: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal.eq_ignore_ascii_case(field),
            Pattern::Regex(regex) => regex.is_match(field),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    schema: Option<Pattern>,
    table: Option<Pattern>,
    column: Option<Pattern>,
    source_type: Pattern,
    target_type: String,
    specificity: u8,
}

impl CompiledRule {
    fn matches(&self, schema: &str, table: &str, column: &str, source_type: &str) -> bool {
        self.source_type.matches(source_type)
            && self.schema.as_ref().map_or(true, |p| p.matches(schema))
            && self.table.as_ref().map_or(true, |p| p.matches(table))
            && self.column.as_ref().map_or(true, |p| p.matches(column))
    }
}

/// The outcome of resolving one column's source type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// A rule matched and produced this target type
    Mapped(String),
    /// No rule matched; carried forward as the Unknown target type
    Unknown,
}

impl ResolvedType {
    /// The target-language type name to emit.
    pub fn type_name(&self) -> &str {
        match self {
            ResolvedType::Mapped(name) => name,
            ResolvedType::Unknown => UNKNOWN_TYPE,
        }
    }

    /// Whether resolution fell through to the Unknown sentinel.
    pub fn is_unknown(&self) -> bool {
        matches!(self, ResolvedType::Unknown)
    }
}

/// An immutable, compiled set of type-mapping rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile the configured rules, rejecting malformed regex patterns.
    ///
    /// Compilation failures are reported once per offending rule, not once per
    /// column later evaluated against it.
    pub fn compile(rules: &[TypeMappingRule]) -> Result<RuleSet, Vec<Diagnostic>> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut diagnostics = Vec::new();

        for (position, rule) in rules.iter().enumerate() {
            match Self::compile_rule(rule) {
                Ok(c) => compiled.push(c),
                Err(error) => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::TypeRuleCompilation,
                    format!(
                        "rule {} (source type '{}'): {}",
                        position + 1,
                        rule.source_type,
                        error
                    ),
                )),
            }
        }

        if diagnostics.is_empty() {
            Ok(RuleSet { rules: compiled })
        } else {
            Err(diagnostics)
        }
    }

    fn compile_rule(rule: &TypeMappingRule) -> Result<CompiledRule, regex::Error> {
        let compile_opt = |pattern: &Option<String>| -> Result<Option<Pattern>, regex::Error> {
            pattern
                .as_deref()
                .map(|p| Pattern::compile(p, rule.regex))
                .transpose()
        };

        let schema = compile_opt(&rule.schema)?;
        let table = compile_opt(&rule.table)?;
        let column = compile_opt(&rule.column)?;
        let source_type = Pattern::compile(&rule.source_type, rule.regex)?;

        let specificity = 1
            + schema.is_some() as u8
            + table.is_some() as u8
            + column.is_some() as u8;

        Ok(CompiledRule {
            schema,
            table,
            column,
            source_type,
            target_type: rule.target_type.clone(),
            specificity,
        })
    }

    /// Resolve one column to a target type. Never fails.
    pub fn resolve(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        source_type: &str,
    ) -> ResolvedType {
        let mut best: Option<&CompiledRule> = None;
        for rule in &self.rules {
            if !rule.matches(schema, table, column, source_type) {
                continue;
            }
            // Strictly-greater keeps the earlier declaration on ties
            if best.map_or(true, |b| rule.specificity > b.specificity) {
                best = Some(rule);
            }
        }
        match best {
            Some(rule) => ResolvedType::Mapped(rule.target_type.clone()),
            None => ResolvedType::Unknown,
        }
    }
}
