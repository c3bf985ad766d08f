//! Code emission for target entity models.
//!
//! Row-shaped entities become one artifact each; value sets are split into
//! three independently emittable artifacts (core type, data tables,
//! serialization adapters) so no single generated unit grows with the number
//! of values.

pub mod entity;
pub mod value_set;

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Span, TokenStream};

use crate::model::{EntityShape, TargetEntityModel};
use crate::schema::QualifiedName;
use crate::GeneratorError;

/// Largest value count for which the combinatorial dispatch helper is emitted.
///
/// Above this the helper's parameter list becomes impractical; callers switch
/// on the integer index instead.
pub const DISPATCH_HELPER_MAX_VALUES: usize = 25;

/// One named unit of generated output text.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Artifact name, unique within a pipeline run
    pub name: String,
    /// Generated source text
    pub content: String,
}

/// Generate all artifacts for one entity.
pub fn generate_entity(model: &TargetEntityModel) -> Result<Vec<Artifact>, GeneratorError> {
    match &model.shape {
        EntityShape::Row { properties } => Ok(vec![entity::generate(&model.name, properties)?]),
        EntityShape::ValueSet(spec) => value_set::generate(&model.name, spec),
    }
}

/// Artifact path for an entity, e.g. `dbo/order_status.rs`.
pub(crate) fn artifact_path(name: &QualifiedName, suffix: &str) -> String {
    format!(
        "{}/{}{}.rs",
        name.schema.to_snake_case(),
        name.name.to_snake_case(),
        suffix
    )
}

fn sanitize(mut name: String, fallback: &str) -> String {
    name.retain(|c| c.is_ascii_alphanumeric() || c == '_');
    if name.is_empty() {
        name = fallback.to_string();
    }
    if name.as_bytes()[0].is_ascii_digit() {
        name.insert(0, '_');
    }
    // Names raw identifiers cannot represent
    if matches!(name.as_str(), "self" | "Self" | "super" | "crate" | "_") {
        name.push('_');
    }
    name
}

/// Snake-case field/module identifier for an arbitrary source name.
pub(crate) fn field_ident(raw: &str) -> syn::Ident {
    let name = sanitize(raw.to_snake_case(), "field");
    syn::parse_str(&name).unwrap_or_else(|_| syn::Ident::new_raw(&name, Span::call_site()))
}

/// UpperCamelCase type identifier for an arbitrary source name.
pub(crate) fn type_ident(raw: &str) -> syn::Ident {
    let name = sanitize(raw.to_upper_camel_case(), "Entity");
    syn::parse_str(&name).unwrap_or_else(|_| syn::Ident::new_raw(&name, Span::call_site()))
}

/// Parse a configured target type into a Rust type, falling back to an
/// identifier derived from the string when it is not valid Rust syntax.
pub(crate) fn rust_type(type_name: &str) -> syn::Type {
    syn::parse_str(type_name).unwrap_or_else(|_| {
        let ident = type_ident(type_name);
        syn::parse_quote!(#ident)
    })
}

/// Format a token stream as a generated source file.
pub(crate) fn render(tokens: TokenStream) -> Result<String, GeneratorError> {
    let file: syn::File = syn::parse2(tokens).map_err(|e| GeneratorError::CodeGen(e.to_string()))?;
    Ok(format!(
        "//! Generated by ddl-gen-entities. Do not edit.\n\n{}",
        prettyplease::unparse(&file)
    ))
}
