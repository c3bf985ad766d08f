//! Row-shaped entity emission.
//!
//! One artifact per entity: a value-object struct with one field per column,
//! a constructor, and equality derived over the full field set.

use quote::quote;

use super::{artifact_path, field_ident, render, rust_type, type_ident, Artifact};
use crate::model::PropertyModel;
use crate::schema::QualifiedName;
use crate::GeneratorError;

/// Generate the artifact for a row-shaped entity.
pub fn generate(
    name: &QualifiedName,
    properties: &[PropertyModel],
) -> Result<Artifact, GeneratorError> {
    let type_name = type_ident(&name.name);

    let field_idents: Vec<syn::Ident> =
        properties.iter().map(|p| field_ident(&p.name)).collect();
    let field_types: Vec<proc_macro2::TokenStream> = properties
        .iter()
        .map(|p| {
            let ty = rust_type(p.target_type.type_name());
            if p.nullable {
                quote!(Option<#ty>)
            } else {
                quote!(#ty)
            }
        })
        .collect();
    let primary_key: Vec<&str> = properties
        .iter()
        .filter(|p| p.primary_key)
        .map(|p| p.name.as_str())
        .collect();

    let doc = format!("Value object for `{}`.", name);
    let tokens = quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, PartialEq)]
        pub struct #type_name {
            #(pub #field_idents: #field_types,)*
        }

        impl #type_name {
            /// Source columns forming the primary key.
            pub const PRIMARY_KEY: &'static [&'static str] = &[#(#primary_key),*];

            /// Construct from all properties, in source column order.
            pub fn new(#(#field_idents: #field_types),*) -> Self {
                Self { #(#field_idents),* }
            }
        }
    };

    Ok(Artifact {
        name: artifact_path(name, ""),
        content: render(tokens)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolvedType;

    fn property(name: &str, target: ResolvedType, nullable: bool, pk: bool) -> PropertyModel {
        PropertyModel {
            name: name.to_string(),
            target_type: target,
            nullable,
            primary_key: pk,
        }
    }

    #[test]
    fn test_row_entity_artifact() {
        let name = QualifiedName::new("dbo", "Users");
        let properties = vec![
            property("Id", ResolvedType::Mapped("i64".into()), false, true),
            property("Email", ResolvedType::Mapped("String".into()), true, false),
            property("Age", ResolvedType::Unknown, true, false),
        ];
        let artifact = generate(&name, &properties).unwrap();

        assert_eq!(artifact.name, "dbo/users.rs");
        assert!(artifact.content.contains("pub struct Users"));
        assert!(artifact.content.contains("pub id: i64"));
        assert!(artifact.content.contains("pub email: Option<String>"));
        // Unmapped columns surface the Unknown sentinel type in output
        assert!(artifact.content.contains("pub age: Option<Unknown>"));
        assert!(artifact.content.contains(r#"&["Id"]"#));
        assert!(artifact.content.contains("PartialEq"));
        assert!(artifact.content.contains("pub fn new"));
    }

    #[test]
    fn test_entity_without_columns_still_generates() {
        let name = QualifiedName::new("dbo", "Empty");
        let artifact = generate(&name, &[]).unwrap();
        assert!(artifact.content.contains("pub struct Empty"));
    }
}
