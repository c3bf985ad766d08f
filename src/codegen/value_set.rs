//! Value-set entity emission.
//!
//! Built for large sets: values live in parallel static arrays indexed by a
//! `u16` newtype, so identity and equality compare an integer regardless of
//! string length, and lookup-by-value goes through a map built once. Output is
//! split into three artifacts (core type, data tables, serialization adapters)
//! so the size of any single generated unit stays constant as the value count
//! grows. A combinatorial dispatch helper is emitted only up to
//! [`DISPATCH_HELPER_MAX_VALUES`](super::DISPATCH_HELPER_MAX_VALUES) values.

use heck::ToSnakeCase;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use super::{
    artifact_path, field_ident, render, type_ident, Artifact, DISPATCH_HELPER_MAX_VALUES,
};
use crate::model::ValueSetSpecification;
use crate::schema::QualifiedName;
use crate::GeneratorError;

/// Generate the three artifacts for a value-set entity.
pub fn generate(
    name: &QualifiedName,
    spec: &ValueSetSpecification,
) -> Result<Vec<Artifact>, GeneratorError> {
    if spec.entries.len() > u16::MAX as usize {
        return Err(GeneratorError::CodeGen(format!(
            "value set {} has {} entries, more than a u16 index can address",
            name,
            spec.entries.len()
        )));
    }

    Ok(vec![
        core_artifact(name, spec)?,
        data_artifact(name, spec)?,
        serde_artifact(name)?,
    ])
}

fn core_artifact(
    name: &QualifiedName,
    spec: &ValueSetSpecification,
) -> Result<Artifact, GeneratorError> {
    let ty = type_ident(&name.name);
    let data_mod = field_ident(&format!("{}_data", name.name.to_snake_case()));
    let count = Literal::usize_unsuffixed(spec.entries.len());

    let dispatch = (spec.entries.len() <= DISPATCH_HELPER_MAX_VALUES)
        .then(|| dispatch_helper(&ty, spec));

    let doc = format!(
        "Handle into the `{}` value set; a 2-byte index into static data tables.",
        name
    );
    let tokens = quote! {
        use std::collections::HashMap;
        use std::sync::OnceLock;

        use super::#data_mod as data;

        #[doc = #doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct #ty(u16);

        impl #ty {
            /// Number of values in the set.
            pub const COUNT: usize = #count;

            /// All values, in declaration order.
            pub fn all() -> impl Iterator<Item = #ty> {
                (0..Self::COUNT as u16).map(#ty)
            }

            /// Handle for a raw index, if in range.
            pub fn from_index(index: usize) -> Option<#ty> {
                if index < Self::COUNT {
                    Some(#ty(index as u16))
                } else {
                    None
                }
            }

            /// Position of this value within the set.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Canonical value.
            pub fn value(self) -> &'static str {
                data::VALUES[self.0 as usize]
            }

            /// Display label.
            pub fn label(self) -> &'static str {
                data::LABELS[self.0 as usize]
            }

            /// Extra attribute by source column name, if present.
            pub fn extra(self, key: &str) -> Option<&'static str> {
                data::EXTRAS[self.0 as usize]
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
            }

            /// Look up a handle by canonical value. The value-to-index map is
            /// built on first use and never mutated afterwards.
            pub fn parse(value: &str) -> Option<#ty> {
                static LOOKUP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
                let lookup = LOOKUP.get_or_init(|| {
                    data::VALUES
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (*v, i as u16))
                        .collect()
                });
                lookup.get(value).copied().map(#ty)
            }
        }

        #dispatch
    };

    Ok(Artifact {
        name: artifact_path(name, ""),
        content: render(tokens)?,
    })
}

fn dispatch_helper(ty: &syn::Ident, spec: &ValueSetSpecification) -> TokenStream {
    let mut handlers: Vec<syn::Ident> = Vec::with_capacity(spec.entries.len());
    for (i, entry) in spec.entries.iter().enumerate() {
        let base = field_ident(&entry.value);
        let mut handler = format_ident!("on_{}", base);
        // Distinct values can still collapse to the same identifier
        if handlers.contains(&handler) {
            handler = format_ident!("on_{}_{}", base, i);
        }
        handlers.push(handler);
    }
    let indices: Vec<Literal> = (0..spec.entries.len())
        .map(|i| Literal::u16_unsuffixed(i as u16))
        .collect();

    quote! {
        impl #ty {
            /// Invoke the handler for this value, one handler per value.
            pub fn dispatch<R>(self, #(#handlers: impl FnOnce() -> R),*) -> R {
                match self.0 {
                    #(#indices => #handlers(),)*
                    _ => unreachable!("index out of range"),
                }
            }
        }
    }
}

fn data_artifact(
    name: &QualifiedName,
    spec: &ValueSetSpecification,
) -> Result<Artifact, GeneratorError> {
    let count = Literal::usize_unsuffixed(spec.entries.len());
    let values: Vec<&str> = spec.entries.iter().map(|e| e.value.as_str()).collect();
    let labels: Vec<&str> = spec.entries.iter().map(|e| e.label.as_str()).collect();
    let extras: Vec<TokenStream> = spec
        .entries
        .iter()
        .map(|e| {
            let pairs = e.extras.iter().map(|(k, v)| quote!((#k, #v)));
            quote!(&[#(#pairs),*])
        })
        .collect();

    let tokens = quote! {
        /// Canonical values, in declaration order.
        pub static VALUES: [&str; #count] = [#(#values),*];

        /// Display labels, parallel to `VALUES`.
        pub static LABELS: [&str; #count] = [#(#labels),*];

        /// Extra attributes as (column, literal) pairs, parallel to `VALUES`.
        pub static EXTRAS: [&[(&str, &str)]; #count] = [#(#extras),*];
    };

    Ok(Artifact {
        name: artifact_path(name, "_data"),
        content: render(tokens)?,
    })
}

fn serde_artifact(name: &QualifiedName) -> Result<Artifact, GeneratorError> {
    let ty = type_ident(&name.name);
    let core_mod = field_ident(&name.name);
    let error_ty = format_ident!("Parse{}Error", ty);
    let error_doc = format!("Error for a string that names no `{}` value.", ty);

    let tokens = quote! {
        use std::fmt;
        use std::str::FromStr;

        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::#core_mod::#ty;

        #[doc = #error_doc]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct #error_ty(pub String);

        impl fmt::Display for #error_ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "unknown value '{}'", self.0)
            }
        }

        impl std::error::Error for #error_ty {}

        impl fmt::Display for #ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.value())
            }
        }

        impl FromStr for #ty {
            type Err = #error_ty;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                #ty::parse(s).ok_or_else(|| #error_ty(s.to_string()))
            }
        }

        impl Serialize for #ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.value())
            }
        }

        impl<'de> Deserialize<'de> for #ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                #ty::parse(&value)
                    .ok_or_else(|| D::Error::custom(format!("unknown value '{}'", value)))
            }
        }
    };

    Ok(Artifact {
        name: artifact_path(name, "_serde"),
        content: render(tokens)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueSetEntry;

    fn spec_of(count: usize) -> ValueSetSpecification {
        ValueSetSpecification {
            entries: (0..count)
                .map(|i| ValueSetEntry {
                    value: format!("value_{}", i),
                    label: format!("Value {}", i),
                    extras: vec![("SortOrder".to_string(), i.to_string())],
                })
                .collect(),
        }
    }

    #[test]
    fn test_three_artifacts_per_value_set() {
        let name = QualifiedName::new("dbo", "OrderStatus");
        let artifacts = generate(&name, &spec_of(3)).unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "dbo/order_status.rs",
                "dbo/order_status_data.rs",
                "dbo/order_status_serde.rs",
            ]
        );
    }

    #[test]
    fn test_core_artifact_compares_by_index() {
        let name = QualifiedName::new("dbo", "OrderStatus");
        let artifacts = generate(&name, &spec_of(3)).unwrap();
        let core = &artifacts[0].content;
        assert!(core.contains("pub struct OrderStatus(u16)"));
        assert!(core.contains("pub const COUNT: usize = 3"));
        assert!(core.contains("OnceLock"));
        assert!(core.contains("pub fn parse"));
    }

    #[test]
    fn test_data_artifact_holds_parallel_arrays() {
        let name = QualifiedName::new("dbo", "OrderStatus");
        let artifacts = generate(&name, &spec_of(2)).unwrap();
        let data = &artifacts[1].content;
        assert!(data.contains("pub static VALUES: [&str; 2]"));
        assert!(data.contains("pub static LABELS: [&str; 2]"));
        assert!(data.contains("pub static EXTRAS: [&[(&str, &str)]; 2]"));
        assert!(data.contains("\"value_0\""));
        assert!(data.contains("\"Value 1\""));
        assert!(data.contains("\"SortOrder\""));
    }

    #[test]
    fn test_serde_artifact_round_trips_by_value() {
        let name = QualifiedName::new("dbo", "OrderStatus");
        let artifacts = generate(&name, &spec_of(2)).unwrap();
        let adapter = &artifacts[2].content;
        assert!(adapter.contains("impl Serialize for OrderStatus"));
        assert!(adapter.contains("serialize_str(self.value())"));
        assert!(adapter.contains("impl<'de> Deserialize<'de> for OrderStatus"));
        assert!(adapter.contains("OrderStatus::parse(&value)"));
        assert!(adapter.contains("impl FromStr for OrderStatus"));
    }

    #[test]
    fn test_dispatch_helper_present_at_threshold() {
        let name = QualifiedName::new("dbo", "S");
        let artifacts = generate(&name, &spec_of(DISPATCH_HELPER_MAX_VALUES)).unwrap();
        let core = &artifacts[0].content;
        assert!(core.contains("pub fn dispatch"));
        assert_eq!(core.matches("impl FnOnce() -> R").count(), 25);
    }

    #[test]
    fn test_dispatch_helper_absent_above_threshold() {
        let name = QualifiedName::new("dbo", "S");
        let artifacts = generate(&name, &spec_of(DISPATCH_HELPER_MAX_VALUES + 1)).unwrap();
        assert!(!artifacts[0].content.contains("pub fn dispatch"));
    }

    #[test]
    fn test_empty_value_set_generates() {
        let name = QualifiedName::new("dbo", "S");
        let artifacts = generate(&name, &ValueSetSpecification::default()).unwrap();
        assert!(artifacts[0].content.contains("pub const COUNT: usize = 0"));
        assert!(artifacts[1].content.contains("[&str; 0]"));
    }
}
