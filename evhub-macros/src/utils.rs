use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Fields, Path, Token};

/// 将必需的派生合并进已有的 `#[derive(...)]`，按末段名去重，并放在属性最前
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) {
    let mut others = Vec::new();
    let mut existing: Vec<Path> = Vec::new();
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            others.push(attr);
            continue;
        }
        match attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            Ok(list) => existing.extend(list),
            Err(_) => others.push(attr),
        }
    }

    let mut seen = std::collections::HashSet::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(others);
}

// `Debug` 与 `std::fmt::Debug` 视为同一派生
fn derive_key(p: &Path) -> String {
    p.segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_else(|| p.to_token_stream().to_string())
}

pub(crate) fn has_field_named(fields: &Fields, name: &syn::Ident) -> bool {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .any(|f| f.ident.as_ref().is_some_and(|i| i == name)),
        _ => false,
    }
}
