use crate::utils::{apply_derives, has_field_named};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Expr, Generics, Ident, Item, ItemEnum, ItemStruct, LitStr, Result, Token, parse::Parse,
    parse::ParseStream, parse_macro_input,
};

/// #[event] 宏实现
/// - 结构体：`event_name` 为类型名或 `name = "..."`，`aggregate` 指向具名字段；
/// - 枚举：逐变体生成 match 分支，默认名为 `Enum.Variant`，
///   变体可用 `#[event(name = "...")]` 覆写；指定 `aggregate` 时每个变体都必须带有该具名字段。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let generated = match &mut input {
        Item::Struct(st) => expand_struct(st, &cfg),
        Item::Enum(en) => expand_enum(en, &cfg),
        other => Err(syn::Error::new(
            other.span(),
            "#[event] can only be used on struct or enum types",
        )),
    };

    match generated {
        Ok(impls) => quote! {
            #input
            #impls
        }
        .into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(st: &mut ItemStruct, cfg: &EventAttrConfig) -> Result<TokenStream2> {
    apply_derives(&mut st.attrs, vec![syn::parse_quote!(Debug)]);

    let name = cfg
        .name
        .clone()
        .unwrap_or_else(|| LitStr::new(&st.ident.to_string(), st.ident.span()));

    let aggregate_body = match &cfg.aggregate {
        Some(field) => {
            if !has_field_named(&st.fields, field) {
                return Err(syn::Error::new(
                    field.span(),
                    format!("#[event(aggregate = {field})] requires a named field `{field}`"),
                ));
            }
            Some(quote! {
                ::std::convert::Into::<::evhub_core::AggregateId>::into(
                    ::std::clone::Clone::clone(&self.#field)
                )
            })
        }
        None => None,
    };

    Ok(trait_impls(&st.ident, &st.generics, quote! { #name }, aggregate_body))
}

fn expand_enum(en: &mut ItemEnum, cfg: &EventAttrConfig) -> Result<TokenStream2> {
    if cfg.name.is_some() {
        return Err(syn::Error::new(
            en.ident.span(),
            "`name` is not allowed on enums; set #[event(name = \"...\")] on variants instead",
        ));
    }
    if en.variants.is_empty() {
        return Err(syn::Error::new(
            en.span(),
            "#[event] requires at least one enum variant",
        ));
    }

    apply_derives(&mut en.attrs, vec![syn::parse_quote!(Debug)]);

    let enum_name = en.ident.to_string();
    let mut name_arms = Vec::new();
    let mut aggregate_arms = Vec::new();

    for v in &mut en.variants {
        let mut override_name: Option<LitStr> = None;
        let mut retained = Vec::new();
        for attr in v.attrs.drain(..) {
            if !attr.path().is_ident("event") {
                retained.push(attr);
                continue;
            }
            if override_name.is_some() {
                return Err(syn::Error::new(
                    attr.span(),
                    "duplicate #[event(...)] on this variant",
                ));
            }
            override_name = Some(parse_variant_name(&attr)?);
        }
        v.attrs = retained;

        let v_ident = &v.ident;
        let name = override_name.unwrap_or_else(|| {
            LitStr::new(&format!("{enum_name}.{v_ident}"), v_ident.span())
        });
        name_arms.push(quote! { Self::#v_ident { .. } => #name });

        if let Some(field) = &cfg.aggregate {
            if !has_field_named(&v.fields, field) {
                return Err(syn::Error::new(
                    v.span(),
                    format!("variant `{v_ident}` has no named field `{field}` required by #[event(aggregate = {field})]"),
                ));
            }
            aggregate_arms.push(quote! {
                Self::#v_ident { #field: __aggregate, .. } =>
                    ::std::convert::Into::<::evhub_core::AggregateId>::into(
                        ::std::clone::Clone::clone(__aggregate)
                    )
            });
        }
    }

    let aggregate_body = cfg
        .aggregate
        .as_ref()
        .map(|_| quote! { match self { #( #aggregate_arms, )* } });

    Ok(trait_impls(
        &en.ident,
        &en.generics,
        quote! { match self { #( #name_arms, )* } },
        aggregate_body,
    ))
}

fn trait_impls(
    ident: &Ident,
    generics: &Generics,
    name_body: TokenStream2,
    aggregate_body: Option<TokenStream2>,
) -> TokenStream2 {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let as_routable = aggregate_body.as_ref().map(|_| {
        quote! {
            fn as_routable(&self) -> ::std::option::Option<&dyn ::evhub_core::RoutableEvent> {
                ::std::option::Option::Some(self)
            }
        }
    });

    let routable_impl = aggregate_body.map(|body| {
        quote! {
            impl #impl_generics ::evhub_core::RoutableEvent for #ident #ty_generics #where_clause {
                fn aggregate_id(&self) -> ::evhub_core::AggregateId {
                    #body
                }
            }
        }
    });

    quote! {
        impl #impl_generics ::evhub_core::Event for #ident #ty_generics #where_clause {
            fn event_name(&self) -> &'static str {
                #name_body
            }

            #as_routable
        }

        #routable_impl
    }
}

fn parse_variant_name(attr: &syn::Attribute) -> Result<LitStr> {
    let pairs = attr.parse_args_with(Punctuated::<AttrKv, Token![,]>::parse_terminated)?;
    let mut name = None;
    for kv in pairs {
        if kv.key != "name" {
            return Err(syn::Error::new(
                kv.key.span(),
                "unknown key on variant; expected 'name'",
            ));
        }
        if name.is_some() {
            return Err(syn::Error::new(kv.key.span(), "duplicate key 'name'"));
        }
        name = Some(expect_str(kv.value, "name")?);
    }
    name.ok_or_else(|| syn::Error::new(attr.span(), "expected #[event(name = \"...\")]"))
}

fn expect_str(value: Expr, key: &str) -> Result<LitStr> {
    match value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(lit),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected string literal for '{key}'"),
        )),
    }
}

// 解析宏参数：aggregate = <field>、name = "<literal>"
struct EventAttrConfig {
    aggregate: Option<Ident>,
    name: Option<LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut aggregate: Option<Ident> = None;
        let mut name: Option<LitStr> = None;

        let pairs = Punctuated::<AttrKv, Token![,]>::parse_terminated(input)?;
        for kv in pairs {
            match kv.key.to_string().as_str() {
                "aggregate" => {
                    if aggregate.is_some() {
                        return Err(syn::Error::new(kv.key.span(), "duplicate key 'aggregate'"));
                    }
                    let field = match kv.value {
                        Expr::Path(p) if p.path.get_ident().is_some() => p.path.segments[0].ident.clone(),
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected a field name for 'aggregate'",
                            ));
                        }
                    };
                    aggregate = Some(field);
                }
                "name" => {
                    if name.is_some() {
                        return Err(syn::Error::new(kv.key.span(), "duplicate key 'name'"));
                    }
                    name = Some(expect_str(kv.value, "name")?);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'aggregate' | 'name'",
                    ));
                }
            }
        }

        Ok(Self { aggregate, name })
    }
}

struct AttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}
