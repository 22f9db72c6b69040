//! Derive macros for `typeroute`.
//!
//! - `#[derive(Params)]` implements `Fields`, `ParamValue` and, when a location is
//!   given with `#[params(url|header|body)]`, `Params`.
//! - `#[derive(Response)]` implements `Response` from the `header`, `data`, `meta`
//!   and `error` fields and a `#[response(status = Marker)]` attribute.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, LitStr,
    Path, PathArguments, Type,
};

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::FieldsNamed> {
    match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => Ok(named),
            _ => Err(syn::Error::new(
                input.ident.span(),
                "expected a struct with named fields",
            )),
        },
        _ => Err(syn::Error::new(input.ident.span(), "expected a struct")),
    }
}

/// The single generic argument of `Wrapper<T>` when the last path segment is `wrapper`.
fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(p) = ty else { return None };
    if p.qself.is_some() {
        return None;
    }
    let seg = p.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn last_ident_is(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(p) => p.path.segments.last().is_some_and(|s| s.ident == name),
        _ => false,
    }
}

fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    let text = lines.join(" ").trim().to_string();
    (!text.is_empty()).then_some(text)
}

// ---------------------------------------------------------------------------
// serde attributes
// ---------------------------------------------------------------------------

/// The serde attributes that change where a field lives in the deserialized object.
#[derive(Default)]
struct SerdeAttrs {
    rename: Option<LitStr>,
    rename_all: Option<LitStr>,
    flatten: bool,
}

/// Read `rename = "x"` or `rename(deserialize = "x")`.
fn deserialize_name(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Option<LitStr>> {
    if meta.input.peek(syn::Token![=]) {
        return Ok(Some(meta.value()?.parse()?));
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let value: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("deserialize") {
            name = Some(value);
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consume the value of a serde key this derive does not care about.
fn skip_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

impl SerdeAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = deserialize_name(&meta)?;
                } else if meta.path.is_ident("rename_all") {
                    out.rename_all = deserialize_name(&meta)?;
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// Apply a serde `rename_all` rule to a snake_case field name.
fn apply_rename_all(rule: &LitStr, field: &str) -> syn::Result<String> {
    let pascal = || {
        field
            .split('_')
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |c| {
                    c.to_uppercase().chain(chars).collect::<String>()
                })
            })
            .collect::<String>()
    };
    let renamed = match rule.value().as_str() {
        "lowercase" | "snake_case" => field.to_ascii_lowercase(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let p = pascal();
            let mut chars = p.chars();
            chars.next().map_or_else(String::new, |c| {
                c.to_lowercase().chain(chars).collect::<String>()
            })
        }
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.to_ascii_uppercase().replace('_', "-"),
        other => {
            return Err(syn::Error::new(
                rule.span(),
                format!("unknown serde rename rule `{other}`"),
            ))
        }
    };
    Ok(renamed)
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParamAttrs {
    name: Option<LitStr>,
    default: Option<LitStr>,
    example: Option<LitStr>,
    description: Option<LitStr>,
    minimum: Option<Expr>,
    maximum: Option<Expr>,
    min_length: Option<Expr>,
    max_length: Option<Expr>,
    pattern: Option<LitStr>,
    format: Option<LitStr>,
    one_of: Option<LitStr>,
    embed: bool,
}

impl ParamAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                match key.as_str() {
                    "embed" => out.embed = true,
                    "name" => out.name = Some(meta.value()?.parse()?),
                    "default" => out.default = Some(meta.value()?.parse()?),
                    "example" => out.example = Some(meta.value()?.parse()?),
                    "description" => out.description = Some(meta.value()?.parse()?),
                    "minimum" => out.minimum = Some(meta.value()?.parse()?),
                    "maximum" => out.maximum = Some(meta.value()?.parse()?),
                    "min_length" => out.min_length = Some(meta.value()?.parse()?),
                    "max_length" => out.max_length = Some(meta.value()?.parse()?),
                    "pattern" => out.pattern = Some(meta.value()?.parse()?),
                    "format" => out.format = Some(meta.value()?.parse()?),
                    "one_of" => out.one_of = Some(meta.value()?.parse()?),
                    _ => return Err(meta.error(format!("unknown param attribute `{key}`"))),
                }
                Ok(())
            })?;
        }
        Ok(out)
    }

    fn modifiers(&self, docs: Option<String>) -> TokenStream2 {
        let mut calls = TokenStream2::new();
        if let Some(name) = &self.name {
            calls.extend(quote!(.rename(#name)));
        }
        if let Some(default) = &self.default {
            calls.extend(quote!(.default_literal(#default)));
        }
        if let Some(example) = &self.example {
            calls.extend(quote!(.example(#example)));
        }
        match (&self.description, docs) {
            (Some(d), _) => calls.extend(quote!(.description(#d))),
            (None, Some(d)) => calls.extend(quote!(.description(#d))),
            (None, None) => {}
        }
        if let Some(n) = &self.minimum {
            calls.extend(quote!(.minimum((#n) as f64)));
        }
        if let Some(n) = &self.maximum {
            calls.extend(quote!(.maximum((#n) as f64)));
        }
        if let Some(n) = &self.min_length {
            calls.extend(quote!(.min_length((#n) as u64)));
        }
        if let Some(n) = &self.max_length {
            calls.extend(quote!(.max_length((#n) as u64)));
        }
        if let Some(p) = &self.pattern {
            calls.extend(quote!(.pattern(#p)));
        }
        if let Some(f) = &self.format {
            calls.extend(quote!(.format(#f)));
        }
        if let Some(list) = &self.one_of {
            let values = list
                .value()
                .split('|')
                .map(str::trim)
                .map(|v| quote!(::typeroute::__private::literal_value(#v)))
                .collect::<Vec<_>>();
            calls.extend(quote!(.one_of(&[#(#values),*])));
        }
        calls
    }

    fn has_field_modifiers(&self) -> bool {
        self.name.is_some()
            || self.default.is_some()
            || self.example.is_some()
            || self.minimum.is_some()
            || self.maximum.is_some()
            || self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
            || self.format.is_some()
            || self.one_of.is_some()
    }
}

fn params_location(attrs: &[Attribute]) -> syn::Result<Option<Ident>> {
    let mut location = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("params")) {
        attr.parse_nested_meta(|meta| {
            let variant = match meta.path.get_ident().map(ToString::to_string).as_deref() {
                Some("url") => "Url",
                Some("header") => "Header",
                Some("body") => "Body",
                _ => return Err(meta.error("expected `url`, `header` or `body`")),
            };
            if location.is_some() {
                return Err(meta.error("params location given twice"));
            }
            location = Some(Ident::new(variant, meta.path.span()));
            Ok(())
        })?;
    }
    Ok(location)
}

/// The key serde reads the field from, and the wire name an explicit serde
/// rename implies when `#[param(name)]` is absent.
fn field_key(
    ident: &Ident,
    serde: &SerdeAttrs,
    rename_all: Option<&LitStr>,
) -> syn::Result<(String, Option<LitStr>)> {
    if let Some(rename) = &serde.rename {
        return Ok((rename.value(), Some(rename.clone())));
    }
    let raw = ident.to_string();
    let plain = raw.strip_prefix("r#").unwrap_or(&raw);
    match rename_all {
        Some(rule) => Ok((apply_rename_all(rule, plain)?, None)),
        None => Ok((plain.to_string(), None)),
    }
}

fn describe_field(field: &syn::Field, rename_all: Option<&LitStr>) -> syn::Result<TokenStream2> {
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new(field.span(), "expected a named field"));
    };
    let serde = SerdeAttrs::parse(&field.attrs)?;
    if serde.flatten {
        return Err(syn::Error::new(
            field.span(),
            "`#[serde(flatten)]` is not supported on bound fields; use `#[param(embed)]`",
        ));
    }
    let (key, serde_name) = field_key(ident, &serde, rename_all)?;
    let mut attrs = ParamAttrs::parse(&field.attrs)?;
    let ty = &field.ty;

    if attrs.embed {
        if attrs.has_field_modifiers() {
            return Err(syn::Error::new(
                field.span(),
                "an embedded field takes no other param attributes",
            ));
        }
        return Ok(quote!(fields.embed::<#ty>(#key);));
    }

    if attrs.name.is_none() {
        attrs.name = serde_name;
    }
    let modifiers = attrs.modifiers(doc_text(&field.attrs));
    let call = if let Some(inner) = unwrap_generic(ty, "Option") {
        if unwrap_generic(inner, "Vec").is_some() {
            return Err(syn::Error::new(
                ty.span(),
                "`Option<Vec<_>>` is not supported; an absent repeated field is already empty",
            ));
        }
        quote!(fields.optional::<#inner>(#key))
    } else if let Some(inner) = unwrap_generic(ty, "Vec") {
        quote!(fields.repeated::<#inner>(#key))
    } else {
        quote!(fields.plain::<#ty>(#key))
    };
    Ok(quote!(#call #modifiers;))
}

fn expand_params(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = named_fields(input)?;
    let location = params_location(&input.attrs)?;
    let container = SerdeAttrs::parse(&input.attrs)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let decls = fields
        .named
        .iter()
        .map(|f| describe_field(f, container.rename_all.as_ref()))
        .collect::<syn::Result<Vec<_>>>()?;

    let set = if decls.is_empty() {
        quote!(_fields)
    } else {
        quote!(fields)
    };

    let params_impl = location.map(|loc| {
        quote! {
            impl #impl_generics ::typeroute::params::Params for #ident #ty_generics #where_clause {
                const LOCATION: ::typeroute::params::ParamLocation =
                    ::typeroute::params::ParamLocation::#loc;
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::typeroute::params::Fields for #ident #ty_generics #where_clause {
            fn describe(#set: &mut ::typeroute::params::FieldSet) {
                #(#decls)*
            }
        }

        impl #impl_generics ::typeroute::params::ParamValue for #ident #ty_generics #where_clause {
            fn schema() -> ::typeroute::__private::Value {
                ::typeroute::params::object_schema::<Self>()
            }
        }

        #params_impl
    })
}

/// Derive `Fields`, `ParamValue` and (with `#[params(...)]`) `Params`.
///
/// The struct must also derive `serde::Deserialize`.
///
/// Field attributes, all under `#[param(...)]`:
///
/// | attribute | effect |
/// |-----------|--------|
/// | `name = "x"` | wire name override |
/// | `default = "json"` | default value as a JSON literal |
/// | `example = "json"` | example value as a JSON literal |
/// | `description = "..."` | description; doc comments are used otherwise |
/// | `minimum = n`, `maximum = n` | numeric bounds |
/// | `min_length = n`, `max_length = n` | string length bounds |
/// | `pattern = "regex"` | string pattern |
/// | `format = "name"` | named string format |
/// | `one_of = "1 \| 2"` | allowed JSON literals, `\|`-separated |
/// | `embed` | flatten the fields of a nested `Params`-derived struct, by value or boxed |
///
/// Fields are read back under serde's key, so `#[serde(rename_all = "...")]` on the
/// struct and `#[serde(rename = "...")]` on a field are honoured. A field rename
/// also becomes the wire name unless `#[param(name)]` is given; `rename_all` only
/// moves the key and the wire name keeps the location's case convention.
/// `#[serde(flatten)]` is rejected in favour of `embed`.
#[proc_macro_derive(Params, attributes(params, param))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_params(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

fn response_status(attrs: &[Attribute], span: proc_macro2::Span) -> syn::Result<Path> {
    let mut status = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("response")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("status") {
                status = Some(meta.value()?.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("expected `status = StatusMarker`"))
            }
        })?;
    }
    status.ok_or_else(|| {
        syn::Error::new(
            span,
            "missing #[response(status = ...)]: a response needs a fixed status marker",
        )
    })
}

fn is_direct(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut direct = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("response")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("direct") {
                direct = true;
                Ok(())
            } else {
                Err(meta.error("expected `direct`"))
            }
        })?;
    }
    Ok(direct)
}

fn expand_response(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = named_fields(input)?;
    let status = response_status(&input.attrs, input.ident.span())?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut describe = Vec::new();
    let mut header = quote!(None);
    let mut data = quote!(None);
    let mut meta = quote!(None);
    let mut error = quote!(None);

    for field in &fields.named {
        let Some(name) = &field.ident else { continue };
        let ty = &field.ty;
        let direct = is_direct(&field.attrs)?;
        if direct && name != "data" {
            return Err(syn::Error::new(
                field.span(),
                "only the `data` field can be direct",
            ));
        }
        let encode = quote!(Some(::typeroute::response::ResponseParts::encode(&self.#name)));
        match name.to_string().as_str() {
            "header" => {
                describe.push(quote!(shape.header::<#ty>();));
                header = encode;
            }
            "data" if last_ident_is(ty, "DataStream") => {
                if direct {
                    return Err(syn::Error::new(
                        field.span(),
                        "a streamed `data` field cannot be direct",
                    ));
                }
                describe.push(quote!(shape.data_stream();));
                data = quote!(Some(::typeroute::response::DataPart::Stream(self.data)));
            }
            "data" => {
                if direct {
                    describe.push(quote!(shape.data_direct::<#ty>();));
                } else {
                    describe.push(quote!(shape.data::<#ty>();));
                }
                data = quote!(Some(::typeroute::response::DataPart::Json(
                    ::typeroute::response::ResponseParts::encode(&self.data)
                )));
            }
            "meta" => {
                describe.push(quote!(shape.meta::<#ty>();));
                meta = encode;
            }
            "error" => {
                describe.push(quote!(shape.error::<#ty>();));
                error = encode;
            }
            other => {
                return Err(syn::Error::new(
                    name.span(),
                    format!("unexpected response field `{other}`; expected header, data, meta or error"),
                ))
            }
        }
    }

    let shape = if describe.is_empty() {
        quote!(_shape)
    } else {
        quote!(shape)
    };

    Ok(quote! {
        impl #impl_generics ::typeroute::response::Response for #ident #ty_generics #where_clause {
            type Status = #status;

            fn describe(#shape: &mut ::typeroute::response::ShapeDecl) {
                #(#describe)*
            }

            fn into_parts(self) -> ::typeroute::response::ResponseParts {
                ::typeroute::response::ResponseParts {
                    header: #header,
                    data: #data,
                    meta: #meta,
                    error: #error,
                }
            }
        }
    })
}

/// Derive `Response`.
///
/// ```ignore
/// #[derive(Response)]
/// #[response(status = StatusOk)]
/// struct Listed {
///     header: ListHeaders,
///     data: Vec<Item>,
///     meta: Paging,
/// }
/// ```
///
/// `#[response(direct)]` on `data` drops the `{"data": ...}` envelope; a `data`
/// field of type `DataStream` is streamed as the body.
#[proc_macro_derive(Response, attributes(response))]
pub fn derive_response(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_response(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
