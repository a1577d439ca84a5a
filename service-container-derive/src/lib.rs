//! Derive macro for service-container
//!
//! `#[derive(Inject)]` implements `Constructible` for a struct so the
//! container can build it by parameter injection. Each field becomes one
//! constructor parameter named after the field:
//!
//! | Field type | Parameter |
//! |---|---|
//! | `Arc<T>` | required service `T` |
//! | `Option<Arc<T>>` | optional service `T` |
//! | integers, floats, `bool`, `char`, `String` | value that also accepts strings |
//! | anything else | plain value, must be `Clone` |
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::{Concrete, Container, Inject};
//! use std::sync::Arc;
//!
//! struct Database;
//!
//! #[derive(Inject)]
//! struct UserService {
//!     db: Arc<Database>,
//!     cache: Option<Arc<Cache>>,
//!     #[inject(name = "max_users", default = 100)]
//!     limit: u32,
//! }
//!
//! let container = Container::new();
//! container.bind("users", Concrete::of::<UserService>(), true)?;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, LitStr, Token, Type,
};

/// Derive `Constructible` for a struct with named fields or a unit struct.
///
/// # Attributes
///
/// - `#[inject(name = "...")]` - parameter name used for `$name` needs and
///   named arguments (defaults to the field name)
/// - `#[inject(default)]` - fall back to `Default::default()`
/// - `#[inject(default = expr)]` - fall back to `expr`
///
/// For `Arc<T>` fields the default produces a `T`.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_inject(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_inject(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let (params, inits) = match fields {
        Fields::Named(named) => {
            let mut params = Vec::new();
            let mut inits = Vec::new();
            for (index, field) in named.named.iter().enumerate() {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let attr = InjectAttr::parse(&field.attrs)?;
                let param_name = attr
                    .name
                    .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
                let (param, extract) =
                    field_parameter(&field.ty, &param_name, attr.default.as_ref(), index);
                params.push(param);
                inits.push(quote! { #ident: #extract });
            }
            (params, quote! { Self { #(#inits),* } })
        }
        Fields::Unit => (Vec::new(), quote! { Self }),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs with named fields or unit structs",
            ));
        }
    };

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::service_container::Constructible for #name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::service_container::Constructor> {
                ::std::vec![::service_container::Constructor::new(
                    ::std::vec![#(#params),*],
                    |__args: ::service_container::Arguments| {
                        let _ = &__args;
                        ::std::result::Result::Ok(#inits)
                    },
                )]
            }
        }
    })
}

/// Parameter declaration and value extraction for one field
fn field_parameter(
    ty: &Type,
    name: &LitStr,
    default: Option<&DefaultValue>,
    index: usize,
) -> (TokenStream2, TokenStream2) {
    if let Some(inner) = extract_option_arc_inner_type(ty) {
        return (
            quote! { ::service_container::Parameter::optional_service::<#inner>(#name) },
            quote! { __args.optional::<#inner>(#index)? },
        );
    }

    if let Some(inner) = extract_arc_inner_type(ty) {
        let param = quote! { ::service_container::Parameter::service::<#inner>(#name) };
        return (
            with_default(param, inner, default),
            quote! { __args.service::<#inner>(#index)? },
        );
    }

    let param = if is_primitive(ty) {
        quote! { ::service_container::Parameter::parsed::<#ty>(#name) }
    } else {
        quote! { ::service_container::Parameter::value::<#ty>(#name) }
    };
    (
        with_default(param, ty, default),
        quote! { __args.value::<#ty>(#index)? },
    )
}

fn with_default(param: TokenStream2, ty: &Type, default: Option<&DefaultValue>) -> TokenStream2 {
    match default {
        None => param,
        Some(DefaultValue::Trait) => quote! {
            #param.with_default(|| <#ty as ::std::default::Default>::default())
        },
        Some(DefaultValue::Expr(expr)) => quote! {
            #param.with_default(|| -> #ty { #expr })
        },
    }
}

enum DefaultValue {
    Trait,
    Expr(Expr),
}

#[derive(Default)]
struct InjectAttr {
    name: Option<LitStr>,
    default: Option<DefaultValue>,
}

impl InjectAttr {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("inject")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("default") {
                    parsed.default = if meta.input.peek(Token![=]) {
                        Some(DefaultValue::Expr(meta.value()?.parse()?))
                    } else {
                        Some(DefaultValue::Trait)
                    };
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`, `default` or `default = ...`"))
                }
            })?;
        }
        Ok(parsed)
    }
}

const PRIMITIVES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64", "bool", "char", "String",
];

fn is_primitive(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    type_path.qself.is_none()
        && type_path.path.segments.last().is_some_and(|segment| {
            segment.arguments.is_none() && PRIMITIVES.iter().any(|p| segment.ident == p)
        })
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument_of(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument_of(ty, "Option").and_then(extract_arc_inner_type)
}

fn generic_argument_of<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(src: &str) -> Type {
        syn::parse_str(src).unwrap()
    }

    #[test]
    fn test_type_classification() {
        assert!(extract_arc_inner_type(&ty("Arc<Db>")).is_some());
        assert!(extract_arc_inner_type(&ty("std::sync::Arc<Db>")).is_some());
        assert!(extract_arc_inner_type(&ty("Box<Db>")).is_none());
        assert!(extract_option_arc_inner_type(&ty("Option<Arc<Db>>")).is_some());
        assert!(extract_option_arc_inner_type(&ty("Option<Db>")).is_none());

        assert!(is_primitive(&ty("u32")));
        assert!(is_primitive(&ty("String")));
        assert!(!is_primitive(&ty("Vec<u8>")));
        assert!(!is_primitive(&ty("Config")));
    }

    #[test]
    fn test_attribute_parsing() {
        let input: DeriveInput = syn::parse_quote! {
            struct S {
                #[inject(name = "max", default = 3)]
                a: u32,
                #[inject(default)]
                b: u64,
                c: u8,
            }
        };
        let Data::Struct(data) = &input.data else {
            panic!("struct expected");
        };
        let attrs: Vec<InjectAttr> = data
            .fields
            .iter()
            .map(|f| InjectAttr::parse(&f.attrs).unwrap())
            .collect();

        assert_eq!(attrs[0].name.as_ref().unwrap().value(), "max");
        assert!(matches!(attrs[0].default, Some(DefaultValue::Expr(_))));
        assert!(matches!(attrs[1].default, Some(DefaultValue::Trait)));
        assert!(attrs[2].name.is_none() && attrs[2].default.is_none());
    }

    #[test]
    fn test_unknown_attribute_is_an_error() {
        let field: syn::Field = syn::parse_quote! { #[inject(lazy)] a: u32 };
        assert!(InjectAttr::parse(&field.attrs).is_err());
    }

    #[test]
    fn test_tuple_struct_rejected() {
        let input: DeriveInput = syn::parse_quote! { struct T(u8); };
        assert!(expand_inject(&input).is_err());
    }
}
