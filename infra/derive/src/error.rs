use fxhash::FxHashSet;
use proc_macro2::{Group, TokenStream, TokenTree};
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Ident, Meta, PathArguments,
    PathSegment, Type, Variant,
};

/// Name of the helper available inside `#[error(..)]` strings.
const HELPER: &str = "format_context";

/// Parsed view of one enum variant.
struct ErrorVariant {
    ident: Ident,
    /// Field name and type of the wrapped error, if any.
    source: Option<(Ident, Type)>,
    has_context: bool,
    cfg: Vec<Attribute>,
}

struct ErrorEnum {
    input: DeriveInput,
    variants: Vec<ErrorVariant>,
}

pub fn expand(input: DeriveInput) -> TokenStream {
    match ErrorEnum::parse(input) {
        Ok(model) => model.render(),
        Err(err) => err.to_compile_error(),
    }
}

impl ErrorVariant {
    fn parse(variant: &Variant) -> syn::Result<Self> {
        let Fields::Named(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "linkfix_error variants must use named fields",
            ));
        };

        let mut has_context = false;
        for field in &fields.named {
            if field.ident.as_ref().is_some_and(|ident| ident == "context") {
                if !is_context_type(&field.ty) {
                    return Err(syn::Error::new_spanned(
                        &field.ty,
                        "context field must be Option<Cow<'static, str>>",
                    ));
                }
                has_context = true;
            }
        }

        let source = fields
            .named
            .iter()
            .find(|field| is_source(field))
            .and_then(|field| field.ident.clone().map(|ident| (ident, field.ty.clone())));

        Ok(Self {
            ident: variant.ident.clone(),
            source,
            has_context,
            cfg: variant.attrs.iter().filter(|attr| attr.path().is_ident("cfg")).cloned().collect(),
        })
    }

    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

impl ErrorEnum {
    fn parse(mut input: DeriveInput) -> syn::Result<Self> {
        if let Data::Enum(data) = &mut input.data {
            for variant in &mut data.variants {
                qualify_error_attrs(&mut variant.attrs);
            }
        }

        let Data::Enum(data) = &input.data else {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "linkfix_error can only be applied to enums",
            ));
        };

        let variants =
            data.variants.iter().map(ErrorVariant::parse).collect::<syn::Result<Vec<_>>>()?;
        check_sources(&variants)?;

        Ok(Self { input, variants })
    }

    fn render(&self) -> TokenStream {
        let input = &self.input;
        let name = &input.ident;
        let vis = &input.vis;
        let ext = format_ident!("{}Ext", name);

        let derives = self.missing_derives();
        let context_arms = self.variants.iter().filter(|v| v.has_context).map(|v| {
            let ErrorVariant { ident, cfg, .. } = v;
            quote! { #(#cfg)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
        });
        let source_impls = self.variants.iter().filter_map(|v| self.render_source(&ext, v));
        let internal_impls = self.render_internal();

        quote! {
            #[allow(non_shorthand_field_patterns)]
            #derives
            #input

            #vis trait #ext<T> {
                fn context(
                    self,
                    context: impl Into<::std::borrow::Cow<'static, str>>,
                ) -> ::core::result::Result<T, #name>;
            }

            #[automatically_derived]
            impl<T> #ext<T> for ::core::result::Result<T, #name> {
                #[inline]
                fn context(self, context: impl Into<::std::borrow::Cow<'static, str>>) -> Self {
                    self.map_err(|mut err| {
                        #[allow(unreachable_patterns)]
                        match &mut err {
                            #(#context_arms)*
                            _ => {},
                        }
                        err
                    })
                }
            }

            #(#source_impls)*
            #internal_impls

            impl #name {
                #[doc(hidden)]
                #[allow(dead_code)]
                fn format_context(
                    context: &::core::option::Option<::std::borrow::Cow<'static, str>>,
                ) -> ::std::borrow::Cow<'static, str> {
                    context.as_ref().map_or(::std::borrow::Cow::Borrowed(""), |c| {
                        ::std::borrow::Cow::Owned(format!(" ({c})"))
                    })
                }
            }
        }
    }

    fn render_source(&self, ext: &Ident, variant: &ErrorVariant) -> Option<TokenStream> {
        if variant.is_internal() {
            return None;
        }
        let (field, ty) = variant.source.as_ref()?;
        let name = &self.input.ident;
        let ident = &variant.ident;
        let cfg = &variant.cfg;

        Some(quote! {
            #(#cfg)*
            #[automatically_derived]
            impl ::core::convert::From<#ty> for #name {
                #[inline]
                fn from(#field: #ty) -> Self {
                    Self::#ident { #field, context: None }
                }
            }

            #(#cfg)*
            #[automatically_derived]
            impl<T> #ext<T> for ::core::result::Result<T, #ty> {
                #[inline]
                fn context(
                    self,
                    context: impl Into<::std::borrow::Cow<'static, str>>,
                ) -> ::core::result::Result<T, #name> {
                    self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
                }
            }
        })
    }

    fn render_internal(&self) -> TokenStream {
        let Some(internal) = self.variants.iter().find(|v| v.is_internal()) else {
            return TokenStream::new();
        };
        let name = &self.input.ident;
        let cfg = &internal.cfg;

        quote! {
            #(#cfg)*
            impl ::core::convert::From<&'static str> for #name {
                #[inline]
                fn from(message: &'static str) -> Self {
                    Self::Internal { message: ::std::borrow::Cow::Borrowed(message), context: None }
                }
            }

            #(#cfg)*
            impl ::core::convert::From<String> for #name {
                #[inline]
                fn from(message: String) -> Self {
                    Self::Internal { message: ::std::borrow::Cow::Owned(message), context: None }
                }
            }
        }
    }

    fn missing_derives(&self) -> TokenStream {
        let mut present = FxHashSet::default();
        for attr in self.input.attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
            let _ = attr.parse_nested_meta(|meta| {
                if let Some(segment) = meta.path.segments.last() {
                    present.insert(segment.ident.to_string());
                }
                Ok(())
            });
        }

        let mut missing = Vec::new();
        if !present.contains("Debug") {
            missing.push(quote! { Debug });
        }
        if !present.contains("Error") {
            missing.push(quote! { ::thiserror::Error });
        }

        if missing.is_empty() { TokenStream::new() } else { quote! { #[derive(#(#missing),*)] } }
    }
}

/// Rewrites bare `format_context(..)` calls in `#[error(..)]` to `Self::format_context(..)`,
/// so several error enums can share a module.
fn qualify_error_attrs(attrs: &mut [Attribute]) {
    for attr in attrs.iter_mut().filter(|attr| attr.path().is_ident("error")) {
        if let Meta::List(list) = &mut attr.meta {
            list.tokens = qualify_helper(std::mem::take(&mut list.tokens));
        }
    }
}

fn qualify_helper(tokens: TokenStream) -> TokenStream {
    let mut out = TokenStream::new();
    let mut after_punct = false;

    for tree in tokens {
        match tree {
            TokenTree::Group(group) => {
                let mut rewritten = Group::new(group.delimiter(), qualify_helper(group.stream()));
                rewritten.set_span(group.span());
                out.extend([TokenTree::Group(rewritten)]);
                after_punct = false;
            },
            TokenTree::Ident(ident) if ident == HELPER && !after_punct => {
                out.extend(quote! { Self:: });
                out.extend([TokenTree::Ident(ident)]);
                after_punct = false;
            },
            TokenTree::Punct(punct) => {
                after_punct = matches!(punct.as_char(), ':' | '.');
                out.extend([TokenTree::Punct(punct)]);
            },
            other => {
                out.extend([other]);
                after_punct = false;
            },
        }
    }

    out
}

fn check_sources(variants: &[ErrorVariant]) -> syn::Result<()> {
    let mut seen = FxHashSet::default();

    for variant in variants {
        let Some((_, ty)) = &variant.source else { continue };

        if !variant.has_context {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "variants with a source need `context: Option<Cow<'static, str>>`",
            ));
        }
        if !variant.is_internal() && !seen.insert(quote!(#ty).to_string()) {
            return Err(syn::Error::new_spanned(
                ty,
                "this source type is already wrapped by another variant",
            ));
        }
    }

    Ok(())
}

fn is_source(field: &Field) -> bool {
    field.ident.as_ref().is_some_and(|ident| ident == "source")
        || field.attrs.iter().any(|attr| attr.path().is_ident("source") || attr.path().is_ident("from"))
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(path) => path.path.segments.last(),
        _ => None,
    }
}

fn is_context_type(ty: &Type) -> bool {
    let Some(option) = last_segment(ty).filter(|seg| seg.ident == "Option") else {
        return false;
    };
    let PathArguments::AngleBracketed(args) = &option.arguments else {
        return false;
    };
    let Some(GenericArgument::Type(inner)) = args.args.first() else {
        return false;
    };
    let Some(cow) = last_segment(inner).filter(|seg| seg.ident == "Cow") else {
        return false;
    };
    let PathArguments::AngleBracketed(cow_args) = &cow.arguments else {
        return false;
    };

    let mut args = cow_args.args.iter();
    let static_lifetime =
        matches!(args.next(), Some(GenericArgument::Lifetime(lt)) if lt.ident == "static");
    let str_type = matches!(
        args.next(),
        Some(GenericArgument::Type(ty)) if last_segment(ty).is_some_and(|seg| seg.ident == "str")
    );

    static_lifetime && str_type
}
