use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields, Type, parse_macro_input};

#[proc_macro_derive(FormModel)]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// One struct field seen as a group child: its key, its value type and the lens naming it.
struct ChildSpec {
    ident: Ident,
    key: String,
    ty: Type,
    lens: Ident,
}

impl ChildSpec {
    fn lens_def(&self, krate: &TokenStream2) -> TokenStream2 {
        let Self { key, ty, lens, .. } = self;
        quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens;

            impl #krate::form::FieldLens for #lens {
                type Control = #krate::form::FormField<#ty>;

                fn key(self) -> #krate::form::FieldKey {
                    #krate::form::FieldKey::new(#key)
                }
            }
        }
    }

    fn accessor(&self) -> TokenStream2 {
        let Self { ident, lens, .. } = self;
        quote! {
            pub const fn #ident(&self) -> #lens {
                #lens
            }
        }
    }

    fn group_entry(&self, krate: &TokenStream2) -> TokenStream2 {
        let Self { ident, key, ty, .. } = self;
        quote! {
            .field(
                #key,
                #krate::form::FormField::<#ty>::new(::core::clone::Clone::clone(&self.#ident)),
            )
        }
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "FormModel cannot be derived for generic structs",
        ));
    }

    let model = &input.ident;
    let fields_struct = format_ident!("{model}Fields");
    let children = named_fields(&input)?
        .iter()
        .filter_map(|field| {
            let ident = field.ident.clone()?;
            let key = ident.to_string();
            Some(ChildSpec {
                lens: format_ident!("{model}{}Lens", lens_suffix(&key)),
                ident,
                key,
                ty: field.ty.clone(),
            })
        })
        .collect::<Vec<_>>();

    let krate = crate_path();
    let lens_defs = children.iter().map(|child| child.lens_def(&krate));
    let accessors = children.iter().map(ChildSpec::accessor);
    let group_entries = children.iter().map(|child| child.group_entry(&krate));

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct;

        impl #fields_struct {
            #(#accessors)*
        }

        impl #krate::form::FormModel for #model {
            type Fields = #fields_struct;

            fn fields() -> Self::Fields {
                #fields_struct
            }

            fn form_group(&self) -> #krate::form::FieldGroup {
                #krate::form::FieldGroup::builder()
                    #(#group_entries)*
                    .build()
            }
        }

        #(#lens_defs)*
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            other => Err(syn::Error::new_spanned(
                other,
                "FormModel needs named fields; each one becomes a group key",
            )),
        },
        Data::Enum(data) => Err(syn::Error::new(
            data.enum_token.span,
            "FormModel cannot be derived for enums",
        )),
        Data::Union(data) => Err(syn::Error::new(
            data.union_token.span,
            "FormModel cannot be derived for unions",
        )),
    }
}

// `nick_name` -> `NickName`
fn lens_suffix(key: &str) -> String {
    key.split('_')
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase())
                .into_iter()
                .chain(chars)
        })
        .collect()
}

fn crate_path() -> TokenStream2 {
    let found = crate_name("reactive-form").unwrap_or(FoundCrate::Name("reactive_form".into()));
    match found {
        FoundCrate::Itself => quote!(crate),
        FoundCrate::Name(name) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
    }
}
