//! Attribute macros that cut the boilerplate of declaring volley metric and
//! aggregate types.
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

extern crate proc_macro;

/// Derives the traits every `volley::Metric` needs and implements the marker trait.
#[proc_macro_attribute]
pub fn metric(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let input_struct = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let expanded = quote! {
        #[derive(
            ::serde::Serialize,
            ::serde::Deserialize,
            ::std::cmp::PartialOrd,
            ::std::cmp::PartialEq,
            ::std::fmt::Debug,
            ::std::clone::Clone
        )]
        #ast

        impl #impl_generics ::volley::Metric for #input_struct #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Derives the traits required by `volley::Aggregate`. The `Aggregate` impl itself
/// stays hand-written since `consume` and `merge` are type specific.
#[proc_macro_attribute]
pub fn aggregate(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let expanded = quote! {
        #[derive(
            ::serde::Serialize,
            ::serde::Deserialize,
            ::std::cmp::PartialOrd,
            ::std::cmp::PartialEq,
            ::std::fmt::Debug,
            ::std::clone::Clone
        )]
        #ast
    };

    TokenStream::from(expanded)
}
