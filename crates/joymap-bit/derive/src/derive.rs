use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

pub fn handle_derive_bit(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    // Collect variant idents in declared order
    let variants: Vec<syn::Ident> = match input.data {
        Data::Enum(e) => e
            .variants
            .into_iter()
            .map(|v| match v.fields {
                Fields::Unit => v.ident,
                _ => panic!("Bit supports only fieldless enum variants"),
            })
            .collect(),
        _ => panic!("Bit can be derived only for enums"),
    };
    if variants.len() > 64 {
        panic!("Bit supports at most 64 variants");
    }

    // Assign positions implicitly by declaration index
    let bit_arms = variants.iter().enumerate().map(|(i, v)| {
        let idx = i as u64;
        quote! { #name::#v => 1u64 << #idx }
    });
    let index_arms = variants.iter().enumerate().map(|(i, v)| {
        let idx = i as u32;
        quote! { #idx => ::core::option::Option::Some(#name::#v) }
    });

    let expanded = quote! {
        impl ::joymap_bit_mask::Bitable for #name {
            #[inline]
            fn bit(&self) -> u64 {
                match self { #( #bit_arms, )* }
            }

            #[inline]
            fn index(&self) -> u32 { self.bit().trailing_zeros() }

            #[inline]
            fn from_index(index: u32) -> ::core::option::Option<Self> {
                match index {
                    #( #index_arms, )*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
