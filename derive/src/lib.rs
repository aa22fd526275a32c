use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_demo;

#[proc_macro_derive(FromDemo, attributes(header, frame, message))]
pub fn derive_from_demo(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_demo::expand_from_demo(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
