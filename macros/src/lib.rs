use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Run an async `main` function on a fresh railmutex runtime
#[proc_macro_attribute]
pub fn main(_args: TokenStream, input: TokenStream) -> TokenStream {
    let func = parse_macro_input!(input as ItemFn);
    expand(func, quote! {}).into()
}

/// Run an async test on a fresh railmutex runtime
///
/// ```ignore
/// #[railmutex::test]
/// async fn sleeps() {
///     railmutex::time::sleep(railmutex::time::Duration::from_seconds(1)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let func = parse_macro_input!(input as ItemFn);
    expand(func, quote! { #[::core::prelude::v1::test] }).into()
}

fn expand(func: ItemFn, extra_attrs: TokenStream2) -> TokenStream2 {
    if func.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&func.sig.fn_token, "the function must be async")
            .to_compile_error();
    }

    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = func;
    sig.asyncness = None;

    quote! {
        #extra_attrs
        #(#attrs)*
        #vis #sig {
            let runtime = ::railmutex::Runtime::new();
            runtime.block_on(async move #block)
        }
    }
}
