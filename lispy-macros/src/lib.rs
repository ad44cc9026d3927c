//! Procedural macros for LisPy builtin functions
//!
//! Provides the `#[builtin]` attribute macro that turns a plain Rust function
//! into a registered LisPy builtin. The macro generates a `register_<fn>`
//! function that binds the builtin into an environment under its Lisp name,
//! so category modules only have to call the registrars.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Parse builtin attribute arguments: name = "..."
fn parse_builtin_name(attr_stream: TokenStream) -> String {
    let attr_str = attr_stream.to_string();

    if let Some(start) = attr_str.find("name = \"") {
        let rest = &attr_str[start + 8..];
        if let Some(end) = rest.find('"') {
            return rest[..end].to_string();
        }
    }

    String::new()
}

/// Attribute macro for defining LisPy builtin functions
///
/// The annotated function must have the uniform builtin signature
/// `fn(&[Value], &Arc<Environment>) -> Result<Value>`. The macro emits the
/// function unchanged plus a registration function that defines it in an
/// environment under the given Lisp name.
///
/// # Attribute Arguments
///
/// - `name`: The Lisp name for this builtin (e.g., "+", "promise-all").
///   Falls back to the Rust function name when omitted.
///
/// # Example
///
/// ```ignore
/// #[builtin(name = "+")]
/// /// Returns the sum of all arguments.
/// pub fn add(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn builtin(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);

    let lisp_name = parse_builtin_name(attr);

    let fn_name = func.sig.ident.clone();
    let name_to_use = if !lisp_name.is_empty() {
        lisp_name
    } else {
        fn_name.to_string()
    };

    let register_fn_name = quote::format_ident!("register_{}", fn_name);

    let expanded = quote! {
        #func

        /// Register this builtin in the environment
        #[allow(dead_code)]
        pub fn #register_fn_name(env: &std::sync::Arc<crate::env::Environment>) {
            env.define(
                #name_to_use,
                crate::value::Value::Builtin(crate::value::Builtin::new(
                    #name_to_use,
                    #fn_name,
                )),
            );
        }
    };

    TokenStream::from(expanded)
}
