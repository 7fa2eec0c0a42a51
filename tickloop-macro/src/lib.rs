use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, FnArg, ItemFn, Lit, Meta, MetaNameValue, ReturnType, Token};

/// Registers a function as a named event handler
///
/// The function takes the event payload and is collected into the global
/// handler slice at link time, so `HandlerMap::linked()` (or
/// `EventLoopBuilder::register_linked()`) can resolve it by name.
///
/// # Examples
///
/// ```rust,ignore
/// use tickloop::{event_handler, HandlerResult, Payload};
///
/// // Registered as "greet"; runs on the blocking pool
/// #[event_handler]
/// fn greet(payload: Payload) -> HandlerResult {
///     println!("Hello, {:?}", payload.downcast_ref::<String>());
///     Ok(())
/// }
///
/// // Registered as "audit.write"; runs as an async task
/// #[event_handler(name = "audit.write")]
/// async fn write_audit(payload: Payload) {
///     let _ = payload;
/// }
/// ```
///
/// # Parameters
///
/// - `name`: name the handler is registered under (defaults to the function name)
///
/// The function may return nothing or a `HandlerResult`.
#[proc_macro_attribute]
pub fn event_handler(args: TokenStream, input: TokenStream) -> TokenStream {
    let attr_args = syn::parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = syn::parse_macro_input!(input as ItemFn);

    match expand_event_handler(&attr_args, &input_fn) {
        Ok(expanded) => expanded.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_event_handler(
    attr_args: &Punctuated<Meta, Token![,]>,
    input_fn: &ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let fn_name = &input_fn.sig.ident;
    let handler_name = parse_handler_name(attr_args)?.unwrap_or_else(|| fn_name.to_string());

    if input_fn.sig.inputs.len() != 1 || matches!(input_fn.sig.inputs.first(), Some(FnArg::Receiver(_))) {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "event_handler functions take exactly one argument: the event payload",
        ));
    }

    let returns_result = !matches!(input_fn.sig.output, ReturnType::Default);
    let is_async = input_fn.sig.asyncness.is_some();

    let handler = match (is_async, returns_result) {
        (false, true) => quote! {
            ::tickloop::tickloop_runtime::Handler::blocking(#fn_name)
        },
        (false, false) => quote! {
            ::tickloop::tickloop_runtime::Handler::blocking(|payload| {
                #fn_name(payload);
                Ok(())
            })
        },
        (true, true) => quote! {
            ::tickloop::tickloop_runtime::Handler::from_async(#fn_name)
        },
        (true, false) => quote! {
            ::tickloop::tickloop_runtime::Handler::from_async(|payload| async move {
                #fn_name(payload).await;
                Ok::<(), ::tickloop::tickloop_runtime::HandlerError>(())
            })
        },
    };

    // Generate unique registration function name
    let register_fn_name = syn::Ident::new(
        &format!("__register_event_handler_{}", fn_name),
        fn_name.span(),
    );

    Ok(quote! {
        #input_fn

        // Auto-registration using linkme
        #[::tickloop::tickloop_runtime::linkme::distributed_slice(::tickloop::tickloop_runtime::EVENT_HANDLERS)]
        #[linkme(crate = ::tickloop::tickloop_runtime::linkme)]
        fn #register_fn_name() -> ::tickloop::tickloop_runtime::RegisteredHandler {
            ::tickloop::tickloop_runtime::RegisteredHandler::new(#handler_name, #handler)
        }
    })
}

fn parse_handler_name(attr_args: &Punctuated<Meta, Token![,]>) -> syn::Result<Option<String>> {
    let mut name = None;

    for arg in attr_args {
        match arg {
            Meta::NameValue(MetaNameValue { path, value, .. }) if path.is_ident("name") => {
                match value {
                    Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) if !s.value().is_empty() => {
                        name = Some(s.value());
                    }
                    _ => {
                        return Err(syn::Error::new_spanned(
                            value,
                            "name must be a non-empty string literal",
                        ))
                    }
                }
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unknown event_handler argument, expected `name = \"...\"`",
                ))
            }
        }
    }

    Ok(name)
}
