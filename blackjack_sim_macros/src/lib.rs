use proc_macro::TokenStream as TokenStream1;
use quote::ToTokens;
use syn::{self, parse_quote};

/// This macro is added before a method of the `Simulator` struct in the impl block.
/// Use this macro to first check if the current round phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(DealInitialCards)]` will make a method first check
/// if current round phase is `DealInitialCards`. If not, the method will return
/// `Err(crate::Error::Gameplay(..))`, so the method must return `crate::Result<_>`
/// and `RoundPhase` must be in scope.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let mut ast: syn::ImplItemFn = match syn::parse(item) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error().into(),
    };
    let phase: syn::Ident = match syn::parse(attr) {
        Ok(phase) => phase,
        Err(err) => return err.to_compile_error().into(),
    };

    let function_name = ast.sig.ident.to_string();
    let err_msg = format!("{} is only allowed in {} phase", function_name, phase);
    let early_return: syn::Stmt = parse_quote! {
        if self.current_round_phase != RoundPhase::#phase {
            return Err(crate::Error::Gameplay(format!(
                "{} (current phase: {:?})",
                #err_msg, self.current_round_phase
            )));
        }
    };
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream().into()
}
