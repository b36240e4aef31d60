use proc_macro::{Literal, TokenStream, TokenTree};

/// Turns an identifier into an upper-case string literal. Used to spell
/// mnemonics (`Psh` -> `"PSH"`) from enum variant names.
///
/// # Example
/// ```
/// # use mac_base_proc_upper::upper;
/// assert_eq!(upper!(Ifn), "IFN");
/// ```
#[proc_macro]
pub fn upper(stream: TokenStream) -> TokenStream {
    let s = stream.to_string().trim().to_uppercase();

    TokenTree::Literal(Literal::string(&s)).into()
}
