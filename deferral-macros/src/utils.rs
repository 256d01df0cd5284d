use proc_macro::{TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`. Only top-level commas
/// separate arguments; commas inside groups belong to a single token tree.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens back into source text.
///
/// Consecutive identifiers and literals are separated by a space so they
/// are not merged (`x as u8`, `5 as u32`).
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_word = false;

    for t in tokens {
        let is_word = matches!(t, TokenTree::Ident(_) | TokenTree::Literal(_));

        if prev_was_word && is_word {
            out.push(' ');
        }

        out.push_str(&t.to_string());
        prev_was_word = is_word;
    }

    out
}

/// A `compile_error!` invocation carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});").parse().unwrap()
}
