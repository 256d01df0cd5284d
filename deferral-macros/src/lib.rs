//! Procedural macros for `deferral`.
//!
//! - `#[deferral::main]` / `#[deferral::test]` run a function body inside a
//!   freshly built scheduler context.
//! - `join!` waits on several already-started task handles.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Waits on every task handle, in argument order, and collects the values.
///
/// All arguments are evaluated first, so operations started inside the
/// argument list run concurrently. Expands to a
/// `deferral::TaskResult<(A, B, ..)>`; the first failure in argument order is
/// returned once every handle has been waited on up to it.
#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);
    let count = args.len();

    if count == 0 {
        return "::core::result::Result::<(), ::deferral::TaskError>::Ok(())"
            .parse()
            .unwrap();
    }

    let mut output = String::from("{\n");

    for (i, expr_tokens) in args.iter().enumerate() {
        let idx = i + 1;
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!("let __h{idx} = {expr};\n"));
    }

    if count == 1 {
        output.push_str("__h1.result()\n}\n");
    } else {
        output.push_str("(|| -> ::deferral::TaskResult<_> {\n");
        output.push_str("    ::core::result::Result::Ok((\n");
        for i in 1..=count {
            output.push_str(&format!("        __h{i}.result()?,\n"));
        }
        output.push_str("    ))\n");
        output.push_str("})()\n");
        output.push_str("}\n");
    }

    output.parse().unwrap_or_else(|err| {
        let msg = format!("join macro error: {err}");
        utils::compile_error(&msg)
    })
}

/// Runs `main` inside a scheduler context.
///
/// Accepts an optional `worker_threads = N` argument.
///
/// ```rust,ignore
/// #[deferral::main(worker_threads = 2)]
/// fn main() {
///     let delay = deferral::time::delay(Duration::from_millis(10));
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    match parse_worker_threads(attr) {
        Ok(worker_threads) => wrap_in_scheduler(item, worker_threads, false),
        Err(err) => err,
    }
}

/// Marks a test whose body runs inside a scheduler context.
///
/// Accepts the same `worker_threads = N` argument as `main`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    match parse_worker_threads(attr) {
        Ok(worker_threads) => wrap_in_scheduler(item, worker_threads, true),
        Err(err) => err,
    }
}

fn parse_worker_threads(attr: TokenStream) -> Result<Option<usize>, TokenStream> {
    let attr_str = attr.to_string();
    let mut worker_threads = None;

    for part in attr_str.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some(v) = part.strip_prefix("worker_threads") else {
            return Err(utils::compile_error(&format!("unknown argument: `{part}`")));
        };

        let v = v.trim_start_matches(|c: char| c == '=' || c.is_whitespace());
        match v.parse::<usize>() {
            Ok(0) => return Err(utils::compile_error("worker_threads must be > 0")),
            Ok(n) => worker_threads = Some(n),
            Err(_) => {
                return Err(utils::compile_error(&format!(
                    "invalid worker_threads value: `{v}`"
                )));
            }
        }
    }

    Ok(worker_threads)
}

fn wrap_in_scheduler(item: TokenStream, worker_threads: Option<usize>, is_test: bool) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    if tokens
        .iter()
        .any(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        return utils::compile_error(
            "deferral entry points are synchronous; remove `async` and drive tasks with state machines",
        );
    }

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return utils::compile_error("expected a function body");
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let mut builder = String::from("::deferral::SchedulerBuilder::new()");
    if let Some(n) = worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }
    builder.push_str(".build()");

    let new_block = format!(
        "{{
            let __scheduler = {builder};
            __scheduler.enter(move || {{
                {block}
            }})
        }}"
    );

    let body = match new_block.parse() {
        Ok(body) => body,
        Err(err) => return utils::compile_error(&format!("failed to wrap body: {err}")),
    };
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, body));

    let mut result: Vec<TokenTree> = Vec::new();
    if is_test {
        result.extend("#[test]".parse::<TokenStream>().unwrap());
    }
    result.extend(tokens);

    result.into_iter().collect()
}
