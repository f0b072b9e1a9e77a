//! Return-value elimination.
//!
//! Promela proctypes cannot return a value, so every non-`main` function
//! that returns one gets an out-parameter `<name>_result`: `return e;`
//! becomes `<name>_result = e;` (or forwards into a chained call to
//! another transformed function), and each call site declares a result
//! variable, passes it as the extra argument and reads it back.

use std::collections::BTreeMap;

use log::warn;
use regex::{Captures, Regex};

use crate::Strictness;
use crate::rewrite::match_brace;

struct Func {
    name: String,
    ret_ty: String,
    params: String,
    indent: String,
    start: usize,
    body_start: usize,
    body_end: usize,
}

const KEYWORDS: [&str; 9] = [
    "if", "else", "while", "for", "switch", "do", "return", "struct", "typedef",
];

fn find_functions(code: &str) -> Vec<Func> {
    let header = Regex::new(
        r"(?m)^([ \t]*)((?:unsigned\s+|signed\s+)?[A-Za-z_]\w*(?:\s+\w+)*?)\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*\{",
    )
    .unwrap();
    let mut funcs = Vec::new();
    for cap in header.captures_iter(code) {
        let ret_ty = cap[2].trim().to_owned();
        let name = cap[3].to_owned();
        if KEYWORDS.contains(&name.as_str()) {
            continue;
        }
        let first = ret_ty.split_whitespace().next().unwrap_or("");
        if KEYWORDS.contains(&first) {
            continue;
        }
        let whole = cap.get(0).unwrap();
        let brace = whole.end() - 1;
        let Some(body_end) = match_brace(code, brace) else {
            continue;
        };
        funcs.push(Func {
            name,
            ret_ty,
            params: cap[4].trim().to_owned(),
            indent: cap[1].to_owned(),
            start: whole.start(),
            body_start: brace + 1,
            body_end,
        });
    }
    funcs
}

/// Rewrite `return` statements inside one transformed function body.
fn rewrite_returns(body: &str, name: &str, table: &BTreeMap<String, String>) -> String {
    let ret = Regex::new(r"\breturn\s+([^;]+);").unwrap();
    let call = Regex::new(r"^([A-Za-z_]\w*)\s*\((.*)\)$").unwrap();
    ret.replace_all(body, |cap: &Captures| {
        let expr = cap[1].trim();
        if expr.is_empty() {
            return cap[0].to_owned();
        }
        if let Some(inner) = call.captures(expr) {
            let callee = &inner[1];
            let args = inner[2].trim();
            // chain: the inner call writes straight into our out-parameter
            if table.contains_key(callee) && callee != name {
                let forwarded = if args.is_empty() {
                    format!("{name}_result")
                } else {
                    format!("{args}, {name}_result")
                };
                return format!("{callee}({forwarded});");
            }
        }
        format!("{name}_result = {expr};")
    })
    .into_owned()
}

/// Rewrite the call sites of one transformed callee within one body.
fn rewrite_call_sites(body: &str, callee: &str, ret_ty: &str) -> String {
    let assign =
        Regex::new(&format!(r"(?m)^([ \t]*)([\w\[\]\.]+)\s*=\s*{callee}\s*\(([^()]*)\)\s*;"))
            .unwrap();
    let body = assign
        .replace_all(body, |cap: &Captures| {
            let (indent, lhs, args) = (&cap[1], &cap[2], cap[3].trim());
            if args.ends_with("_result") {
                return cap[0].to_owned();
            }
            let full = if args.is_empty() {
                format!("{callee}_result")
            } else {
                format!("{args}, {callee}_result")
            };
            format!(
                "{indent}{ret_ty} {callee}_result;\n{indent}{callee}({full});\n{indent}{lhs} = {callee}_result;"
            )
        })
        .into_owned();
    let bare = Regex::new(&format!(r"(?m)^([ \t]*){callee}\s*\(([^()]*)\)\s*;")).unwrap();
    bare.replace_all(&body, |cap: &Captures| {
        let (indent, args) = (&cap[1], cap[2].trim());
        if args.ends_with("_result") {
            return cap[0].to_owned();
        }
        let full = if args.is_empty() {
            format!("{callee}_result")
        } else {
            format!("{args}, {callee}_result")
        };
        format!("{indent}{ret_ty} {callee}_result;\n{indent}{callee}({full});")
    })
    .into_owned()
}

pub(crate) fn eliminate(source: &str, strictness: Strictness) -> String {
    let funcs = find_functions(source);
    let has_value_return = Regex::new(r"\breturn\s+[^;\s][^;]*;").unwrap();
    let table: BTreeMap<String, String> = funcs
        .iter()
        .filter(|f| {
            f.name != "main"
                && f.ret_ty != "void"
                && has_value_return.is_match(&source[f.body_start..f.body_end])
        })
        .map(|f| (f.name.clone(), f.ret_ty.clone()))
        .collect();
    if table.is_empty() {
        return source.to_owned();
    }

    // definitions first
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for f in &funcs {
        if !table.contains_key(&f.name) {
            continue;
        }
        out.push_str(&source[cursor..f.start]);
        let params = if f.params.is_empty() || f.params == "void" {
            format!("{} {}_result", f.ret_ty, f.name)
        } else {
            format!("{}, {} {}_result", f.params, f.ret_ty, f.name)
        };
        out.push_str(&format!("{}{} {}({params}) {{", f.indent, f.ret_ty, f.name));
        out.push_str(&rewrite_returns(
            &source[f.body_start..f.body_end],
            &f.name,
            &table,
        ));
        out.push('}');
        cursor = f.body_end + 1;
    }
    out.push_str(&source[cursor..]);

    // then call sites, per enclosing function so a function never
    // rewrites calls to itself
    let source = out;
    let funcs = find_functions(&source);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for f in &funcs {
        out.push_str(&source[cursor..f.body_start]);
        let mut body = source[f.body_start..f.body_end].to_owned();
        for (callee, ret_ty) in &table {
            if *callee == f.name {
                continue;
            }
            body = rewrite_call_sites(&body, callee, ret_ty);
        }
        out.push_str(&body);
        cursor = f.body_end;
    }
    out.push_str(&source[cursor..]);

    if strictness == Strictness::Warn {
        for callee in table.keys() {
            let inline = Regex::new(&format!(r"=\s*[^;\n=]*[-+*/%]\s*{callee}\s*\(")).unwrap();
            if inline.is_match(&out) {
                warn!(
                    target: "rewrite",
                    "call to '{callee}' inside a larger expression was left unrewritten"
                );
            }
        }
    }
    out
}
