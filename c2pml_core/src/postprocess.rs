//! Entry-point wrapping: the translated `main` unit becomes the Promela
//! `init` block, and the two model-size defines are prepended.

use regex::Regex;

use crate::rewrite::match_brace;

const DEFINES: &str = "#define MAX_NODES 100\n#define MAX_STRING_LENGTH 100\n\n";

pub(crate) fn wrap_entry_point(translated: &str) -> String {
    let main_re = Regex::new(r"(?:proctype\s+)?\bmain\s*\(([^)]*)\)\s*\{").unwrap();
    let Some(cap) = main_re.captures(translated) else {
        return format!("{DEFINES}{translated}");
    };
    let whole = cap.get(0).unwrap();
    let brace = whole.end() - 1;
    let Some(close) = match_brace(translated, brace) else {
        return format!("{DEFINES}{translated}");
    };

    // init takes no parameters; main's become ordinary declarations
    let params = params_to_decls(&cap[1]);
    let body = &translated[brace + 1..close];
    let body = Regex::new(r"(?m)^[ \t]*return\b[^;]*;[ \t]*\n?")
        .unwrap()
        .replace_all(body, "");
    let body = body.trim_matches('\n');

    let mut init = String::from("init {\n");
    init.push_str(&params);
    if body.is_empty() && params.is_empty() {
        init.push_str("  skip;");
    } else {
        init.push_str(body);
    }
    init.push_str("\n}");
    format!(
        "{DEFINES}{}{}{}",
        &translated[..whole.start()],
        init,
        &translated[close + 1..]
    )
}

fn params_to_decls(params: &str) -> String {
    let sep = if params.contains(';') { ';' } else { ',' };
    params
        .split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "void")
        .map(|p| format!("  {p};\n"))
        .collect()
}
