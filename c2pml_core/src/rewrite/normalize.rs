//! Textual normalization: directives, comments, glued type keywords,
//! `for`-header declarations and blank-line runs.

use regex::Regex;

pub(crate) fn normalize(source: &str) -> String {
    let text = strip_directives(source);
    let text = strip_comments(&text);
    let text = split_glued_types(&text);
    let text = extract_for_inits(&text);
    collapse_blank_lines(&text)
}

/// Drop every preprocessor line (`#include`, `#define`, conditionals,
/// pragmas). The entry-point wrapper re-emits the two defines the
/// generated model needs.
fn strip_directives(source: &str) -> String {
    Regex::new(r"(?m)^[ \t]*#[^\n]*\n?")
        .unwrap()
        .replace_all(source, "")
        .into_owned()
}

fn strip_comments(source: &str) -> String {
    let text = Regex::new(r"/\*[\s\S]*?\*/")
        .unwrap()
        .replace_all(source, "");
    Regex::new(r"//[^\n]*")
        .unwrap()
        .replace_all(&text, "")
        .into_owned()
}

/// Re-insert the space between a base-type keyword and an identifier that
/// got glued to it (`intx` → `int x`). Purely lexical: an identifier that
/// merely starts with a type keyword is split too.
fn split_glued_types(source: &str) -> String {
    Regex::new(
        r"(^|\s)((?:unsigned\s+|signed\s+)?(?:long\s+long\s+|long\s+|short\s+)?(?:int|char|float|double|void))([A-Za-z_])",
    )
    .unwrap()
    .replace_all(source, "${1}${2} ${3}")
    .into_owned()
}

/// Hoist a declaration out of a `for` header:
/// `for (int i = 0; c; u)` → `int i;` + `for (i = 0; c; u)`.
fn extract_for_inits(source: &str) -> String {
    Regex::new(
        r"(?i)\bfor\s*\(\s*((?:unsigned\s+|signed\s+)?(?:int|char|long|short|float|double|byte|bool))\s+([A-Za-z_]\w*)\s*=\s*([^;]+);",
    )
    .unwrap()
    .replace_all(source, "${1} ${2};\nfor (${2} = ${3};")
    .into_owned()
}

fn collapse_blank_lines(source: &str) -> String {
    Regex::new(r"\n(?:[ \t]*\n)+")
        .unwrap()
        .replace_all(source, "\n")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_stripped() {
        let out = normalize("#include <stdio.h>\n#define N 4\nint x;\n");
        assert_eq!(out, "int x;");
    }

    #[test]
    fn comments_are_stripped() {
        let out = normalize("int x; // counter\n/* block\ncomment */ int y;\n");
        assert_eq!(out, "int x; \n int y;");
    }

    #[test]
    fn glued_type_is_split() {
        assert_eq!(normalize("intx;"), "int x;");
        assert_eq!(normalize("unsigned intx;"), "unsigned int x;");
        // already separated input is untouched
        assert_eq!(normalize("int x;"), "int x;");
    }

    #[test]
    fn for_init_declaration_is_hoisted() {
        let out = normalize("for (int i = 0; i < 4; i++) { }");
        assert_eq!(out, "int i;\nfor (i = 0; i < 4; i++) { }");
    }

    #[test]
    fn blank_runs_collapse() {
        let out = normalize("int x;\n\n\n\nint y;");
        assert_eq!(out, "int x;\nint y;");
    }
}
