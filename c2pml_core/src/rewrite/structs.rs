//! Heap and struct-pointer elimination.
//!
//! Promela has no pointers and no heap, so every struct gets a global
//! backing array `<name>_mem[MAX_NODES]` with a parallel occupancy array
//! `<name>_used`, pointers become integer indices into the backing array,
//! and `malloc`/`free` become calls to emitted `allocate_<name>` /
//! `free_<name>` helper functions. The helpers are emitted as C so the
//! later passes and the parser treat them like user code.
//!
//! Pointer typing is a text-search heuristic over declarations, allocation
//! sites and assignments; an access whose struct type cannot be inferred
//! is left in place (and reported under [`Strictness::Warn`]).

use log::warn;
use regex::{Captures, Regex};

use crate::Strictness;

/// Struct names declared in `code`, in order of appearance.
fn struct_names(code: &str) -> Vec<String> {
    let mut names = Vec::new();
    for cap in Regex::new(r"struct\s+(\w+)\s*\{")
        .unwrap()
        .captures_iter(code)
    {
        let name = cap[1].to_owned();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    for cap in Regex::new(r"typedef\s+struct\s*\{[^}]*\}\s*(\w+)\s*;")
        .unwrap()
        .captures_iter(code)
    {
        let name = cap[1].to_owned();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn is_struct(name: &str, structs: &[String]) -> bool {
    structs.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Infer the struct type a pointer variable indexes into, by searching the
/// original text for a declaration, an allocation or a telling assignment.
/// `deep` permits one level of chasing through `v = w->field;`.
fn struct_type_of(var: &str, code: &str, structs: &[String], deep: bool) -> Option<String> {
    let decl = Regex::new(&format!(r"struct\s+(\w+)\s*\*+\s*{var}\b")).unwrap();
    if let Some(cap) = decl.captures(code) {
        if is_struct(&cap[1], structs) {
            return Some(cap[1].to_lowercase());
        }
    }
    for name in structs {
        let typed = Regex::new(&format!(r"\b{name}\s*\*+\s*{var}\b")).unwrap();
        if typed.is_match(code) {
            return Some(name.to_lowercase());
        }
    }
    let alloc = Regex::new(&format!(r"\b{var}\s*=\s*allocate_(\w+)\s*\(")).unwrap();
    if let Some(cap) = alloc.captures(code) {
        if is_struct(&cap[1], structs) {
            return Some(cap[1].to_lowercase());
        }
    }
    let cast = Regex::new(&format!(r"\b{var}\s*=\s*\(\s*struct\s+(\w+)\s*\*")).unwrap();
    if let Some(cap) = cast.captures(code) {
        if is_struct(&cap[1], structs) {
            return Some(cap[1].to_lowercase());
        }
    }
    let malloc = Regex::new(&format!(
        r"\b{var}\s*=\s*malloc\s*\(\s*sizeof\s*\(\s*(?:struct\s+)?(\w+)"
    ))
    .unwrap();
    if let Some(cap) = malloc.captures(code) {
        if is_struct(&cap[1], structs) {
            return Some(cap[1].to_lowercase());
        }
    }
    if deep {
        // v = w->next; ties v to w's struct for the self-referential
        // linked-structure case
        let chained = Regex::new(&format!(r"\b{var}\s*=\s*([A-Za-z_]\w*)\s*->")).unwrap();
        if let Some(cap) = chained.captures(code) {
            return struct_type_of(&cap[1], code, structs, false);
        }
    }
    None
}

/// First identifier in `expr` with an inferable struct type.
fn infer_from_expr(expr: &str, code: &str, structs: &[String]) -> Option<String> {
    let ident = Regex::new(r"[A-Za-z_]\w*").unwrap();
    ident
        .find_iter(expr)
        .find_map(|m| struct_type_of(m.as_str(), code, structs, true))
}

/// `p->f` to `<t>_mem[p].f`, `NULL` to `-1`, `malloc`/`free` to the
/// allocation helpers, constant pointer indexing to backing-array
/// indexing.
pub(crate) fn pointer_access_to_array(source: &str, strictness: Strictness) -> String {
    let structs = struct_names(source);
    if structs.is_empty() {
        return source.to_owned();
    }
    // inference always searches the pre-rewrite text
    let original = source.to_owned();
    let mut unresolved = 0usize;

    let arrow = Regex::new(r"\b([A-Za-z_]\w*)\s*->\s*([A-Za-z_]\w*)").unwrap();
    let text = arrow
        .replace_all(source, |cap: &Captures| {
            match struct_type_of(&cap[1], &original, &structs, true) {
                Some(ty) => format!("{ty}_mem[{}].{}", &cap[1], &cap[2]),
                None => {
                    unresolved += 1;
                    cap[0].to_owned()
                }
            }
        })
        .into_owned();

    let paren_arrow = Regex::new(r"\(([^()]+)\)\s*->\s*([A-Za-z_]\w*)").unwrap();
    let text = paren_arrow
        .replace_all(&text, |cap: &Captures| {
            match infer_from_expr(&cap[1], &original, &structs) {
                Some(ty) => format!("{ty}_mem[{}].{}", &cap[1], &cap[2]),
                None => {
                    unresolved += 1;
                    cap[0].to_owned()
                }
            }
        })
        .into_owned();

    let text = Regex::new(r"\bNULL\b|\bnull\b")
        .unwrap()
        .replace_all(&text, "-1")
        .into_owned();

    // the argument is either a full sizeof(...) including its own closing
    // paren, or anything paren-free
    let cast_malloc = Regex::new(
        r"([A-Za-z_]\w*)\s*=\s*\(\s*(?:struct\s+)?(\w+)\s*\*+\s*\)\s*malloc\s*\(\s*(?:sizeof\s*\(\s*(?:struct\s+)?\w+\s*\)|[^()]*)\s*\)",
    )
    .unwrap();
    let text = cast_malloc
        .replace_all(&text, |cap: &Captures| {
            if is_struct(&cap[2], &structs) {
                format!("{} = allocate_{}()", &cap[1], cap[2].to_lowercase())
            } else {
                cap[0].to_owned()
            }
        })
        .into_owned();

    let plain_malloc = Regex::new(
        r"([A-Za-z_]\w*)\s*=\s*malloc\s*\(\s*sizeof\s*\(\s*(?:struct\s+)?(\w+)\s*\)\s*\)",
    )
    .unwrap();
    let text = plain_malloc
        .replace_all(&text, |cap: &Captures| {
            if is_struct(&cap[2], &structs) {
                format!("{} = allocate_{}()", &cap[1], cap[2].to_lowercase())
            } else {
                cap[0].to_owned()
            }
        })
        .into_owned();

    let mut unmatched_free = 0usize;
    let free = Regex::new(r"\bfree\s*\(\s*([A-Za-z_]\w*)\s*\)").unwrap();
    let text = free
        .replace_all(&text, |cap: &Captures| {
            match struct_type_of(&cap[1], &original, &structs, true) {
                Some(ty) => format!("free_{ty}({})", &cap[1]),
                None => {
                    unmatched_free += 1;
                    cap[0].to_owned()
                }
            }
        })
        .into_owned();

    let index = Regex::new(r"\b([A-Za-z_]\w*)\s*\[\s*(\d+)\s*\]").unwrap();
    let text = index
        .replace_all(&text, |cap: &Captures| {
            let base = &cap[1];
            if base.ends_with("_mem") || base.ends_with("_used") {
                return cap[0].to_owned();
            }
            match struct_type_of(base, &original, &structs, true) {
                Some(ty) if &cap[2] == "0" => format!("{ty}_mem[{base}]"),
                Some(ty) => format!("{ty}_mem[{base} + {}]", &cap[2]),
                None => cap[0].to_owned(),
            }
        })
        .into_owned();

    if strictness == Strictness::Warn {
        if unresolved > 0 {
            warn!(
                target: "rewrite",
                "{unresolved} pointer accesses left unrewritten (no struct type could be inferred)"
            );
        }
        if unmatched_free > 0 {
            warn!(
                target: "rewrite",
                "{unmatched_free} free() calls left unrewritten (no struct type could be inferred)"
            );
        }
    }
    text
}

struct FieldInfo {
    /// Rewritten declaration text, e.g. `int next`.
    decl: String,
    /// Field name to zero in `allocate_<t>`, for numeric fields.
    zero: Option<String>,
}

fn parse_fields(body: &str) -> Vec<FieldInfo> {
    let ptr = Regex::new(r"^(?:struct\s+)?(\w+)\s*\*+\s*(\w+)$").unwrap();
    let arr = Regex::new(r"^((?:\w+\s+)*\w+)\s+(\w+)\s*(\[[^\]]*\])$").unwrap();
    let plain = Regex::new(r"^((?:\w+\s+)*\w+)\s+(\w+)$").unwrap();
    let numeric = ["int", "char", "short", "long", "byte", "bool", "unsigned", "signed"];
    let mut fields = Vec::new();
    for raw in body.split(';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if let Some(cap) = ptr.captures(raw) {
            if &cap[1] == "char" {
                fields.push(FieldInfo {
                    decl: format!("char {}[MAX_STRING_LENGTH]", &cap[2]),
                    zero: None,
                });
            } else {
                // a pointer field becomes an index into the pointee's array
                fields.push(FieldInfo {
                    decl: format!("int {}", &cap[2]),
                    zero: Some(cap[2].to_owned()),
                });
            }
        } else if let Some(cap) = arr.captures(raw) {
            fields.push(FieldInfo {
                decl: format!("{} {}{}", &cap[1], &cap[2], &cap[3]),
                zero: None,
            });
        } else if let Some(cap) = plain.captures(raw) {
            let first = cap[1].split_whitespace().next().unwrap_or("");
            let zero = numeric.contains(&first).then(|| cap[2].to_owned());
            fields.push(FieldInfo {
                decl: format!("{} {}", &cap[1], &cap[2]),
                zero,
            });
        }
    }
    fields
}

fn emit_struct_block(name: &str, fields: &[FieldInfo]) -> String {
    let lower = name.to_lowercase();
    let mut out = format!("struct {name} {{\n");
    for field in fields {
        out.push_str(&format!("  {};\n", field.decl));
    }
    out.push_str("};\n");
    out.push_str(&format!("struct {name} {lower}_mem[MAX_NODES];\n"));
    out.push_str(&format!("byte {lower}_used[MAX_NODES];\n\n"));
    out.push_str(&format!("int allocate_{lower}() {{\n"));
    out.push_str("  int i;\n  int slot;\n  slot = -1;\n");
    out.push_str("  for (i = 0; i < MAX_NODES; i++) {\n");
    out.push_str(&format!(
        "    if ({lower}_used[i] == 0 && slot == -1) {{\n"
    ));
    out.push_str(&format!("      {lower}_used[i] = 1;\n"));
    for field in fields {
        if let Some(zero) = &field.zero {
            out.push_str(&format!("      {lower}_mem[i].{zero} = 0;\n"));
        }
    }
    out.push_str("      slot = i;\n    }\n  }\n  return slot;\n}\n\n");
    out.push_str(&format!("void free_{lower}(int idx) {{\n"));
    out.push_str("  if (idx >= 0 && idx < MAX_NODES) {\n");
    out.push_str(&format!("    {lower}_used[idx] = 0;\n"));
    out.push_str("  }\n}\n");
    out
}

/// Replace struct definitions with a rewritten definition plus backing
/// arrays and allocation helpers, all emitted at the top of the unit.
pub(crate) fn memory_arrays(source: &str) -> String {
    let mut emitted = Vec::new();
    let typedef_def = Regex::new(r"typedef\s+struct\s*(\w*)\s*\{([^}]*)\}\s*(\w+)\s*;").unwrap();
    let text = typedef_def
        .replace_all(source, |cap: &Captures| {
            emitted.push(emit_struct_block(&cap[3], &parse_fields(&cap[2])));
            String::new()
        })
        .into_owned();
    let plain_def = Regex::new(r"struct\s+(\w+)\s*\{([^}]*)\}\s*;").unwrap();
    let text = plain_def
        .replace_all(&text, |cap: &Captures| {
            emitted.push(emit_struct_block(&cap[1], &parse_fields(&cap[2])));
            String::new()
        })
        .into_owned();
    if emitted.is_empty() {
        return text;
    }
    format!("{}\n{}", emitted.join("\n"), text)
}

/// Drop the `struct` keyword in front of a known tag everywhere except a
/// definition (where `{` follows the tag).
pub(crate) fn strip_struct_keyword(source: &str) -> String {
    let structs = struct_names(source);
    Regex::new(r"\bstruct\s+(\w+)(\s*[*\w\[])")
        .unwrap()
        .replace_all(source, |cap: &Captures| {
            if is_struct(&cap[1], &structs) {
                format!("{}{}", &cap[1], &cap[2])
            } else {
                cap[0].to_owned()
            }
        })
        .into_owned()
}

/// Residual pointer declarations become plain `int` indices; `char *`
/// locals become fixed buffers; a prefix `&` directly on an identifier is
/// elided (struct locals are already index-valued).
pub(crate) fn pointer_decls(source: &str) -> String {
    let structs = struct_names(source);
    let decl = Regex::new(r"(?:struct\s+)?(\w+)\s*\*+\s*(\w+)\s*([;,)=])").unwrap();
    let text = decl
        .replace_all(source, |cap: &Captures| {
            let (ty, var, sep) = (&cap[1], &cap[2], &cap[3]);
            if is_struct(ty, &structs) {
                if sep == "=" {
                    format!("int {var} =")
                } else {
                    format!("int {var}{sep}")
                }
            } else if ty == "char" && sep == ";" {
                format!("char {var}[MAX_STRING_LENGTH];")
            } else {
                cap[0].to_owned()
            }
        })
        .into_owned();
    strip_address_of(&text)
}

/// Remove `&` only when it directly prefixes an identifier and is not
/// part of `&&` or an infix `a&b`; the regex crate has no lookaround, so
/// this is a character scan.
fn strip_address_of(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut prev: Option<char> = None;
    while let Some(c) = chars.next() {
        if c == '&' {
            let next = chars.peek().copied();
            let prev_blocks =
                matches!(prev, Some(p) if p == '&' || p.is_alphanumeric() || p == '_');
            let next_is_ident = matches!(next, Some(n) if n.is_ascii_alphabetic() || n == '_');
            if !prev_blocks && next_is_ident {
                prev = Some(c);
                continue;
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "struct Node { int value; struct Node *next; };\n\
                        int main() {\n\
                        struct Node *p;\n\
                        p = malloc(sizeof(struct Node));\n\
                        p->value = 4;\n\
                        p->next = NULL;\n\
                        free(p);\n\
                        }\n";

    #[test]
    fn arrow_access_uses_backing_array() {
        let out = pointer_access_to_array(LIST, Strictness::Lenient);
        assert!(out.contains("node_mem[p].value = 4;"));
        assert!(out.contains("node_mem[p].next = -1;"));
    }

    #[test]
    fn malloc_and_free_become_helpers() {
        let out = pointer_access_to_array(LIST, Strictness::Lenient);
        assert!(out.contains("p = allocate_node();"));
        assert!(out.contains("free_node(p);"));
        assert!(!out.contains("malloc"));
    }

    #[test]
    fn cast_malloc_is_recognized() {
        let src = "struct Node { int v; };\nstruct Node *p;\np = (struct Node *) malloc(sizeof(struct Node));\n";
        let out = pointer_access_to_array(src, Strictness::Lenient);
        assert!(out.contains("p = allocate_node();"));
        // both closing parens of the nested sizeof are consumed
        assert!(!out.contains("allocate_node())"));
    }

    #[test]
    fn cast_malloc_with_byte_count_is_recognized() {
        let src = "struct Node { int v; };\nstruct Node *p;\np = (struct Node *) malloc(64);\n";
        let out = pointer_access_to_array(src, Strictness::Lenient);
        assert!(out.contains("p = allocate_node();"));
    }

    #[test]
    fn unknown_pointer_left_alone() {
        let src = "struct Node { int v; };\nq->v = 1;\n";
        let out = pointer_access_to_array(src, Strictness::Lenient);
        assert!(out.contains("q->v = 1;"));
    }

    #[test]
    fn memory_arrays_emit_helpers() {
        let src = pointer_access_to_array(LIST, Strictness::Lenient);
        let out = memory_arrays(&src);
        assert!(out.contains("struct Node node_mem[MAX_NODES];"));
        assert!(out.contains("byte node_used[MAX_NODES];"));
        assert!(out.contains("int allocate_node() {"));
        assert!(out.contains("node_mem[i].value = 0;"));
        assert!(out.contains("node_mem[i].next = 0;"));
        assert!(out.contains("void free_node(int idx) {"));
        // pointer field flattened to an index
        assert!(out.contains("  int next;\n"));
    }

    #[test]
    fn char_pointer_field_becomes_buffer() {
        let out = memory_arrays("struct Person { char *name; int age; };\n");
        assert!(out.contains("char name[MAX_STRING_LENGTH];"));
        assert!(!out.contains("name = 0;"));
    }

    #[test]
    fn struct_keyword_stripped_outside_definitions() {
        let src = "struct Node { int v; };\nstruct Node node_mem[MAX_NODES];\n";
        let out = strip_struct_keyword(src);
        assert!(out.contains("struct Node { int v; };"));
        assert!(out.contains("\nNode node_mem[MAX_NODES];"));
    }

    #[test]
    fn pointer_decl_becomes_index() {
        let src = "struct Node { int v; };\nNode *p;\nNode *q = -1;\n";
        let out = pointer_decls(src);
        assert!(out.contains("int p;"));
        assert!(out.contains("int q = -1;"));
    }

    #[test]
    fn address_of_elision_spares_operators() {
        assert_eq!(strip_address_of("x = &p;"), "x = p;");
        assert_eq!(strip_address_of("x = a && b;"), "x = a && b;");
        assert_eq!(strip_address_of("x = a & b;"), "x = a & b;");
    }
}
