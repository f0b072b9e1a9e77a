//! Source-to-source rewrite passes that run before tokenization.
//!
//! Each pass is a pure text transformation over the whole translation
//! unit. Passes never fail: a pattern that cannot be rewritten safely is
//! left in place for the parser to accept or reject.

pub(crate) mod normalize;
pub(crate) mod returns;
pub(crate) mod structs;

/// Index of the `}` matching the `{` at `open`, by depth scan.
pub(crate) fn match_brace(code: &str, open: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&b'{'));
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_brace_nested() {
        let code = "f() { if (x) { y; } z; } rest";
        let close = match_brace(code, 4).unwrap();
        assert_eq!(&code[close..close + 1], "}");
        assert_eq!(close, 23);
    }

    #[test]
    fn match_brace_unbalanced() {
        assert_eq!(match_brace("f() { {", 4), None);
    }
}
