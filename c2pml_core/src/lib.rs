//! Rule-based translation from a restricted C subset to Promela, the
//! input language of the SPIN model checker.
//!
//! The pipeline is a fixed sequence of forward passes: textual
//! normalization, struct/pointer elimination onto global backing arrays,
//! return-value elimination via out-parameters, then a single
//! syntax-directed parse that emits Promela text, and finally entry-point
//! wrapping (`main` → `init`). Translation is pure: no files, no globals,
//! and a fresh parse context per call, so concurrent calls need no
//! coordination.
//!
//! ```
//! let promela = c2pml_core::translate("int main() { int x; x = 1; }").unwrap();
//! assert!(promela.contains("init {"));
//! ```

mod lexer;
mod parser;
mod postprocess;
mod rewrite;

use std::time::Instant;

use log::info;
use thiserror::Error;

pub use lexer::LexicalError;
pub use parser::SyntaxError;

/// How the non-failing rewrite passes report patterns they leave
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Silently leave unsupported patterns in place.
    #[default]
    Lenient,
    /// Leave them in place but log a warning for each kind.
    Warn,
}

#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    pub strictness: Strictness,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("empty input: nothing to translate")]
    EmptyInput,
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Translate a C translation unit to Promela with default options.
pub fn translate(source: &str) -> Result<String, TranslateError> {
    translate_with(source, &TranslateOptions::default())
}

pub fn translate_with(
    source: &str,
    options: &TranslateOptions,
) -> Result<String, TranslateError> {
    if source.trim().is_empty() {
        return Err(TranslateError::EmptyInput);
    }

    let now = Instant::now();
    let text = rewrite::normalize::normalize(source);
    let text = rewrite::structs::pointer_access_to_array(&text, options.strictness);
    let text = rewrite::structs::memory_arrays(&text);
    let text = rewrite::returns::eliminate(&text, options.strictness);
    let text = rewrite::structs::strip_struct_keyword(&text);
    let text = rewrite::structs::pointer_decls(&text);
    let text = rewrite::normalize::normalize(&text);
    info!(target: "c2pml", "rewrite passes completed in {:?}", now.elapsed());

    let now = Instant::now();
    let translated = parser::translate_source(&text)?;
    info!(target: "c2pml", "parsing completed in {:?}", now.elapsed());

    Ok(postprocess::wrap_entry_point(&translated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(translate(""), Err(TranslateError::EmptyInput)));
        assert!(matches!(
            translate("  \n\t "),
            Err(TranslateError::EmptyInput)
        ));
    }
}
