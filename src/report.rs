use std::fmt::Display;
use std::path::Path;

use c2pml_core::TranslateError;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct Report {
    pub(crate) file: String,
    pub(crate) valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expected: Option<Vec<String>>,
}

impl Report {
    pub(crate) fn new(file: &Path, result: Result<String, TranslateError>) -> Self {
        let file = file.display().to_string();
        match result {
            Ok(_) => Report {
                file,
                valid: true,
                error: None,
                line: None,
                column: None,
                expected: None,
            },
            Err(err) => {
                let (line, column, expected) = match &err {
                    TranslateError::Syntax(e) => {
                        (Some(e.line), Some(e.column), Some(e.expected.clone()))
                    }
                    TranslateError::Lexical(e) => (Some(e.line), Some(e.column), None),
                    TranslateError::EmptyInput => (None, None, None),
                };
                Report {
                    file,
                    valid: false,
                    error: Some(err.to_string()),
                    line,
                    column,
                    expected,
                }
            }
        }
    }

    pub(crate) fn valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn print(&self, json: bool) {
        if json {
            let report = serde_json::ser::to_string_pretty(&self).expect("report serialization");
            println!("{report}");
        } else {
            println!("{self}");
        };
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.valid {
            write!(f, "'{}' translates successfully", self.file)
        } else {
            write!(
                f,
                "'{}' does not translate: {}",
                self.file,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
