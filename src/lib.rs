#![allow(clippy::module_inception)]

use std::{fmt::Display, rc::Rc};

use crate::errors::errors::{Error, ErrorTip};

pub mod codegen;
pub mod context;
pub mod errors;
pub mod intermediate;
pub mod macros;
pub mod symbol;
pub mod types;

extern crate regex;

/// A source line and the file it belongs to. Line 0 means "unknown".
#[derive(Debug, Clone)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.1, self.0)
    }
}

/// Returns the text of the 1-based `line` of `source`, without its line break.
pub fn get_line(source: &str, line: u32) -> Option<&str> {
    let index = (line as usize).checked_sub(1)?;
    source
        .split_inclusive('\n')
        .nth(index)
        .map(|text| text.trim_end_matches(['\n', '\r']))
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line() {
        let source = "program\n  var x: int\r\nend\n";
        assert_eq!(super::get_line(source, 1), Some("program"));
        assert_eq!(super::get_line(source, 2), Some("  var x: int"));
        assert_eq!(super::get_line(source, 3), Some("end"));
        assert_eq!(super::get_line(source, 4), None);
        assert_eq!(super::get_line(source, 0), None);
    }

    #[test]
    fn test_render_error() {
        use crate::errors::errors::{Error, ErrorImpl};
        use crate::Position;
        use std::rc::Rc;

        let error = Error::new(
            ErrorImpl::UnknownIdentifier {
                name: String::from("y"),
            },
            Position(2, Rc::new(String::from("prog.tony"))),
        );
        let rendered = super::render_error(&error, Some("program\n    y := 1\nend\n"));

        assert_eq!(
            rendered,
            "Error: UnknownIdentifier (`y` is not declared in any enclosing scope)\n\
             -> prog.tony:2\n\
             \x20 |\n\
             2 | y := 1\n\
             \x20 |\n\
             Semantic error, unknown identifier: y\n"
        );

        let rendered = super::render_error(&error, None);
        assert!(rendered.starts_with("Error: UnknownIdentifier"));
        assert!(!rendered.contains("2 |"));
    }
}

/// Formats a diagnostic, quoting the offending line when the source is available.
pub fn render_error(error: &Error, source: Option<&str>) -> String {
    /*
        Error: DuplicateIdentifier (`x` is already declared in this scope)
        -> prog.tony:12
           |
        12 | var x: int
           |
        Semantic error, duplicate identifier: x
    */

    let mut output = match error.get_tip() {
        ErrorTip::None => format!("Error: {}\n", error.get_error_name()),
        tip => format!("Error: {} ({})\n", error.get_error_name(), tip),
    };

    let position = error.get_position();
    if !position.is_null() {
        output.push_str(&format!("-> {}\n", position));

        if let Some(text) = source.and_then(|source| get_line(source, position.0)) {
            let line_string = position.0.to_string();
            let padding = line_string.len() + 2;
            output.push_str(&format!("{:>padding$}\n", "|"));
            output.push_str(&format!("{} | {}\n", line_string, text.trim()));
            output.push_str(&format!("{:>padding$}\n", "|"));
        }
    }

    output.push_str(&format!("{}, {}\n", error.get_kind(), error.get_impl()));
    output
}

/// Prints a diagnostic to standard error.
pub fn display_error(error: &Error, source: Option<&str>) {
    eprint!("{}", render_error(error, source));
    log::error!("{}", error);
}
