use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    /// Bytes that can sit inside a quoted `db` operand.
    static ref PRINTABLE_RUN: Regex = Regex::new(r"[\x20-\x26\x28-\x7E]+").unwrap();
}

/// Distinct string literals of the program, labelled `@str0`, `@str1`, ...
#[derive(Debug, Default)]
pub struct StringPool {
    literals: Vec<Vec<u8>>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool { literals: vec![] }
    }

    /// Returns the label of `text`, adding it to the pool the first time it is seen.
    pub fn intern(&mut self, text: &[u8]) -> String {
        let index = match self.literals.iter().position(|literal| literal == text) {
            Some(index) => index,
            None => {
                self.literals.push(text.to_vec());
                self.literals.len() - 1
            }
        };
        format!("@str{}", index)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn render(&self) -> String {
        let mut output = String::from(";;; string literals\n");
        for (index, literal) in self.literals.iter().enumerate() {
            output.push_str(&format!("@str{}", index));
            let mut cursor = 0;
            for run in PRINTABLE_RUN.find_iter(literal) {
                push_bytes(&mut output, &literal[cursor..run.start()]);
                output.push_str(&format!(
                    "\tdb\t'{}'\n",
                    String::from_utf8_lossy(run.as_bytes())
                ));
                cursor = run.end();
            }
            push_bytes(&mut output, &literal[cursor..]);
            output.push_str("\tdb\t0\n");
        }
        output
    }
}

fn push_bytes(output: &mut String, bytes: &[u8]) {
    for byte in bytes {
        output.push_str(&format!("\tdb\t{}\n", byte));
    }
}
