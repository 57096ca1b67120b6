//! Terminal escape sequence removal.

use vte::{Parser, Perform};

/// Collects printable text and line control, dropping everything else.
struct Plain {
    out: String,
}

impl Perform for Plain {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }
}

/// Strip ANSI/VT escape sequences from `text`.
pub fn strip_ansi(text: &str) -> String {
    let mut plain = Plain {
        out: String::with_capacity(text.len()),
    };
    let mut parser: Parser = Parser::new();
    parser.advance(&mut plain, text.as_bytes());
    plain.out
}
