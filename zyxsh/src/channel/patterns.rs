//! Prompt and pager detection.

use regex::Regex;

/// Default prompt terminator for privileged switch shells.
pub const DEFAULT_TERMINATOR: char = '#';

/// Default pager banner pattern ("--More--", "more", ...).
pub const DEFAULT_PAGER_PATTERN: &str = "(?i)more";

/// Bytes trimmed from the end of the output before looking for the prompt.
const TRAILING_NOISE: [u8; 3] = [b' ', b'\r', b'\n'];

/// Detects the shell prompt by its terminator character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminator(char);

impl Terminator {
    pub fn new(terminator: char) -> Self {
        Self(terminator)
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// Whether the terminator appears anywhere in `data`.
    ///
    /// Used while waiting for the first prompt, where the banner and
    /// prompt may arrive in any shape.
    pub fn appears_in(&self, data: &[u8]) -> bool {
        let mut encoded = [0u8; 4];
        let needle = self.0.encode_utf8(&mut encoded).as_bytes();
        match needle {
            [byte] => memchr::memchr(*byte, data).is_some(),
            _ => memchr::memmem::find(data, needle).is_some(),
        }
    }

    /// Whether `output` ends with the terminator once trailing spaces and
    /// line breaks are ignored.
    pub fn ends(&self, output: &[u8]) -> bool {
        let end = output
            .iter()
            .rposition(|byte| !TRAILING_NOISE.contains(byte))
            .map_or(0, |pos| pos + 1);
        let mut encoded = [0u8; 4];
        output[..end].ends_with(self.0.encode_utf8(&mut encoded).as_bytes())
    }
}

impl Default for Terminator {
    fn default() -> Self {
        Self(DEFAULT_TERMINATOR)
    }
}

/// Detects pagination banners that hold output until a key is pressed.
#[derive(Debug, Clone)]
pub struct Pager {
    pattern: Regex,
}

impl Pager {
    /// Compile a pager pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Whether the chunk carries a pager banner.
    pub fn is_banner(&self, chunk: &str) -> bool {
        self.pattern.is_match(chunk)
    }

}

impl Default for Pager {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_PAGER_PATTERN).expect("default pager pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_anywhere_in_chunk() {
        let term = Terminator::default();
        assert!(term.appears_in(b"Welcome\r\nSwitch# "));
        assert!(term.appears_in(b"#"));
        assert!(term.appears_in(b"motd with # in the middle"));
        assert!(!term.appears_in(b"Username: "));
    }

    #[test]
    fn test_multibyte_terminator() {
        let term = Terminator::new('❯');
        assert!(term.appears_in("host ❯ ".as_bytes()));
        assert!(!term.appears_in(b"host > "));
    }

    #[test]
    fn test_terminator_ends_output() {
        let term = Terminator::default();
        assert!(term.ends(b"show vlan\r\nVLAN 1\r\nSwitch#"));
        assert!(term.ends(b"Switch# \r\n"));
        assert!(!term.ends(b"Switch#\r\nmore output"));
        assert!(!term.ends(b""));
        assert!(!term.ends(b" \r\n"));
        assert!(Terminator::new('❯').ends("host ❯ \r\n".as_bytes()));
    }

    #[test]
    fn test_pager_is_case_insensitive() {
        let pager = Pager::default();
        assert!(pager.is_banner("--More--"));
        assert!(pager.is_banner("  more  "));
        assert!(pager.is_banner("-- MORE --"));
        assert!(!pager.is_banner("VLAN 1 Active"));
    }

    #[test]
    fn test_custom_pager() {
        let pager = Pager::new(r"<--- More --->").unwrap();
        assert!(pager.is_banner("<--- More --->"));
        assert!(!pager.is_banner("--More--"));
        assert!(Pager::new("(unclosed").is_err());
    }
}
