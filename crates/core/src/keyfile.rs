//! Key files
//!
//! One key of 12 hex digits per line. `#` starts a comment that runs to the
//! end of the line; blank lines are ignored.

use derive_more::Display;

use crate::key::{KEY_HEX_LEN, Key};

/// Outcome of validating a key file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeyFileCheck {
    /// At least one key, and every key line is well formed
    #[display("valid")]
    Valid,
    /// No key lines at all
    #[display("no keys found")]
    NoKeys,
    /// A key line contains non-hex characters
    #[display("line {line}: key is not hex")]
    InvalidCharacters {
        /// Offending line, 1-based
        line: usize,
    },
    /// A key line is not 12 hex digits long
    #[display("line {line}: key has {length} characters, expected 12")]
    InvalidLength {
        /// Offending line, 1-based
        line: usize,
        /// Length of the key text
        length: usize,
    },
}

impl KeyFileCheck {
    /// Numeric code of this outcome; 0 means valid
    pub const fn code(&self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::NoKeys => 1,
            Self::InvalidCharacters { .. } => 2,
            Self::InvalidLength { .. } => 3,
        }
    }

    /// Whether the key file is well formed
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Key text of a line with comments and surrounding whitespace removed
fn content(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

/// Validate a key file
pub fn check_key_file(text: &str) -> KeyFileCheck {
    let mut found = false;
    for (i, line) in text.lines().enumerate() {
        let key = content(line);
        if key.is_empty() {
            continue;
        }
        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return KeyFileCheck::InvalidCharacters { line: i + 1 };
        }
        if key.len() != KEY_HEX_LEN {
            return KeyFileCheck::InvalidLength {
                line: i + 1,
                length: key.len(),
            };
        }
        found = true;
    }

    if found {
        KeyFileCheck::Valid
    } else {
        KeyFileCheck::NoKeys
    }
}

/// Extract the well-formed keys of a key file, without duplicates, in file order
///
/// Malformed lines are skipped; use [`check_key_file`] to report them.
pub fn parse_key_file(text: &str) -> Vec<Key> {
    let mut keys = Vec::new();
    for key in text.lines().filter_map(|line| Key::from_hex(content(line)).ok()) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Render keys as a key file, one per line
pub fn to_text(keys: &[Key]) -> String {
    keys.iter().map(|key| format!("{key}\n")).collect()
}
