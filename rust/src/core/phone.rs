// Phone number canonicalization.

use phonenumber::{country, Mode};

/// Canonical forms of one raw address-book number.
///
/// `digits` is always present (every non-digit stripped from the input);
/// `e164` only when region-aware parsing yields a valid number. Malformed
/// input is a `None`, never an error: one bad entry must not abort a whole
/// reconciliation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPhone {
    pub e164: Option<String>,
    pub digits: String,
}

impl NormalizedPhone {
    /// Comparison key: digits of the canonical form when available, raw
    /// digits otherwise. Registry rows are keyed the same way, so a registry
    /// that canonicalizes differently still matches.
    pub fn key_digits(&self) -> String {
        match &self.e164 {
            Some(e164) => e164.chars().filter(char::is_ascii_digit).collect(),
            None => self.digits.clone(),
        }
    }

    /// Deduplication key for numbers with no registered owner. `None` means
    /// the entry is unusable and is skipped entirely.
    pub fn local_key(&self) -> Option<String> {
        match &self.e164 {
            Some(e164) => Some(format!("local_{e164}")),
            None if !self.digits.is_empty() => Some(format!("local_{}", self.digits)),
            None => None,
        }
    }

    /// What the UI shows for this number.
    pub fn display(&self) -> String {
        self.e164.clone().unwrap_or_else(|| self.digits.clone())
    }
}

/// Normalize one raw phone string against an assumed default region.
///
/// Pure: no I/O, no external state. Runs once per number across potentially
/// hundreds of contacts, so it must stay cheap.
pub fn normalize(raw: &str, region: country::Id) -> NormalizedPhone {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let e164 = match phonenumber::parse(Some(region), raw) {
        Ok(parsed) if phonenumber::is_valid(&parsed) => {
            Some(parsed.format().mode(Mode::E164).to_string())
        }
        _ => None,
    };
    NormalizedPhone { e164, digits }
}
