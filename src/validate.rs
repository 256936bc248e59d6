use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use time::format_description::well_known::Iso8601;

/// One failed rule, reported under the field path the client sent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Walks an ordered rule list and collects every violation instead of
/// stopping at the first one. Fields required on create become optional on
/// update; a supplied field is held to the same constraint in both modes.
pub struct Checker {
    mode: Mode,
    violations: Vec<Violation>,
}

impl Checker {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            violations: Vec::new(),
        }
    }

    /// Presence gate for a field that is required on create. Returns whether
    /// the field's own constraints should run.
    pub fn required(&mut self, field: &str, present: bool, message: &str) -> bool {
        if !present && self.mode == Mode::Create {
            self.violations.push(Violation::new(field, message));
        }
        present
    }

    /// A constraint on a value already known to be present.
    pub fn check(&mut self, field: &str, ok: bool, message: &str) {
        if !ok {
            self.violations.push(Violation::new(field, message));
        }
    }

    pub fn finish(self) -> Result<(), Vec<Violation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Accepts plain dates ("2020-01-01") as well as full ISO-8601 timestamps.
pub fn is_iso8601(value: &str) -> bool {
    time::Date::parse(value, &Iso8601::DEFAULT).is_ok()
        || time::OffsetDateTime::parse(value, &Iso8601::DEFAULT).is_ok()
        || time::PrimitiveDateTime::parse(value, &Iso8601::DEFAULT).is_ok()
}
