//! Form decoding and required-field validation.
//!
//! Every wire type declares a field table (decode key, required flag) and a
//! `set` method; binding walks the urlencoded pairs through `set`, validation
//! walks the table. Unknown keys are ignored, absent fields keep their zero
//! value, and decoding fails only on structural mismatch.

use std::fmt;
use thiserror::Error;

/// One entry of a wire type's field table.
pub struct Field {
    pub name: &'static str,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str) -> Self {
        Self { name, required: true }
    }
    pub const fn optional(name: &'static str) -> Self {
        Self { name, required: false }
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("field `{field}` expects {expected}, got `{given}`")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        given: String,
    },
    #[error("malformed list key `{0}`")]
    BadListKey(String),
}

/// A form-decodable wire type.
pub trait FormModel: Default {
    const FIELDS: &'static [Field];

    /// Apply one decoded key/value pair. Unknown keys must be ignored.
    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError>;

    /// Whether the named field still holds its zero value.
    fn is_zero(&self, field: &str) -> bool;
}

/// Decode a form-encoded body into a fresh `T`.
pub fn bind<T: FormModel>(body: &[u8]) -> Result<T, BindError> {
    let mut dst = T::default();
    for (key, value) in form_urlencoded::parse(body) {
        dst.set(&key, &value)?;
    }
    Ok(dst)
}

#[derive(Debug)]
pub struct Violation {
    pub field: String,
    pub constraint: &'static str,
}

/// Every violation found in one pass; never just the first one.
#[derive(Debug, Default)]
pub struct ValidationErrors(pub Vec<Violation>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, constraint: &'static str) {
        self.0.push(Violation { field: field.into(), constraint });
    }

    /// Fold another set in, prefixing its field names (used for embedded
    /// lists: `combine_req_cfgs.0.path`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for v in other.0 {
            self.0.push(Violation {
                field: format!("{}.{}", prefix, v.field),
                constraint: v.constraint,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameters:")?;
        for v in &self.0 {
            write!(f, " field `{}` fails `{}`;", v.field, v.constraint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Evaluate the declared field table against a populated value.
pub fn check_required<T: FormModel>(value: &T) -> ValidationErrors {
    let mut errs = ValidationErrors::default();
    for f in T::FIELDS {
        if f.required && value.is_zero(f.name) {
            errs.push(f.name, "required");
        }
    }
    errs
}

/// Validation entry point; kinds with embedded children override this to
/// fold the children's violations in.
pub trait Validate: FormModel {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check_required(self).into_result()
    }
}

pub fn parse_flag(field: &str, value: &str) -> Result<bool, BindError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "off" => Ok(false),
        "1" | "true" | "on" => Ok(true),
        _ => Err(BindError::TypeMismatch {
            field: field.to_owned(),
            expected: "a boolean",
            given: value.to_owned(),
        }),
    }
}

pub fn parse_u32(field: &str, value: &str) -> Result<u32, BindError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| BindError::TypeMismatch {
        field: field.to_owned(),
        expected: "an unsigned integer",
        given: value.to_owned(),
    })
}

/// Split `N.rest` off an indexed list key.
pub fn split_list_key(full: &str, rest: &str) -> Result<(usize, String), BindError> {
    let (idx, sub) = rest
        .split_once('.')
        .ok_or_else(|| BindError::BadListKey(full.to_owned()))?;
    let idx = idx
        .parse()
        .map_err(|_| BindError::BadListKey(full.to_owned()))?;
    Ok((idx, sub.to_owned()))
}
