//! Form input validation.
//!
//! Everything here runs before a transaction is opened; failures are
//! reported as [`Error::Validation`] naming the first offending field.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{MaterialType, Ministry, NewMaterial, NewVolunteer};

/// Volunteer name length bounds, in characters.
pub const VOLUNTEER_NAME_LEN: (usize, usize) = (2, 100);
/// Material name length bounds, in characters.
pub const MATERIAL_NAME_LEN: (usize, usize) = (2, 50);
/// Maximum material code length.
pub const MATERIAL_CODE_MAX: usize = 20;
/// Maximum length of free-form notes.
pub const NOTES_MAX: usize = 500;

fn person_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-ZÀ-ÿ\s]+$").expect("Invalid regex pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{10,15}$").expect("Invalid regex pattern")
    })
}

/// Validated, normalized volunteer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerFields {
    /// Trimmed name.
    pub name: String,
    /// Trimmed phone, `None` when blank.
    pub phone: Option<String>,
    /// Parsed ministry.
    pub ministry: Ministry,
}

/// Validated, normalized material fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialFields {
    /// Trimmed name.
    pub name: String,
    /// Trimmed code, `None` when blank.
    pub code: Option<String>,
    /// Parsed type.
    pub kind: MaterialType,
    /// Trimmed notes, `None` when blank.
    pub notes: Option<String>,
}

/// Trim an optional value, mapping blank to `None`.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_length(field: &'static str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(Error::validation(
            field,
            format!("must have at least {min} characters"),
        ));
    }
    if len > max {
        return Err(Error::validation(
            field,
            format!("must have at most {max} characters"),
        ));
    }
    Ok(())
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "is required"))
    } else {
        Ok(trimmed)
    }
}

/// Validate a volunteer name.
///
/// # Errors
///
/// Returns a validation error if the name is blank, has the wrong length,
/// or contains anything other than letters and spaces.
pub fn volunteer_name(value: &str) -> Result<String> {
    let name = required("name", value)?;
    check_length("name", name, VOLUNTEER_NAME_LEN)?;
    if !person_name_pattern().is_match(name) {
        return Err(Error::validation("name", "may only contain letters and spaces"));
    }
    Ok(name.to_string())
}

/// Validate an optional phone number.
///
/// # Errors
///
/// Returns a validation error if a non-blank phone is not 10 to 15 digits.
pub fn phone(value: Option<&str>) -> Result<Option<String>> {
    match non_blank(value) {
        Some(phone) if !phone_pattern().is_match(&phone) => Err(Error::validation(
            "phone",
            "must contain 10 to 15 digits",
        )),
        other => Ok(other),
    }
}

/// Validate a ministry name.
///
/// # Errors
///
/// Returns a validation error if the ministry is blank or unknown.
pub fn ministry(value: &str) -> Result<Ministry> {
    required("ministry", value)?.parse()
}

/// Validate optional free-form notes.
///
/// # Errors
///
/// Returns a validation error if the notes are too long.
pub fn notes(value: Option<&str>) -> Result<Option<String>> {
    let notes = non_blank(value);
    if let Some(text) = &notes {
        check_length("notes", text, (0, NOTES_MAX))?;
    }
    Ok(notes)
}

/// Validate a volunteer registration.
///
/// # Errors
///
/// Returns the first validation error found, checking name, phone, then ministry.
pub fn new_volunteer(input: &NewVolunteer) -> Result<VolunteerFields> {
    Ok(VolunteerFields {
        name: volunteer_name(&input.name)?,
        phone: phone(input.phone.as_deref())?,
        ministry: ministry(&input.ministry)?,
    })
}

/// Validate a material registration.
///
/// # Errors
///
/// Returns the first validation error found, checking name, code, type, then notes.
pub fn new_material(input: &NewMaterial) -> Result<MaterialFields> {
    let name = required("name", &input.name)?;
    check_length("name", name, MATERIAL_NAME_LEN)?;

    let code = non_blank(input.code.as_deref());
    if let Some(code) = &code {
        check_length("code", code, (1, MATERIAL_CODE_MAX))?;
    }

    let kind = required("type", &input.kind)?.parse()?;

    Ok(MaterialFields {
        name: name.to_string(),
        code,
        kind,
        notes: notes(input.notes.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn field_of(err: &Error) -> &'static str {
        match err {
            Error::Validation { field, .. } => *field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn volunteer_input(name: &str, phone: Option<&str>, ministry: &str) -> NewVolunteer {
        NewVolunteer {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            ministry: ministry.to_string(),
        }
    }

    #[test]
    fn test_valid_volunteer_is_trimmed() {
        let fields =
            new_volunteer(&volunteer_input("  João Silva ", Some(" 11987654321 "), "midia"))
                .unwrap();
        assert_eq!(fields.name, "João Silva");
        assert_eq!(fields.phone.as_deref(), Some("11987654321"));
        assert_eq!(fields.ministry, Ministry::Midia);
    }

    #[test]
    fn test_volunteer_name_required() {
        let err = new_volunteer(&volunteer_input("   ", None, "midia")).unwrap_err();
        assert_eq!(field_of(&err), "name");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_volunteer_name_too_short() {
        let err = volunteer_name("A").unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_volunteer_name_too_long() {
        let err = volunteer_name(&"a".repeat(101)).unwrap_err();
        assert!(err.to_string().contains("at most 100"));
    }

    #[test]
    fn test_volunteer_name_rejects_digits() {
        let err = volunteer_name("Ana 2").unwrap_err();
        assert_eq!(field_of(&err), "name");
    }

    #[test]
    fn test_blank_phone_is_none() {
        assert_eq!(phone(Some("  ")).unwrap(), None);
        assert_eq!(phone(None).unwrap(), None);
    }

    #[test]
    fn test_phone_must_be_digits() {
        let err = phone(Some("(11) 98765-4321")).unwrap_err();
        assert_eq!(field_of(&err), "phone");
        assert!(phone(Some("123456789")).is_err());
        assert!(phone(Some("1234567890123456")).is_err());
    }

    #[test]
    fn test_unknown_ministry() {
        let err = new_volunteer(&volunteer_input("Ana", None, "choir")).unwrap_err();
        assert_eq!(field_of(&err), "ministry");
    }

    #[test]
    fn test_first_error_wins() {
        let err = new_volunteer(&volunteer_input("A", Some("x"), "choir")).unwrap_err();
        assert_eq!(field_of(&err), "name");
    }

    #[test]
    fn test_valid_material() {
        let fields = new_material(&NewMaterial {
            name: " Rádio 3 ".to_string(),
            code: Some("RD-03".to_string()),
            kind: "radio".to_string(),
            notes: Some(String::new()),
        })
        .unwrap();
        assert_eq!(fields.name, "Rádio 3");
        assert_eq!(fields.code.as_deref(), Some("RD-03"));
        assert_eq!(fields.kind, MaterialType::Radio);
        assert_eq!(fields.notes, None);
    }

    #[test]
    fn test_material_code_too_long() {
        let err = new_material(&NewMaterial {
            name: "Chave sala 2".to_string(),
            code: Some("X".repeat(21)),
            kind: "chave".to_string(),
            notes: None,
        })
        .unwrap_err();
        assert_eq!(field_of(&err), "code");
    }

    #[test]
    fn test_material_unknown_type() {
        let err = new_material(&NewMaterial {
            name: "Notebook".to_string(),
            code: None,
            kind: "laptop".to_string(),
            notes: None,
        })
        .unwrap_err();
        assert_eq!(field_of(&err), "type");
    }

    #[test]
    fn test_notes_too_long() {
        let err = notes(Some(&"n".repeat(NOTES_MAX + 1))).unwrap_err();
        assert_eq!(field_of(&err), "notes");
    }
}
