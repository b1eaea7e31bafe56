//! Italian national cadastral reference codes.
//!
//! A reference looks like `CCCCZFFFFAS.parcel`:
//!
//! | Chars | Meaning |
//! |-------|---------|
//! | `CCCC` | municipality code |
//! | `Z` | census section, `_` when none |
//! | `FFFF` | sheet number |
//! | `A` | attachment |
//! | `S` | development |
//!
//! Only the part before the first `.` is decoded, and only when it is
//! exactly 11 characters long.

use parcel_wfs_parcel_models::{AttributeValue, FieldDef, FieldType};

/// Census section field.
pub const SECTION_FIELD: &str = "section";
/// Sheet number field.
pub const SHEET_FIELD: &str = "sheet";
/// Attachment field.
pub const ATTACHMENT_FIELD: &str = "attachment";
/// Development field.
pub const DEVELOPMENT_FIELD: &str = "development";

const CODE_LEN: usize = 11;

/// Decoded parts of a cadastral reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadastralCode {
    /// Municipality code.
    pub municipality: String,
    /// Census section, `None` for `_`.
    pub section: Option<String>,
    /// Sheet number, `None` when the digits do not parse.
    pub sheet: Option<i64>,
    /// Attachment character.
    pub attachment: String,
    /// Development character.
    pub development: String,
}

impl CadastralCode {
    /// Decodes `reference`, returning `None` when the code part is not
    /// exactly 11 characters.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        let code = reference.split('.').next().unwrap_or_default();
        let chars: Vec<char> = code.chars().collect();
        if chars.len() != CODE_LEN {
            return None;
        }

        let section = match chars[4] {
            '_' => None,
            c => Some(c.to_string()),
        };
        let sheet = chars[5..9]
            .iter()
            .collect::<String>()
            .trim()
            .parse::<i64>()
            .ok();

        Some(Self {
            municipality: chars[..4].iter().collect(),
            section,
            sheet,
            attachment: chars[9].to_string(),
            development: chars[10].to_string(),
        })
    }

    /// Definitions of the derived fields, in output order.
    #[must_use]
    pub fn fields() -> [FieldDef; 4] {
        [
            FieldDef::new(SECTION_FIELD, FieldType::Text),
            FieldDef::new(SHEET_FIELD, FieldType::Integer),
            FieldDef::new(ATTACHMENT_FIELD, FieldType::Text),
            FieldDef::new(DEVELOPMENT_FIELD, FieldType::Text),
        ]
    }

    /// Value of derived field `name`, or `None` if `name` is not one.
    #[must_use]
    pub fn value_of(code: Option<&Self>, name: &str) -> Option<AttributeValue> {
        let value = |v: Option<AttributeValue>| v.unwrap_or(AttributeValue::Null);
        match name {
            SECTION_FIELD => Some(value(
                code.and_then(|c| c.section.clone()).map(AttributeValue::from),
            )),
            SHEET_FIELD => Some(value(code.and_then(|c| c.sheet).map(AttributeValue::from))),
            ATTACHMENT_FIELD => Some(value(
                code.map(|c| AttributeValue::from(c.attachment.as_str())),
            )),
            DEVELOPMENT_FIELD => Some(value(
                code.map(|c| AttributeValue::from(c.development.as_str())),
            )),
            _ => None,
        }
    }
}
