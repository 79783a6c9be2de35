//! Field-spec parser using nom.
//!
//! Configuration files declare schemas as a list of field specs, written the
//! way serialization tags are written on a record:
//!
//! ```text
//! age:int64,omitempty
//! ─┬─ ──┬── ────┬────
//!  │    │       └── Options (omitempty)
//!  │    └── Kind (int, int64, float64, list, string)
//!  └── Key
//! ```
//!
//! The kind defaults to `string` and options default to none.

use nom::{
    Offset,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::opt,
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{FormbaseError, FormbaseResult};
use crate::schema::{FieldDescriptor, FieldKind};

/// Raw pieces of a field spec before validation.
struct RawSpec<'a> {
    key: &'a str,
    kind: Option<&'a str>,
    options: Vec<&'a str>,
}

/// Parse a single field spec into a descriptor.
pub fn parse_field(spec: &str) -> FormbaseResult<FieldDescriptor> {
    let raw = match parse_spec(spec) {
        Ok(("", raw)) => raw,
        Ok((remaining, _)) => {
            return Err(FormbaseError::parse(
                spec.offset(remaining),
                format!("Unexpected trailing content: '{}'", remaining),
            ));
        }
        Err(e) => {
            return Err(FormbaseError::parse(
                0,
                format!("Invalid field spec '{}': {:?}", spec, e),
            ));
        }
    };

    let kind = match raw.kind {
        Some(word) => kind_from_name(word).ok_or_else(|| {
            FormbaseError::parse(spec.offset(word), format!("Unknown field kind '{}'", word))
        })?,
        None => FieldKind::String,
    };

    let mut field = FieldDescriptor::new(raw.key, kind);
    for option in raw.options {
        match option {
            "omitempty" => field.omittable = true,
            other => {
                return Err(FormbaseError::parse(
                    spec.offset(other),
                    format!("Unknown field option '{}'", other),
                ));
            }
        }
    }

    Ok(field)
}

/// Map a kind name to its [`FieldKind`], accepting the common aliases.
pub fn kind_from_name(name: &str) -> Option<FieldKind> {
    let kind = match name {
        "int" | "i32" => FieldKind::Int,
        "int64" | "i64" => FieldKind::Int64,
        "float64" | "f64" | "float" => FieldKind::Float64,
        "list" | "strings" | "[]string" => FieldKind::StringList,
        "string" | "str" => FieldKind::String,
        _ => return None,
    };
    Some(kind)
}

/// key [":" kind] ("," option)*
fn parse_spec(input: &str) -> IResult<&str, RawSpec<'_>> {
    let (input, _) = multispace0(input)?;
    let (input, key) = parse_key(input)?;
    let (input, kind) = opt(preceded(
        tuple((multispace0, char(':'), multispace0)),
        parse_kind_word,
    ))(input)?;
    let (input, options) = many0(preceded(
        tuple((multispace0, char(','), multispace0)),
        parse_key,
    ))(input)?;
    let (input, _) = multispace0(input)?;

    Ok((input, RawSpec { key, kind, options }))
}

/// Parse a field key (also used for option names).
fn parse_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')(input)
}

fn parse_kind_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '[' || c == ']')(input)
}
