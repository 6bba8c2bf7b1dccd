//! Identifier validation.
//!
//! Every name that ends up in generated SQL text and can be influenced by a caller
//! (collection names, column names, filter fields, sort columns) goes through here.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CommonError;
use crate::error::Result;

pub const MAX_IDENTIFIER_LEN: usize = 255;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Checks that `name` is a plain identifier: a letter or underscore followed by letters,
/// digits or underscores.
pub fn check_identifier<'a>(name: &'a str, kind: &str) -> Result<&'a str> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN || !IDENTIFIER.is_match(name) {
        return Err(CommonError::invalid_identifier(kind, name));
    }

    Ok(name)
}

pub fn check_collection(name: &str) -> Result<&str> {
    check_identifier(name, "collection")
}

pub fn check_table_column<'a>(name: &'a str, kind: &str) -> Result<&'a str> {
    check_identifier(name, kind)
}

pub fn check_project(name: &str) -> Result<&str> {
    check_identifier(name, "project")
}
