pub mod admin;
pub mod auth;
pub mod payments;
pub mod root;
pub mod tariffs;
pub mod users;

use crate::error::{AppError, Result};

/// Parses a comma-separated query value into a list, rejecting unknown
/// entries. An absent or all-empty value yields `None`.
pub(crate) fn parse_csv<T>(
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> Result<Option<Vec<T>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        values.push(
            parse(part)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", what, part)))?,
        );
    }

    Ok(if values.is_empty() { None } else { Some(values) })
}
