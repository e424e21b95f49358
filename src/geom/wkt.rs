//! Minimal well-known-text reader for `POLYGON` footprints.
//!
//! Accepts `POLYGON((x y, ...), (x y, ...))` with optional `Z`/`M`/`ZM` tags;
//! coordinates beyond the second are ignored.

use super::core::Point2;
use super::footprint::GeometryError;

/// Parse a WKT polygon into its rings, outer ring first.
///
/// # Errors
/// Returns `GeometryError::InvalidWkt` when the text is not a polygon or a
/// coordinate cannot be read, and `GeometryError::Empty` for `POLYGON EMPTY`.
pub fn parse_polygon(text: &str) -> Result<Vec<Vec<Point2>>, GeometryError> {
    let trimmed = text.trim();
    let upper = trimmed.to_ascii_uppercase();
    let Some(rest) = upper.strip_prefix("POLYGON") else {
        return Err(invalid("expected POLYGON"));
    };

    let rest = rest.trim_start();
    let rest = ["ZM", "Z", "M"]
        .iter()
        .find_map(|tag| rest.strip_prefix(tag))
        .unwrap_or(rest)
        .trim();

    if rest == "EMPTY" {
        return Err(GeometryError::Empty);
    }

    let body = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| invalid("unbalanced polygon parentheses"))?;

    let mut rings = Vec::new();
    let mut cursor = body.trim();
    while !cursor.is_empty() {
        let inner = cursor
            .strip_prefix('(')
            .ok_or_else(|| invalid("expected '(' at ring start"))?;
        let close = inner
            .find(')')
            .ok_or_else(|| invalid("unterminated ring"))?;
        rings.push(parse_ring(&inner[..close])?);

        cursor = inner[close + 1..].trim_start();
        if let Some(after_comma) = cursor.strip_prefix(',') {
            cursor = after_comma.trim_start();
            if cursor.is_empty() {
                return Err(invalid("trailing ',' after last ring"));
            }
        } else if !cursor.is_empty() {
            return Err(invalid("expected ',' between rings"));
        }
    }

    if rings.is_empty() {
        return Err(GeometryError::Empty);
    }
    Ok(rings)
}

fn parse_ring(text: &str) -> Result<Vec<Point2>, GeometryError> {
    text.split(',')
        .map(|coord| {
            let mut parts = coord.split_whitespace();
            let x = parse_number(parts.next())?;
            let y = parse_number(parts.next())?;
            Ok(Point2::new(x, y))
        })
        .collect()
}

fn parse_number(token: Option<&str>) -> Result<f64, GeometryError> {
    let token = token.ok_or_else(|| invalid("missing coordinate"))?;
    token
        .parse::<f64>()
        .map_err(|_| invalid(&format!("bad coordinate '{token}'")))
}

fn invalid(msg: &str) -> GeometryError {
    GeometryError::InvalidWkt(msg.to_string())
}
