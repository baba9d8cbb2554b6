//! Import scope selectors.
//!
//! A scope narrows which authoritative records an import version may
//! affect. The selector travels as text (`full`, `region:<name>`,
//! `bbox:minX,minY,maxX,maxY`) but is parsed exactly once at the
//! configuration boundary; everything downstream works with the typed
//! form. A malformed selector is a validation error, never a silent
//! empty result.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A parsed import scope selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportScope {
    /// The whole active dataset.
    Full,
    /// Active records whose region tag matches exactly.
    Region { name: String },
    /// Active records whose geometry intersects an axis-aligned envelope
    /// in the canonical CRS.
    Bbox {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

impl ImportScope {
    /// Parse a selector string.
    pub fn parse(selector: &str) -> Result<Self, CoreError> {
        let selector = selector.trim();
        if selector == "full" {
            return Ok(Self::Full);
        }
        if let Some(name) = selector.strip_prefix("region:") {
            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::Validation(
                    "Region scope requires a non-empty region name".into(),
                ));
            }
            return Ok(Self::Region { name: name.into() });
        }
        if let Some(coords) = selector.strip_prefix("bbox:") {
            let parts: Vec<f64> = coords
                .split(',')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    CoreError::Validation(format!(
                        "Bbox scope requires four numeric coordinates, got '{coords}'"
                    ))
                })?;
            if parts.len() != 4 {
                return Err(CoreError::Validation(format!(
                    "Bbox scope requires exactly four coordinates, got {}",
                    parts.len()
                )));
            }
            let (min_x, min_y, max_x, max_y) = (parts[0], parts[1], parts[2], parts[3]);
            if min_x > max_x || min_y > max_y {
                return Err(CoreError::Validation(format!(
                    "Bbox scope has inverted bounds: {min_x},{min_y},{max_x},{max_y}"
                )));
            }
            return Ok(Self::Bbox {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Err(CoreError::Validation(format!(
            "Unknown scope selector '{selector}'; expected 'full', 'region:<name>' or 'bbox:minX,minY,maxX,maxY'"
        )))
    }

    /// Canonical selector text, the storage encoding.
    pub fn to_selector(&self) -> String {
        match self {
            Self::Full => "full".to_string(),
            Self::Region { name } => format!("region:{name}"),
            Self::Bbox {
                min_x,
                min_y,
                max_x,
                max_y,
            } => format!("bbox:{min_x},{min_y},{max_x},{max_y}"),
        }
    }
}

impl std::fmt::Display for ImportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_selector())
    }
}
