//! Pin entry parsing.
//!
//! Every `Pin<n>` parameter holds a four-field description
//! `"kind,side,x,y"`:
//!
//! ```text
//! Pin1  = 'Gullwing,West,0,1.905'
//! Pin17 = 'QFN,North,-0.25,0'
//! Pin33 = 'Ep,Ep,0,0'
//! Pin34 = 'Type2,Ep,1.1,0'
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{SynthError, SynthResult};

/// Lead shape of a perimeter pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadKind {
    /// Bent gullwing lead.
    Gullwing,
    /// Flat leadless pad.
    Qfn,
}

impl fmt::Display for LeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gullwing => "Gullwing",
            Self::Qfn => "QFN",
        })
    }
}

/// Body side a lead exits from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSide {
    /// +Y.
    North,
    /// -Y.
    South,
    /// +X.
    East,
    /// -X.
    West,
}

impl PinSide {
    /// Returns `true` for North and South.
    #[must_use]
    pub const fn is_north_south(self) -> bool {
        matches!(self, Self::North | Self::South)
    }
}

impl FromStr for PinSide {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "North" => Ok(Self::North),
            "South" => Ok(Self::South),
            "East" => Ok(Self::East),
            "West" => Ok(Self::West),
            other => Err(SynthError::unsupported("pin side", other)),
        }
    }
}

/// Which parameter namespace an exposed pad reads its dimensions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpKind {
    /// Unprefixed `Tt`, `Wt`, ... keys.
    Default,
    /// `<name>_Tt`, `<name>_Wt`, ... keys.
    Typed(String),
}

/// One parsed pin description.
#[derive(Debug, Clone, PartialEq)]
pub enum PinEntry {
    /// A perimeter lead copied from a template.
    Lead {
        /// Lead shape.
        kind: LeadKind,
        /// Exit side.
        side: PinSide,
        /// X position (ignored for East/West).
        x: f64,
        /// Y position (ignored for North/South).
        y: f64,
    },
    /// An exposed pad under the body.
    Pad {
        /// Dimension namespace.
        kind: EpKind,
        /// Pad centre X.
        x: f64,
        /// Pad centre Y.
        y: f64,
    },
}

fn is_ep_kind(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("ep") || kind.starts_with("Type")
}

fn coordinate(field: &str, what: &str, text: &str) -> SynthResult<f64> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SynthError::configuration(format!(
            "pin description '{text}': {what} coordinate '{field}' is not a finite number"
        ))),
    }
}

impl PinEntry {
    /// Parses a `"kind,side,x,y"` description.
    ///
    /// # Errors
    ///
    /// - [`SynthError::Configuration`] for a field count other than four,
    ///   a lead kind on the `Ep` side, a pad kind on a lead side, or a bad
    ///   coordinate.
    /// - [`SynthError::UnsupportedFamily`] for an unknown kind or side.
    pub fn parse(text: &str) -> SynthResult<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let [kind, side, x, y] = fields.as_slice() else {
            return Err(SynthError::configuration(format!(
                "expected 4 fields in pin description '{text}', found {}",
                fields.len()
            )));
        };

        let lead = match *kind {
            "Gullwing" => Some(LeadKind::Gullwing),
            "QFN" => Some(LeadKind::Qfn),
            _ => None,
        };

        match (lead, *side) {
            (Some(_), "Ep") => Err(SynthError::configuration(format!(
                "pin description '{text}': lead kind '{kind}' cannot sit on the Ep side"
            ))),
            (Some(kind), side) => Ok(Self::Lead {
                kind,
                side: side.parse()?,
                x: coordinate(x, "x", text)?,
                y: coordinate(y, "y", text)?,
            }),
            (None, "Ep") => Ok(Self::Pad {
                kind: if kind.starts_with("Type") {
                    EpKind::Typed((*kind).to_string())
                } else {
                    EpKind::Default
                },
                x: coordinate(x, "x", text)?,
                y: coordinate(y, "y", text)?,
            }),
            (None, _) if is_ep_kind(kind) => Err(SynthError::configuration(format!(
                "pin description '{text}': pad kind '{kind}' requires the Ep side"
            ))),
            (None, _) => Err(SynthError::unsupported("pin kind", *kind)),
        }
    }
}
