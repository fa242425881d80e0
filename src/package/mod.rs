//! Typed package description.
//!
//! [`PackageSpec::from_params`] reads every dimension the synthesizer needs
//! out of a [`ParamSet`], applies defaults, and rejects inconsistent
//! combinations up front. Everything downstream works from this value and
//! never looks at raw parameters again.

mod pins;

pub use pins::{EpKind, LeadKind, PinEntry, PinSide};

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::error::{SynthError, SynthResult};
use crate::kernel::Color;
use crate::params::{ParamSet, DEFAULT_COLOR_BODY, DEFAULT_COLOR_PIN1_MARK, DEFAULT_COLOR_PINS};

/// Smallest standoff allowed when pins and body share the seating plane.
/// Keeps pin and body faces in distinct planes so fused faces can be
/// attributed.
pub const TINY_DELTA_FOR_QFN: f64 = 0.000_001;

/// Component type whose small body faces must not be mistaken for pins.
pub const PROVENANCE_EXEMPT_COMP_TYPE: &str = "chipResistor";

/// Size and pin-count part of a model name: the first digit onwards.
static SIZE_PART: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Strips the size/pin-count part of a model name.
fn family_prefix(model_name: &str) -> SynthResult<String> {
    match SIZE_PART.get_or_init(|| Regex::new(r"[0-9]+.*")) {
        Ok(re) => Ok(re.replace(model_name, "").into_owned()),
        Err(e) => Err(SynthError::configuration(format!(
            "model name '{model_name}': family pattern is invalid: {e}"
        ))),
    }
}

/// Package family, taken from the model name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FootprintFamily {
    /// Small-outline IC.
    Soic,
    /// Small-outline package.
    Sop,
    /// Small-outline transistor.
    Sot,
    /// Quad flat package.
    Qfp,
    /// Quad flat no-lead.
    Qfn,
    /// Anything else.
    Other(String),
}

impl FootprintFamily {
    /// Classifies a model name such as `SOIC127P600X175-8N`: everything from
    /// the first digit on is dropped.
    ///
    /// # Errors
    ///
    /// [`SynthError::Configuration`] if the family pattern cannot be built.
    pub fn from_model_name(name: &str) -> SynthResult<Self> {
        Ok(match family_prefix(name)?.as_str() {
            "SOIC" => Self::Soic,
            "SOP" => Self::Sop,
            "SOT" => Self::Sot,
            "QFP" => Self::Qfp,
            "QFN" => Self::Qfn,
            other => Self::Other(other.to_string()),
        })
    }

    /// The lead shape this family uses, `None` for unsupported families.
    #[must_use]
    pub const fn lead_kind(&self) -> Option<LeadKind> {
        match self {
            Self::Soic | Self::Sop | Self::Sot | Self::Qfp => Some(LeadKind::Gullwing),
            Self::Qfn => Some(LeadKind::Qfn),
            Self::Other(_) => None,
        }
    }

    /// Returns `true` for gullwing families.
    #[must_use]
    pub const fn is_gullwing(&self) -> bool {
        matches!(self.lead_kind(), Some(LeadKind::Gullwing))
    }
}

impl fmt::Display for FootprintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Soic => "SOIC",
            Self::Sop => "SOP",
            Self::Sot => "SOT",
            Self::Qfp => "QFP",
            Self::Qfn => "QFN",
            Self::Other(s) => s,
        })
    }
}

/// Body dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDims {
    /// Body width across the East/West pins (X).
    pub a: f64,
    /// Body length along the pin rows (Y).
    pub b: f64,
    /// Overall height.
    pub h: f64,
    /// Standoff as configured.
    pub k: f64,
    /// Mold draft angle in degrees.
    pub ma_deg: f64,
    /// Upper pivot height.
    pub hpph: f64,
    /// Lower pivot height.
    pub hppl: f64,
    /// Fillet radius on top and bottom body edges.
    pub fillet_radius: f64,
    /// Pin-1 long-edge chamfer offset, zero when absent.
    pub chamfer_offset: f64,
}

impl BodyDims {
    /// Mold angle in radians.
    #[must_use]
    pub fn mold_angle(&self) -> f64 {
        self.ma_deg.to_radians()
    }

    /// Horizontal inset of the top face caused by the draft.
    #[must_use]
    pub fn mold_offset(&self) -> f64 {
        (self.h - self.hpph) * self.mold_angle().tan()
    }
}

/// Pin-1 marker dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDims {
    /// Distance from the body edge round to the recess.
    pub offset: f64,
    /// Recess radius.
    pub radius: f64,
    /// Recess depth.
    pub indent: f64,
    /// Height of the ink cylinder.
    pub height: f64,
}

/// Lead dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PinDims {
    /// Pin tip to pin tip.
    pub l: f64,
    /// Lead width.
    pub w: f64,
    /// Landing length.
    pub t: f64,
    /// Lead thickness.
    pub tp: f64,
    /// Outer bend radius.
    pub fr: f64,
    /// Height of the lead centreline where it enters the body (gullwing).
    pub hpe: f64,
    /// QFN pads with rounded inner ends.
    pub d_shape: bool,
}

/// Exposed pad dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct EpDims {
    /// Extent in Y.
    pub tt: f64,
    /// Extent in X.
    pub wt: f64,
    /// Straight pin-1 chamfer size.
    pub ft: f64,
    /// Corner radius.
    pub rt: f64,
    /// Rounded pin-1 chamfer radius.
    pub pin1_chamfer_radius: f64,
}

impl EpDims {
    /// Returns `true` when either pin-1 chamfer style is configured.
    #[must_use]
    pub fn has_pin1_chamfer(&self) -> bool {
        self.ft > 0.0 || self.pin1_chamfer_radius > 0.0
    }

    /// Rejects a pad that asks for both chamfer styles.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`].
    pub fn validate(&self, label: &str) -> SynthResult<()> {
        if self.ft > 0.0 && self.pin1_chamfer_radius > 0.0 {
            return Err(SynthError::configuration(format!(
                "exposed pad {label}: Ft ({}) and epPin1ChamferRadius ({}) are mutually exclusive",
                self.ft, self.pin1_chamfer_radius
            )));
        }
        Ok(())
    }

    fn read(params: &ParamSet, prefix: &str) -> SynthResult<Self> {
        let key = |name: &str| format!("{prefix}{name}");
        let dims = Self {
            tt: params.number(&key("Tt"))?,
            wt: params.number(&key("Wt"))?,
            ft: params.number_or(&key("Ft"), 0.0)?,
            rt: params.number_or(&key("Rt"), 0.0)?,
            pin1_chamfer_radius: params.number_or(&key("epPin1ChamferRadius"), 0.0)?,
        };
        let label = if prefix.is_empty() { "Ep" } else { prefix.trim_end_matches('_') };
        for (name, value) in [
            ("Tt", dims.tt),
            ("Wt", dims.wt),
            ("Ft", dims.ft),
            ("Rt", dims.rt),
            ("epPin1ChamferRadius", dims.pin1_chamfer_radius),
        ] {
            non_negative(&format!("{prefix}{name}"), value)?;
        }
        if dims.tt <= 0.0 || dims.wt <= 0.0 {
            return Err(SynthError::configuration(format!(
                "exposed pad {label}: Tt and Wt must be positive"
            )));
        }
        dims.validate(label)?;
        Ok(dims)
    }
}

/// Render colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackageColors {
    /// Pins and exposed pads.
    pub pins: Color,
    /// Body.
    pub body: Color,
    /// Pin-1 marker ink.
    pub pin1_mark: Color,
}

/// Object names used in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNames {
    /// Body object.
    pub body: String,
    /// Pin-1 marker ink object.
    pub pin1_mark: String,
    /// East pin template.
    pub pin_template: String,
}

/// Validated description of one package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    /// Model name, also the name of the fused object.
    pub model_name: String,
    /// Family derived from the model name.
    pub family: FootprintFamily,
    /// Body dimensions.
    pub body: BodyDims,
    /// Marker dimensions.
    pub marker: MarkerDims,
    /// Lead dimensions.
    pub pin: PinDims,
    /// Unprefixed exposed pad dimensions, when `Tt` is present.
    pub ep: Option<EpDims>,
    /// Per-type exposed pad dimensions, keyed by type name.
    pub ep_types: IndexMap<String, EpDims>,
    /// Render colors.
    pub colors: PackageColors,
    /// Document object names.
    pub names: ObjectNames,
    /// Skip the "small face is a pin" fallback during coloring.
    pub provenance_exempt: bool,
    /// Pin entries sorted by pin name.
    pub pins: Vec<(String, PinEntry)>,
}

fn non_negative(key: &str, value: f64) -> SynthResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SynthError::configuration(format!(
            "parameter '{key}' must be a finite non-negative number, got {value}"
        )))
    }
}

fn required(params: &ParamSet, key: &str) -> SynthResult<f64> {
    non_negative(key, params.number(key)?)
}

fn optional(params: &ParamSet, key: &str, default: f64) -> SynthResult<f64> {
    non_negative(key, params.number_or(key, default)?)
}

fn color(params: &ParamSet, key: &str, default: [f64; 3]) -> SynthResult<Color> {
    Ok(Color::from_triple(params.triple_or(key, default)?))
}

impl PackageSpec {
    /// Builds and validates a package description.
    ///
    /// # Errors
    ///
    /// - [`SynthError::Params`] for missing or mistyped keys.
    /// - [`SynthError::Configuration`] for out-of-range or contradictory
    ///   dimensions and malformed pin descriptions.
    /// - [`SynthError::UnsupportedFamily`] for unknown pin kinds or sides.
    pub fn from_params(params: &ParamSet) -> SynthResult<Self> {
        let model_name = params.text("newModelName")?.to_string();
        let family = FootprintFamily::from_model_name(&model_name)?;

        let ma_deg = optional(params, "maDeg", 0.0)?;
        if ma_deg >= 90.0 {
            return Err(SynthError::configuration(format!(
                "mold angle maDeg must be below 90 degrees, got {ma_deg}"
            )));
        }
        let h = required(params, "H")?;
        let k = required(params, "K")?;
        let pivots_required = ma_deg > 0.0 || family.is_gullwing();
        let (hpph, hppl) = if pivots_required {
            (required(params, "Hpph")?, required(params, "Hppl")?)
        } else {
            (optional(params, "Hpph", h)?, optional(params, "Hppl", k)?)
        };
        let body = BodyDims {
            a: required(params, "A")?,
            b: required(params, "B")?,
            h,
            k,
            ma_deg,
            hpph,
            hppl,
            fillet_radius: optional(params, "Frbody", 0.0)?,
            chamfer_offset: if family == FootprintFamily::Soic {
                optional(params, "P1chamferOffset", 0.0)?
            } else {
                0.0
            },
        };

        let marker = MarkerDims {
            offset: required(params, "P1markOffset")?,
            radius: required(params, "P1markRadius")?,
            indent: required(params, "P1markIndent")?,
            height: required(params, "markHeight")?,
        };

        let pin = PinDims {
            l: required(params, "L")?,
            w: required(params, "W")?,
            t: required(params, "T")?,
            tp: required(params, "Tp")?,
            fr: optional(params, "Fr", 0.0)?,
            hpe: if family.is_gullwing() {
                required(params, "Hpe")?
            } else {
                optional(params, "Hpe", 0.0)?
            },
            d_shape: params.flag("hasDshapePads")?,
        };

        let ep = if params.contains("Tt") {
            Some(EpDims::read(params, "")?)
        } else {
            None
        };

        let mut pins = Vec::new();
        let mut ep_types = IndexMap::new();
        for name in params.pin_names() {
            let entry = PinEntry::parse(params.text(name)?)?;
            if let PinEntry::Pad { kind, .. } = &entry {
                match kind {
                    EpKind::Default if ep.is_none() => {
                        return Err(SynthError::configuration(format!(
                            "{name} is an exposed pad but Tt/Wt are not set"
                        )));
                    }
                    EpKind::Default => {}
                    EpKind::Typed(t) => {
                        if !ep_types.contains_key(t) {
                            ep_types.insert(t.clone(), EpDims::read(params, &format!("{t}_"))?);
                        }
                    }
                }
            }
            pins.push((name.to_string(), entry));
        }

        let spec = Self {
            model_name,
            family,
            body,
            marker,
            pin,
            ep,
            ep_types,
            colors: PackageColors {
                pins: color(params, "colorPins", DEFAULT_COLOR_PINS)?,
                body: color(params, "colorBody", DEFAULT_COLOR_BODY)?,
                pin1_mark: color(params, "colorPin1Mark", DEFAULT_COLOR_PIN1_MARK)?,
            },
            names: ObjectNames {
                body: params.text_opt("bodyName")?.unwrap_or("Body").to_string(),
                pin1_mark: params
                    .text_opt("pin1MarkName")?
                    .unwrap_or("Pin1Mark")
                    .to_string(),
                pin_template: params
                    .text_opt("pinName")?
                    .unwrap_or("PinTemplate")
                    .to_string(),
            },
            provenance_exempt: params.text_opt("compType")? == Some(PROVENANCE_EXEMPT_COMP_TYPE),
            pins,
        };
        spec.validate()?;
        debug!(
            model = %spec.model_name,
            family = %spec.family,
            pins = spec.pins.len(),
            has_ep = spec.has_ep(),
            "Loaded package description"
        );
        Ok(spec)
    }

    fn validate(&self) -> SynthResult<()> {
        let b = &self.body;
        if b.a <= 0.0 || b.b <= 0.0 {
            return Err(SynthError::configuration("body dimensions A and B must be positive"));
        }
        if b.h <= b.k {
            return Err(SynthError::configuration(format!(
                "body height H ({}) must exceed standoff K ({})",
                b.h, b.k
            )));
        }
        if !(b.hppl <= b.hpph && b.hpph <= b.h) {
            return Err(SynthError::configuration(format!(
                "pivot heights must satisfy Hppl <= Hpph <= H, got Hppl={} Hpph={} H={}",
                b.hppl, b.hpph, b.h
            )));
        }
        let half = b.a.min(b.b) / 2.0;
        if b.mold_offset() > half {
            return Err(SynthError::configuration(format!(
                "mold offset {} exceeds half the body size ({half})",
                b.mold_offset()
            )));
        }
        if self.marker.radius <= 0.0 || self.marker.height <= 0.0 {
            return Err(SynthError::configuration(
                "pin-1 marker radius and height must be positive",
            ));
        }
        if self.family.is_gullwing() && self.pin.hpe < b.hppl {
            return Err(SynthError::configuration(format!(
                "pin entry height Hpe ({}) is below the lower pivot height Hppl ({})",
                self.pin.hpe, b.hppl
            )));
        }
        Ok(())
    }

    /// Returns `true` when the package has any exposed pad dimensions.
    #[must_use]
    pub fn has_ep(&self) -> bool {
        self.ep.is_some() || !self.ep_types.is_empty()
    }

    /// Effective standoff: `K`, raised to [`TINY_DELTA_FOR_QFN`] for packages
    /// whose pads share the seating plane with the body.
    #[must_use]
    pub fn standoff(&self) -> f64 {
        if self.has_ep() || self.family == FootprintFamily::Qfn {
            self.body.k.max(TINY_DELTA_FOR_QFN)
        } else {
            self.body.k
        }
    }

    /// Dimensions for an exposed pad of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] when the kind has no dimensions.
    pub fn ep_dims(&self, kind: &EpKind) -> SynthResult<&EpDims> {
        match kind {
            EpKind::Default => self.ep.as_ref(),
            EpKind::Typed(t) => self.ep_types.get(t),
        }
        .ok_or_else(|| SynthError::configuration(format!("no dimensions for exposed pad {kind:?}")))
    }
}
