use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Flat set of named numeric engineering parameters (e.g. `Fc`, `Pd`, `Hz`).
pub type CalculationParams = BTreeMap<String, f64>;

/// Footing kinds supported by the remote calculation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Footing {
    /// Combined footing under an exterior and an interior column
    Combined,
    /// Square isolated footing
    IsolatedSquare,
    /// Corner footing
    Corner,
    /// Eccentric combined footing tied with a strap beam
    CombinedWithTieBeam,
}

impl Footing {
    pub const ALL: [Footing; 4] = [
        Footing::Combined,
        Footing::IsolatedSquare,
        Footing::Corner,
        Footing::CombinedWithTieBeam,
    ];

    /// Endpoint path relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Footing::Combined => "/zapata-combinada",
            Footing::IsolatedSquare => "/zapata-cuadrada-aislada",
            Footing::Corner => "/zapata-esquinera",
            Footing::CombinedWithTieBeam => "/zapata-combinada-amarre",
        }
    }

    /// Whether the endpoint expects the parameters nested under `model`.
    pub fn wraps_model(&self) -> bool {
        matches!(self, Footing::Combined | Footing::CombinedWithTieBeam)
    }

    /// Short name used on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Footing::Combined => "combined",
            Footing::IsolatedSquare => "isolated",
            Footing::Corner => "corner",
            Footing::CombinedWithTieBeam => "tie-beam",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Footing::Combined => "Combined footing",
            Footing::IsolatedSquare => "Isolated square footing",
            Footing::Corner => "Corner footing",
            Footing::CombinedWithTieBeam => "Eccentric footing with tie beam",
        }
    }

    /// Starting values the input forms are pre-filled with.
    pub fn default_params(&self) -> CalculationParams {
        let pairs: &[(&str, f64)] = match self {
            Footing::Combined => &[
                ("Fc", 210.0),
                ("Fy", 4200.0),
                ("Wc", 24.0),
                ("Qa", 23.3),
                ("Ds", 1.13),
                ("Hz", 0.7),
                ("Lz", 5.0),
                ("PdExt", 46.05),
                ("PlExt", 9.21),
                ("CxExt", 0.3),
                ("CyExt", 0.4),
                ("PdInt", 85.52),
                ("PlInt", 17.105),
                ("CxInt", 0.4),
                ("CyInt", 0.4),
            ],
            Footing::IsolatedSquare => &[
                ("Fc", 3000.0),
                ("Fy", 60000.0),
                ("Pd", 889.6),
                ("Pl", 711.7),
                ("Cx", 0.45),
                ("Cy", 0.45),
                ("Hz", 0.6),
                ("Ds", 0.924),
                ("Ws", 15.71),
                ("Wc", 24.0),
                ("Qa", 239.4),
                ("Rc", 7.5),
                ("Az", 5.0),
            ],
            Footing::Corner => &[
                ("Fc", 3000.0),
                ("Fy", 60000.0),
                ("Pd", 400.0),
                ("Pl", 180.0),
                ("Cx", 0.45),
                ("Cy", 0.45),
                ("Hz", 0.6),
                ("Ds", 0.924),
                ("Ws", 15.71),
                ("Wc", 24.0),
                ("Qa", 239.4),
                ("Rc", 7.5),
                ("Az", 5.0),
            ],
            Footing::CombinedWithTieBeam => &[
                ("Fc", 210.0),
                ("Fy", 4200.0),
                ("Qa", 23.3),
                ("Hz", 60.0),
                ("Lz", 5.0),
                ("Av", 40.0),
                ("Hv", 60.0),
                ("PuExt", 70.0),
                ("CxExt", 30.0),
                ("CyExt", 40.0),
                ("PuInt", 130.0),
                ("CxInt", 40.0),
                ("CyInt", 40.0),
                ("ramas", 2.0),
            ],
        };
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Rebar selections the form sends alongside the numeric parameters.
    pub fn default_bars(&self) -> BarSelections {
        match self {
            Footing::CombinedWithTieBeam => BarSlot::ALL
                .into_iter()
                .filter_map(|slot| Some((slot, rebar(slot.default_designation())?)))
                .collect(),
            _ => BarSelections::new(),
        }
    }

    /// Whether the form has rebar selections at all.
    pub fn uses_bars(&self) -> bool {
        matches!(self, Footing::CombinedWithTieBeam)
    }
}

impl fmt::Display for Footing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Footing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Footing::ALL
            .into_iter()
            .find(|f| f.slug() == lower || f.endpoint().trim_start_matches('/') == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Footing::ALL.iter().map(|f| f.slug()).collect();
                format!("Unknown footing '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

// ============================================================================
// Rebar selections
// ============================================================================

/// Reinforcing bar size: nominal designation in inches and area in cm².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rebar {
    pub designation: &'static str,
    pub area_cm2: f64,
}

/// Bar sizes offered by the selection lists.
pub const REBARS: [Rebar; 10] = [
    Rebar { designation: "1/4", area_cm2: 0.32 },
    Rebar { designation: "3/8", area_cm2: 0.71 },
    Rebar { designation: "1/2", area_cm2: 1.29 },
    Rebar { designation: "5/8", area_cm2: 1.99 },
    Rebar { designation: "3/4", area_cm2: 2.84 },
    Rebar { designation: "7/8", area_cm2: 3.87 },
    Rebar { designation: "1", area_cm2: 5.10 },
    Rebar { designation: "1 1/8", area_cm2: 6.45 },
    Rebar { designation: "1 1/4", area_cm2: 8.19 },
    Rebar { designation: "1 3/8", area_cm2: 10.06 },
];

/// Look up a bar by designation (`5/8`, `5/8"` and `#5/8` all match).
pub fn rebar(designation: &str) -> Option<Rebar> {
    let wanted = designation
        .trim()
        .trim_start_matches('#')
        .trim_end_matches('"')
        .trim();
    REBARS.into_iter().find(|r| r.designation == wanted)
}

/// Named rebar inputs of the tie-beam form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BarSlot {
    /// Longitudinal bars of the tie beam
    BeamBars,
    /// Exterior footing, long direction
    ExteriorLong,
    /// Exterior footing, short direction
    ExteriorShort,
    /// Interior footing
    Interior,
    /// Tie beam bar number
    BeamBarNumber,
}

impl BarSlot {
    pub const ALL: [BarSlot; 5] = [
        BarSlot::BeamBars,
        BarSlot::ExteriorLong,
        BarSlot::ExteriorShort,
        BarSlot::Interior,
        BarSlot::BeamBarNumber,
    ];

    /// Field name in the request body.
    pub fn key(&self) -> &'static str {
        match self {
            BarSlot::BeamBars => "Nbarras",
            BarSlot::ExteriorLong => "zapataExtLarga",
            BarSlot::ExteriorShort => "zapataExtCorta",
            BarSlot::Interior => "zapataInt",
            BarSlot::BeamBarNumber => "vgNroBarra",
        }
    }

    fn default_designation(&self) -> &'static str {
        match self {
            BarSlot::BeamBars => "1/2",
            BarSlot::ExteriorLong | BarSlot::Interior => "5/8",
            BarSlot::ExteriorShort => "7/8",
            BarSlot::BeamBarNumber => "3/4",
        }
    }

    /// The short-direction list is keyed `{area, Nomen}`, the others
    /// `{data, item}`.
    pub fn encode(&self, bar: &Rebar) -> Value {
        match self {
            BarSlot::ExteriorShort => json!({ "area": bar.area_cm2, "Nomen": bar.designation }),
            _ => json!({ "data": bar.area_cm2, "item": bar.designation }),
        }
    }
}

impl FromStr for BarSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BarSlot::ALL
            .into_iter()
            .find(|slot| slot.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let keys: Vec<&str> = BarSlot::ALL.iter().map(|slot| slot.key()).collect();
                format!("Unknown bar field '{}' (expected one of: {})", s, keys.join(", "))
            })
    }
}

pub type BarSelections = BTreeMap<BarSlot, Rebar>;

// ============================================================================
// Requests
// ============================================================================

/// Everything a calculation endpoint receives: numeric parameters plus, for
/// the tie-beam footing, the rebar selections.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub footing: Footing,
    pub params: CalculationParams,
    pub bars: BarSelections,
}

impl CalculationRequest {
    /// Request pre-filled with the form's starting values.
    pub fn with_defaults(footing: Footing) -> Self {
        Self {
            footing,
            params: footing.default_params(),
            bars: footing.default_bars(),
        }
    }

    /// JSON body sent to the endpoint.
    pub fn body(&self) -> Value {
        let mut model = Map::new();
        for (key, value) in &self.params {
            model.insert(key.clone(), json!(value));
        }
        for (slot, bar) in &self.bars {
            model.insert(slot.key().to_string(), slot.encode(bar));
        }
        if self.footing.wraps_model() {
            json!({ "model": model })
        } else {
            Value::Object(model)
        }
    }
}

/// Body returned by every calculation endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub response: Value,
    #[serde(rename = "responseGrafica", default, skip_serializing_if = "Option::is_none")]
    pub response_chart: Option<Value>,
}

impl CalculationResponse {
    /// The server flags failed calculations with any truthy `error` value.
    pub fn is_error(&self) -> bool {
        match &self.error {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}
