//! New prescription request body

use serde_json::{Map, Value};

use super::lens_options::LensOptions;
use super::Record;

/// Per-eye measurement keys, without the `l_` / `r_` prefix
pub const EYE_MEASUREMENT_FIELDS: [&str; 12] = [
    "without_dv",
    "without_nv",
    "with_dv",
    "with_nv",
    "sphere_dv",
    "cyl_dv",
    "axis_dv",
    "vision_dv",
    "sphere_nv",
    "cyl_nv",
    "axis_nv",
    "vision_nv",
];

/// Distance (DV) and near (NV) vision measurements for one eye.
///
/// Values are opaque and forwarded exactly as received. `None` means the key
/// was absent from the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EyeMeasurements {
    pub without_dv: Option<Value>,
    pub without_nv: Option<Value>,
    pub with_dv: Option<Value>,
    pub with_nv: Option<Value>,
    pub sphere_dv: Option<Value>,
    pub cyl_dv: Option<Value>,
    pub axis_dv: Option<Value>,
    pub vision_dv: Option<Value>,
    pub sphere_nv: Option<Value>,
    pub cyl_nv: Option<Value>,
    pub axis_nv: Option<Value>,
    pub vision_nv: Option<Value>,
}

impl EyeMeasurements {
    fn slot_mut(&mut self, field: &str) -> Option<&mut Option<Value>> {
        let slot = match field {
            "without_dv" => &mut self.without_dv,
            "without_nv" => &mut self.without_nv,
            "with_dv" => &mut self.with_dv,
            "with_nv" => &mut self.with_nv,
            "sphere_dv" => &mut self.sphere_dv,
            "cyl_dv" => &mut self.cyl_dv,
            "axis_dv" => &mut self.axis_dv,
            "vision_dv" => &mut self.vision_dv,
            "sphere_nv" => &mut self.sphere_nv,
            "cyl_nv" => &mut self.cyl_nv,
            "axis_nv" => &mut self.axis_nv,
            "vision_nv" => &mut self.vision_nv,
            _ => return None,
        };
        Some(slot)
    }

    fn entries(&self) -> [(&'static str, &Option<Value>); 12] {
        [
            ("without_dv", &self.without_dv),
            ("without_nv", &self.without_nv),
            ("with_dv", &self.with_dv),
            ("with_nv", &self.with_nv),
            ("sphere_dv", &self.sphere_dv),
            ("cyl_dv", &self.cyl_dv),
            ("axis_dv", &self.axis_dv),
            ("vision_dv", &self.vision_dv),
            ("sphere_nv", &self.sphere_nv),
            ("cyl_nv", &self.cyl_nv),
            ("axis_nv", &self.axis_nv),
            ("vision_nv", &self.vision_nv),
        ]
    }

    /// Collect the measurements stored under `prefix` (e.g. `l_sphere_dv`)
    pub fn from_prefixed(body: &Record, prefix: &str) -> Self {
        let mut eye = Self::default();
        for field in EYE_MEASUREMENT_FIELDS {
            if let (Some(value), Some(slot)) = (body.get(&format!("{}{}", prefix, field)), eye.slot_mut(field)) {
                *slot = Some(value.clone());
            }
        }
        eye
    }

    /// Write the present measurements back under `prefix`
    pub fn write_prefixed(&self, out: &mut Record, prefix: &str) {
        for (field, value) in self.entries() {
            if let Some(value) = value {
                out.insert(format!("{}{}", prefix, field), value.clone());
            }
        }
    }

    /// Number of measurements present in the request
    pub fn present(&self) -> usize {
        self.entries().iter().filter(|(_, v)| v.is_some()).count()
    }
}

/// Flat request body of the add-prescription operation.
///
/// No field-level validation: every value reaches the `add_prescription`
/// procedure as sent. Only the lens option fields are given a typed shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPrescription {
    pub patient_id: Option<Value>,
    pub doctor_id: Option<Value>,
    pub left: EyeMeasurements,
    pub right: EyeMeasurements,
    pub ipd: Option<Value>,
    pub remarks: Option<Value>,
    pub bifocal_options: Option<LensOptions>,
    pub colour_options: Option<LensOptions>,
}

impl NewPrescription {
    /// Build from the request body. Unknown keys are ignored.
    pub fn from_body(body: &Record) -> Result<Self, String> {
        Ok(Self {
            patient_id: body.get("p_id").cloned(),
            doctor_id: body.get("d_id").cloned(),
            left: EyeMeasurements::from_prefixed(body, "l_"),
            right: EyeMeasurements::from_prefixed(body, "r_"),
            ipd: body.get("p_ipd").cloned(),
            remarks: body.get("p_remarks").cloned(),
            bifocal_options: lens_options(body, "bifocalOptions")?,
            colour_options: lens_options(body, "p_colour")?,
        })
    }

    /// Arguments of the `add_prescription` procedure
    pub fn to_rpc_params(&self) -> Record {
        let mut params = Map::new();
        insert_present(&mut params, "p_id", &self.patient_id);
        insert_present(&mut params, "d_id", &self.doctor_id);
        self.left.write_prefixed(&mut params, "l_");
        self.right.write_prefixed(&mut params, "r_");
        insert_present(&mut params, "p_ipd", &self.ipd);
        if let Some(options) = &self.bifocal_options {
            params.insert("p_bifocal".to_string(), Value::String(options.encode()));
        }
        if let Some(options) = &self.colour_options {
            params.insert("p_colour".to_string(), Value::String(options.encode()));
        }
        insert_present(&mut params, "p_remarks", &self.remarks);
        params
    }
}

// Explicit null is treated like an absent selection
fn lens_options(body: &Record, field: &str) -> Result<Option<LensOptions>, String> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => LensOptions::from_value(field, value).map(Some),
    }
}

fn insert_present(params: &mut Record, key: &str, value: &Option<Value>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.clone());
    }
}
