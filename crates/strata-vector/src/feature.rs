//! Feature model: geometry in map coordinates plus attribute values.

use glam::DVec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_mesh::PolygonZ;

use crate::error::VectorError;
use crate::object::ObjectStyle;

/// Broad geometry type an object kind accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryClass {
    Point,
    Line,
    Polygon,
}

/// Feature geometry, already in the working coordinate system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureGeometry {
    Points(Vec<DVec3>),
    Lines(Vec<Vec<DVec3>>),
    Polygons(Vec<PolygonZ>),
}

impl FeatureGeometry {
    pub fn class(&self) -> GeometryClass {
        match self {
            Self::Points(_) => GeometryClass::Point,
            Self::Lines(_) => GeometryClass::Line,
            Self::Polygons(_) => GeometryClass::Polygon,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Points(p) => p.is_empty(),
            Self::Lines(l) => l.iter().all(Vec::is_empty),
            Self::Polygons(p) => p.iter().all(PolygonZ::is_degenerate),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    /// Attribute values in the layer's field order.
    #[serde(default)]
    pub attributes: Vec<Value>,
}

impl Feature {
    pub fn new(geometry: FeatureGeometry) -> Self {
        Self {
            geometry,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// One vector layer as handed over by the host: field names, style and the
/// features in source order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<String>,
    pub style: ObjectStyle,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// How feature elevations are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeMode {
    /// Feature z plus the altitude property.
    #[default]
    Absolute,
    /// DEM surface height plus the altitude property.
    RelativeToDem,
}

/// A numeric style property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    Constant(f64),
    /// Read from the named attribute.
    Field(String),
}

impl Default for PropertyValue {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl PropertyValue {
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Constant(_) => None,
            Self::Field(name) => Some(name),
        }
    }

    pub(crate) fn resolve(&self, fields: &FxHashMap<String, usize>, feature: &Feature) -> Result<f64, VectorError> {
        match self {
            Self::Constant(v) => Ok(*v),
            Self::Field(name) => {
                let value = attribute(fields, feature, name)?;
                match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| bad_value(name, value, "a number"))
            }
        }
    }
}

/// A color style property, `0xRRGGBB`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorValue {
    Constant(u32),
    /// Read from the named attribute: an integer, or a `#rrggbb` string.
    Field(String),
}

/// Color of features whose color attribute cannot be read.
pub const DEFAULT_COLOR: u32 = 0xffffff;

impl Default for ColorValue {
    fn default() -> Self {
        Self::Constant(DEFAULT_COLOR)
    }
}

impl ColorValue {
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Constant(_) => None,
            Self::Field(name) => Some(name),
        }
    }

    pub(crate) fn resolve(&self, fields: &FxHashMap<String, usize>, feature: &Feature) -> Result<u32, VectorError> {
        match self {
            Self::Constant(c) => Ok(*c),
            Self::Field(name) => {
                let value = attribute(fields, feature, name)?;
                match value {
                    Value::Number(n) => n.as_u64().and_then(|c| u32::try_from(c).ok()),
                    Value::String(s) => parse_hex_color(s),
                    _ => None,
                }
                .filter(|c| *c <= 0xffffff)
                .ok_or_else(|| bad_value(name, value, "a color"))
            }
        }
    }
}

fn attribute<'f>(fields: &FxHashMap<String, usize>, feature: &'f Feature, name: &str) -> Result<&'f Value, VectorError> {
    let index = *fields
        .get(name)
        .ok_or_else(|| VectorError::UnknownField(name.to_string()))?;
    Ok(feature.attributes.get(index).unwrap_or(&Value::Null))
}

fn bad_value(field: &str, value: &Value, expected: &'static str) -> VectorError {
    VectorError::BadValue {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_hex_color(s: &str) -> Option<u32> {
    let s = s.trim();
    let hex = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))?;
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields() -> FxHashMap<String, usize> {
        [("height".to_string(), 0), ("color".to_string(), 1)].into_iter().collect()
    }

    fn feature(attributes: Vec<Value>) -> Feature {
        Feature::new(FeatureGeometry::Points(vec![DVec3::ZERO])).with_attributes(attributes)
    }

    #[test]
    fn test_property_constant_and_field() {
        let f = feature(vec![json!(12.5), json!("#ff8000")]);
        assert_eq!(PropertyValue::Constant(3.0).resolve(&fields(), &f).unwrap(), 3.0);
        assert_eq!(PropertyValue::Field("height".into()).resolve(&fields(), &f).unwrap(), 12.5);
    }

    #[test]
    fn test_property_numeric_string() {
        let f = feature(vec![json!(" 7 "), json!(null)]);
        assert_eq!(PropertyValue::Field("height".into()).resolve(&fields(), &f).unwrap(), 7.0);
    }

    #[test]
    fn test_property_errors() {
        let f = feature(vec![json!(true)]);
        assert!(matches!(
            PropertyValue::Field("height".into()).resolve(&fields(), &f),
            Err(VectorError::BadValue { .. })
        ));
        assert!(matches!(
            PropertyValue::Field("missing".into()).resolve(&fields(), &f),
            Err(VectorError::UnknownField(_))
        ));
    }

    #[test]
    fn test_color_from_hex_string_and_number() {
        let f = feature(vec![json!(0), json!("#ff8000")]);
        assert_eq!(ColorValue::Field("color".into()).resolve(&fields(), &f).unwrap(), 0xff8000);
        let f = feature(vec![json!(0), json!(255)]);
        assert_eq!(ColorValue::Field("color".into()).resolve(&fields(), &f).unwrap(), 0xff);
        let f = feature(vec![json!(0), json!("orange")]);
        assert!(ColorValue::Field("color".into()).resolve(&fields(), &f).is_err());
    }

    #[test]
    fn test_geometry_wire_names() {
        let g = FeatureGeometry::Points(vec![DVec3::new(1.0, 2.0, 3.0)]);
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json, json!({"points": [[1.0, 2.0, 3.0]]}));
        let back: FeatureGeometry = serde_json::from_value(json).unwrap();
        assert_eq!(back.class(), GeometryClass::Point);
    }
}
