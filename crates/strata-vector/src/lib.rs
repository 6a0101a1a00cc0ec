//! Vector layers: features, object kinds, and paginated feature blocks.

mod builder;
mod error;
mod feature;
mod object;

pub use builder::{VectorBlock, VectorLayerBuilder, VectorLayerInput, VectorTask};
pub use error::VectorError;
pub use feature::{
    AltitudeMode, ColorValue, DEFAULT_COLOR, Feature, FeatureGeometry, GeometryClass, PropertyValue,
    VectorLayer,
};
pub use object::{
    FeaturePayload, GeometryFn, GeometryPayload, MaterialFn, ObjectHandlers, ObjectKind, ObjectStyle,
    Placement,
};
