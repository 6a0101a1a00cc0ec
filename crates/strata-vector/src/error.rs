use thiserror::Error;

use crate::feature::GeometryClass;

#[derive(Debug, Error)]
pub enum VectorError {
    /// A style property names a field the layer does not have.
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` value {value} is not {expected}")]
    BadValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// Feature geometry does not fit the layer's object kind.
    #[error("feature {index} has {found:?} geometry, object kind needs {expected:?}")]
    GeometryMismatch {
        index: usize,
        found: GeometryClass,
        expected: GeometryClass,
    },
}
