use crate::error::GpkgError;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

/// Geometry type of a vector layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// Any geometry (`GEOMETRY` in `gpkg_geometry_columns`).
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Non-spatial table, registered as `attributes`.
    None,
}

impl GeometryType {
    /// Map a numeric WKB geometry code (OGR's numbering, with 100 for "no
    /// geometry") to a geometry type.
    pub fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            7 => Some(Self::GeometryCollection),
            100 => Some(Self::None),
            _ => None,
        }
    }

    pub fn is_spatial(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Scalar type of an attribute field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Real,
    Text,
    Binary,
    /// ISO-8601 date stored as text (`YYYY-MM-DD`).
    Date,
}

/// One attribute column of a vector layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl FieldDescriptor {
    /// A nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// A field declared `NOT NULL`.
    pub fn not_null(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Vector,
    Raster,
}

/// A catalog entry describing one layer of the container.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerDescriptor {
    pub name: String,
    pub kind: LayerKind,
    pub geometry_type: GeometryType,
    /// Name of the geometry column; `None` for non-spatial and raster layers.
    pub geometry_column: Option<String>,
    pub srs_id: i32,
    /// Caller-supplied primary key column. `None` means the hidden
    /// auto-identifier is the feature id.
    pub primary_key: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl LayerDescriptor {
    /// Position of the primary key inside `fields`, if the layer has one.
    pub fn primary_key_index(&self) -> Option<usize> {
        let primary_key = self.primary_key.as_deref()?;
        self.fields.iter().position(|f| f.name == primary_key)
    }
}

/// Bounding box and SRS of a tile pyramid, as stored in `gpkg_tile_matrix_set`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMatrixSet {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Owned dynamic value for feature properties, mirroring SQLite's storage classes.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value_ref = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Real(v) => ValueRef::Real(*v),
            Value::Text(v) => ValueRef::Text(v.as_bytes()),
            Value::Blob(v) => ValueRef::Blob(v),
        };
        Ok(ToSqlOutput::Borrowed(value_ref))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let v = i64::try_from(value)?;
        i32::try_from(v).map_err(|_| GpkgError::ValueOutOfRange { target: "i32" })
    }
}

impl TryFrom<Value> for f64 {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(mismatch("real", &other)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(_) => Err(GpkgError::ValueOutOfRange { target: "bool" }),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = GpkgError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(mismatch("blob", &other)),
        }
    }
}

// `NULL` becomes `None`; other values go through the non-optional conversion.
macro_rules! impl_try_from_value_for_option {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<Value> for Option<$ty> {
                type Error = GpkgError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::Null => Ok(None),
                        other => <$ty>::try_from(other).map(Some),
                    }
                }
            }
        )*
    };
}

impl_try_from_value_for_option!(i64, i32, f64, bool, String, Vec<u8>);

fn mismatch(expected: &'static str, actual: &Value) -> GpkgError {
    GpkgError::ValueConversion {
        expected,
        actual: actual.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryType, Value};
    use crate::error::GpkgError;

    #[test]
    fn converts_null_to_none() -> crate::Result<()> {
        let maybe: Option<i64> = Value::Null.try_into()?;
        assert_eq!(maybe, None);

        let maybe: Option<String> = Value::from("alpha").try_into()?;
        assert_eq!(maybe.as_deref(), Some("alpha"));
        Ok(())
    }

    #[test]
    fn rejects_mismatched_conversion() {
        let err = String::try_from(Value::Integer(3)).expect_err("integer is not text");
        assert!(matches!(
            err,
            GpkgError::ValueConversion {
                expected: "text",
                actual: "integer"
            }
        ));

        let err = bool::try_from(Value::Integer(2)).expect_err("2 is not a bool");
        assert!(matches!(err, GpkgError::ValueOutOfRange { target: "bool" }));
    }

    #[test]
    fn widens_integer_to_real() -> crate::Result<()> {
        let v: f64 = Value::Integer(4).try_into()?;
        assert_eq!(v, 4.0);
        Ok(())
    }

    #[test]
    fn maps_wkb_codes() {
        assert_eq!(GeometryType::from_wkb_code(0), Some(GeometryType::Unknown));
        assert_eq!(GeometryType::from_wkb_code(3), Some(GeometryType::Polygon));
        assert_eq!(GeometryType::from_wkb_code(100), Some(GeometryType::None));
        assert_eq!(GeometryType::from_wkb_code(42), None);
    }
}
