use crate::error::GpkgError;
use crate::types::{FieldType, GeometryType};

/// Geometry type name as stored in `gpkg_geometry_columns.geometry_type_name`.
#[inline]
pub(crate) fn geometry_type_to_str(geometry_type: GeometryType) -> &'static str {
    match geometry_type {
        GeometryType::Unknown => "GEOMETRY",
        GeometryType::Point => "POINT",
        GeometryType::LineString => "LINESTRING",
        GeometryType::Polygon => "POLYGON",
        GeometryType::MultiPoint => "MULTIPOINT",
        GeometryType::MultiLineString => "MULTILINESTRING",
        GeometryType::MultiPolygon => "MULTIPOLYGON",
        GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
        GeometryType::None => "NONE",
    }
}

#[inline]
pub(crate) fn geometry_type_from_str(geometry_type_str: &str) -> Result<GeometryType, GpkgError> {
    let s = geometry_type_str;
    if s.eq_ignore_ascii_case("GEOMETRY") {
        Ok(GeometryType::Unknown)
    } else if s.eq_ignore_ascii_case("POINT") {
        Ok(GeometryType::Point)
    } else if s.eq_ignore_ascii_case("LINESTRING") {
        Ok(GeometryType::LineString)
    } else if s.eq_ignore_ascii_case("POLYGON") {
        Ok(GeometryType::Polygon)
    } else if s.eq_ignore_ascii_case("MULTIPOINT") {
        Ok(GeometryType::MultiPoint)
    } else if s.eq_ignore_ascii_case("MULTILINESTRING") {
        Ok(GeometryType::MultiLineString)
    } else if s.eq_ignore_ascii_case("MULTIPOLYGON") {
        Ok(GeometryType::MultiPolygon)
    } else if s.eq_ignore_ascii_case("GEOMETRYCOLLECTION") {
        Ok(GeometryType::GeometryCollection)
    } else {
        Err(GpkgError::UnsupportedGeometryType(
            geometry_type_str.to_string(),
        ))
    }
}

/// Geometry type of a parsed WKB value, as a layer geometry type.
#[inline]
pub(crate) fn geometry_type_from_wkb(geometry_type: wkb::reader::GeometryType) -> GeometryType {
    match geometry_type {
        wkb::reader::GeometryType::Point => GeometryType::Point,
        wkb::reader::GeometryType::LineString => GeometryType::LineString,
        wkb::reader::GeometryType::Polygon => GeometryType::Polygon,
        wkb::reader::GeometryType::MultiPoint => GeometryType::MultiPoint,
        wkb::reader::GeometryType::MultiLineString => GeometryType::MultiLineString,
        wkb::reader::GeometryType::MultiPolygon => GeometryType::MultiPolygon,
        wkb::reader::GeometryType::GeometryCollection => GeometryType::GeometryCollection,
        #[allow(unreachable_patterns)]
        _ => GeometryType::Unknown,
    }
}

#[inline]
pub(crate) fn field_type_to_str(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Integer => "INTEGER",
        FieldType::Real => "DOUBLE",
        FieldType::Text => "TEXT",
        FieldType::Binary => "BLOB",
        FieldType::Date => "DATE",
    }
}

/// Map a declared SQLite column type onto a field type.
///
/// Length qualifiers such as `TEXT(20)` are ignored.
// cf. https://www.geopackage.org/spec140/index.html#_sqlite_container
#[inline]
pub(crate) fn field_type_from_str(column_type_str: &str) -> Option<FieldType> {
    let s = match column_type_str.find('(') {
        Some(idx) => column_type_str[..idx].trim(),
        None => column_type_str.trim(),
    };
    if s.eq_ignore_ascii_case("TINYINT")
        || s.eq_ignore_ascii_case("SMALLINT")
        || s.eq_ignore_ascii_case("MEDIUMINT")
        || s.eq_ignore_ascii_case("INT")
        || s.eq_ignore_ascii_case("INTEGER")
        || s.eq_ignore_ascii_case("BIGINT")
        || s.eq_ignore_ascii_case("BOOLEAN")
    {
        Some(FieldType::Integer)
    } else if s.eq_ignore_ascii_case("DOUBLE")
        || s.eq_ignore_ascii_case("FLOAT")
        || s.eq_ignore_ascii_case("REAL")
    {
        Some(FieldType::Real)
    } else if s.eq_ignore_ascii_case("TEXT")
        || s.eq_ignore_ascii_case("VARCHAR")
        || s.eq_ignore_ascii_case("NVARCHAR")
        || s.eq_ignore_ascii_case("CHAR")
        || s.eq_ignore_ascii_case("CHARACTER")
        || s.eq_ignore_ascii_case("CLOB")
    {
        Some(FieldType::Text)
    } else if s.eq_ignore_ascii_case("BLOB") {
        Some(FieldType::Binary)
    } else if s.eq_ignore_ascii_case("DATE") || s.eq_ignore_ascii_case("DATETIME") {
        Some(FieldType::Date)
    } else {
        None
    }
}
