//! Batch feature insertion with per-feature validation.

use super::catalog::{self, ResolvedLayer};
use super::feature::{Feature, wkb_to_gpkg_geometry};
use crate::conversions::{geometry_type_from_wkb, geometry_type_to_str};
use crate::error::{GpkgError, Result};
use crate::ogc_sql::{SQL_TOUCH_CONTENTS, SQL_UPDATE_CONTENTS_EXTENT, sql_insert_feature};
use crate::sql_functions::{Bounds, geometry_bounds};
use crate::types::{FieldDescriptor, FieldType, GeometryType, LayerKind, Value};
use rusqlite::Connection;
use time::{Date, Month};
use wkb::reader::Wkb;

/// Insert `features` into `layer_name`, returning how many rows were written.
///
/// The caller owns the enclosing savepoint: on error nothing must be
/// committed, since rows before the failing one have already been inserted.
pub(crate) fn append_features<I>(conn: &Connection, layer_name: &str, features: I) -> Result<usize>
where
    I: IntoIterator<Item = Feature>,
{
    let layer = catalog::resolve_layer(conn, layer_name)?;
    if layer.descriptor.kind == LayerKind::Raster {
        return Err(GpkgError::InvalidSchema(format!(
            "cannot append features to raster layer '{layer_name}'"
        )));
    }

    let plan = InsertPlan::new(&layer);
    let mut extent: Option<Bounds> = None;
    let mut written = 0;

    for (index, feature) in features.into_iter().enumerate() {
        let bounds = plan
            .insert(conn, feature)
            .map_err(|source| GpkgError::PartialWriteRejected {
                index,
                source: Box::new(source),
            })?;
        if let Some(bounds) = bounds {
            extent = Some(match extent {
                Some(existing) => existing.merge(bounds),
                None => bounds,
            });
        }
        written += 1;
    }

    match extent {
        Some(b) => conn.execute(
            SQL_UPDATE_CONTENTS_EXTENT,
            rusqlite::params![layer_name, b.minx, b.miny, b.maxx, b.maxy],
        )?,
        None => conn.execute(SQL_TOUCH_CONTENTS, [layer_name])?,
    };

    tracing::debug!(layer = layer_name, written, "appended features");
    Ok(written)
}

struct InsertPlan<'a> {
    layer: &'a ResolvedLayer,
    primary_key_index: Option<usize>,
    /// Statement for rows whose identifier is assigned by SQLite.
    sql_auto_id: String,
    /// Statement for rows that carry their identifier.
    sql_with_id: String,
}

impl<'a> InsertPlan<'a> {
    fn new(layer: &'a ResolvedLayer) -> Self {
        let descriptor = &layer.descriptor;
        let primary_key_index = descriptor.primary_key_index();

        // geometry, non-key fields, then the identifier when one is given
        let mut columns: Vec<&str> = Vec::with_capacity(descriptor.fields.len() + 2);
        if let Some(geometry_column) = descriptor.geometry_column.as_deref() {
            columns.push(geometry_column);
        }
        columns.extend(
            descriptor
                .fields
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != primary_key_index)
                .map(|(_, f)| f.name.as_str()),
        );
        let sql_auto_id = sql_insert_feature(&descriptor.name, columns.iter().copied());
        columns.push(&layer.id_column);
        let sql_with_id = sql_insert_feature(&descriptor.name, columns.iter().copied());

        Self {
            layer,
            primary_key_index,
            sql_auto_id,
            sql_with_id,
        }
    }

    fn insert(&self, conn: &Connection, feature: Feature) -> Result<Option<Bounds>> {
        let descriptor = &self.layer.descriptor;
        let Feature {
            id,
            properties,
            geometry,
        } = feature;

        if properties.len() != descriptor.fields.len() {
            return Err(GpkgError::InvalidPropertyCount {
                expected: descriptor.fields.len(),
                got: properties.len(),
            });
        }

        let mut params: Vec<Value> = Vec::with_capacity(properties.len() + 2);
        let bounds = match (descriptor.geometry_column.as_ref(), geometry) {
            (Some(_), Some(wkb)) => {
                let bounds = check_geometry(descriptor.geometry_type, &wkb)?;
                params.push(Value::Blob(wkb_to_gpkg_geometry(
                    &wkb,
                    descriptor.srs_id,
                    bounds.is_none(),
                )));
                bounds
            }
            (Some(_), None) => return Err(GpkgError::MissingGeometry),
            (None, Some(_)) => return Err(GpkgError::UnexpectedGeometry),
            (None, None) => None,
        };

        let mut primary_key_value = None;
        for (i, (field, value)) in descriptor.fields.iter().zip(properties).enumerate() {
            let is_primary_key = Some(i) == self.primary_key_index;
            let value = check_value(field, value, is_primary_key)?;
            if is_primary_key {
                if let Value::Integer(v) = value {
                    primary_key_value = Some(v);
                }
            } else {
                params.push(value);
            }
        }

        let id = match (id, primary_key_value) {
            (Some(id), Some(primary_key)) if id != primary_key => {
                return Err(GpkgError::IdentifierMismatch { id, primary_key });
            }
            (id, primary_key) => primary_key.or(id),
        };

        let sql = match id {
            Some(id) => {
                params.push(Value::Integer(id));
                &self.sql_with_id
            }
            None => &self.sql_auto_id,
        };
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.execute(rusqlite::params_from_iter(params.iter()))?;
        Ok(bounds)
    }
}

fn check_geometry(layer_type: GeometryType, wkb: &[u8]) -> Result<Option<Bounds>> {
    let geometry = Wkb::try_new(wkb)?;
    if layer_type != GeometryType::Unknown {
        let actual = geometry_type_from_wkb(geometry.geometry_type());
        if actual != layer_type {
            return Err(GpkgError::GeometryTypeMismatch {
                expected: geometry_type_to_str(layer_type),
                actual: geometry_type_to_str(actual),
            });
        }
    }
    Ok(geometry_bounds(&geometry))
}

fn check_value(field: &FieldDescriptor, value: Value, is_primary_key: bool) -> Result<Value> {
    let mismatch = |value: &Value| GpkgError::ValueTypeMismatch {
        column: field.name.clone(),
        expected: field_type_name(field.field_type),
        actual: value.type_name(),
    };

    match (field.field_type, value) {
        (_, Value::Null) if field.nullable || is_primary_key => Ok(Value::Null),
        (_, Value::Null) => Err(GpkgError::NullValue {
            column: field.name.clone(),
        }),
        (FieldType::Integer, v @ Value::Integer(_)) => Ok(v),
        // SQLite binds NaN as NULL, so it would not read back.
        (FieldType::Real, Value::Real(v)) if v.is_nan() => Err(GpkgError::ValueTypeMismatch {
            column: field.name.clone(),
            expected: "real",
            actual: "NaN",
        }),
        (FieldType::Real, v @ Value::Real(_)) => Ok(v),
        (FieldType::Real, Value::Integer(v)) => Ok(Value::Real(v as f64)),
        (FieldType::Text, v @ Value::Text(_)) => Ok(v),
        (FieldType::Binary, v @ Value::Blob(_)) => Ok(v),
        (FieldType::Date, Value::Text(s)) if is_iso_date(&s) => Ok(Value::Text(s)),
        (FieldType::Date, Value::Text(s)) => Err(GpkgError::InvalidDate {
            column: field.name.clone(),
            value: s,
        }),
        (_, other) => Err(mismatch(&other)),
    }
}

fn field_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Integer => "integer",
        FieldType::Real => "real",
        FieldType::Text => "text",
        FieldType::Binary => "blob",
        FieldType::Date => "date",
    }
}

/// `YYYY-MM-DD`, optionally followed by a `T` or space separated time part.
///
/// The date itself must exist on the calendar.
fn is_iso_date(s: &str) -> bool {
    let (date, rest) = match s.get(..10) {
        Some(date) => (date, &s[10..]),
        None => return false,
    };
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return false;
    }

    let mut parts = date.split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return false;
    }
    if !date.bytes().all(|c| c.is_ascii_digit() || c == b'-') {
        return false;
    }

    let (Ok(year), Ok(month), Ok(day)) = (year.parse::<i32>(), month.parse::<u8>(), day.parse::<u8>())
    else {
        return false;
    };
    let Ok(month) = Month::try_from(month) else {
        return false;
    };
    Date::from_calendar_date(year, month, day).is_ok()
}
