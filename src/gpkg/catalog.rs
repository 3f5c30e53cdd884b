//! Read side of the catalog: layer enumeration and name resolution.

use crate::conversions::{field_type_from_str, geometry_type_from_str};
use crate::error::{GpkgError, Result};
use crate::ogc_sql::{
    SQL_LIST_LAYERS_BY_DATA_TYPE, SQL_SELECT_CONTENTS, SQL_SELECT_GEOMETRY_COLUMN_META,
    SQL_SELECT_GPKG_DATA_COLUMNS, SQL_TABLE_COLUMNS, table_exists,
};
use crate::types::{FieldDescriptor, GeometryType, LayerDescriptor, LayerKind};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;

const VECTOR_DATA_TYPES: [&str; 2] = ["features", "attributes"];
const RASTER_DATA_TYPES: [&str; 2] = ["tiles", "2d-gridded-coverage"];

/// A resolved layer plus the column that identifies its rows.
///
/// The id column is the caller's primary key, the hidden auto-identifier, or
/// `rowid` for tables that declare no integer primary key.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedLayer {
    pub(crate) descriptor: LayerDescriptor,
    pub(crate) id_column: String,
}

pub(crate) fn list_vector_layers(conn: &Connection) -> Result<Vec<LayerDescriptor>> {
    list_layers_of_kind(conn, LayerKind::Vector)
}

pub(crate) fn list_raster_layers(conn: &Connection) -> Result<Vec<LayerDescriptor>> {
    list_layers_of_kind(conn, LayerKind::Raster)
}

/// Vector layer names followed by raster layer names.
pub(crate) fn layer_names(conn: &Connection) -> Result<Vec<String>> {
    let mut names = list_names(conn, VECTOR_DATA_TYPES)?;
    names.extend(list_names(conn, RASTER_DATA_TYPES)?);
    Ok(names)
}

pub(crate) fn resolve(conn: &Connection, layer_name: &str) -> Result<LayerDescriptor> {
    resolve_layer(conn, layer_name).map(|layer| layer.descriptor)
}

pub(crate) fn find(conn: &Connection, layer_name: &str) -> Result<Option<LayerDescriptor>> {
    Ok(find_layer(conn, layer_name)?.map(|layer| layer.descriptor))
}

pub(crate) fn resolve_layer(conn: &Connection, layer_name: &str) -> Result<ResolvedLayer> {
    find_layer(conn, layer_name)?.ok_or_else(|| GpkgError::NotFound {
        layer_name: layer_name.to_string(),
    })
}

/// Look a layer up by exact, case-sensitive name.
///
/// `gpkg_contents` keys on `table_name`, so a name belongs to at most one
/// layer; vector data types are still matched before raster ones.
pub(crate) fn find_layer(conn: &Connection, layer_name: &str) -> Result<Option<ResolvedLayer>> {
    let Some((kind, srs_id)) = contents_entry(conn, layer_name)? else {
        return Ok(None);
    };

    match kind {
        LayerKind::Vector => describe_vector_layer(conn, layer_name, srs_id).map(Some),
        LayerKind::Raster => Ok(Some(ResolvedLayer {
            descriptor: LayerDescriptor {
                name: layer_name.to_string(),
                kind: LayerKind::Raster,
                geometry_type: GeometryType::None,
                geometry_column: None,
                srs_id,
                primary_key: None,
                fields: Vec::new(),
            },
            id_column: "id".to_string(),
        })),
    }
}

/// The catalog rows of a layer, without inspecting its table.
///
/// Unlike a `LayerDescriptor` this can be read for every registered layer,
/// including those whose geometry or column types have no `GeometryType` or
/// `FieldType` counterpart.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CatalogEntry {
    pub(crate) kind: LayerKind,
    pub(crate) srs_id: i32,
    pub(crate) geometry_column: Option<String>,
}

pub(crate) fn find_entry(conn: &Connection, layer_name: &str) -> Result<Option<CatalogEntry>> {
    let Some((kind, srs_id)) = contents_entry(conn, layer_name)? else {
        return Ok(None);
    };

    let mut entry = CatalogEntry {
        kind,
        srs_id,
        geometry_column: None,
    };
    if kind == LayerKind::Vector {
        let geometry: Option<(String, i32)> = conn
            .query_row(SQL_SELECT_GEOMETRY_COLUMN_META, [layer_name], |row| {
                Ok((row.get(0)?, row.get(2)?))
            })
            .optional()?;
        if let Some((column, srs_id)) = geometry {
            entry.geometry_column = Some(column);
            entry.srs_id = srs_id;
        }
    }
    Ok(Some(entry))
}

fn contents_entry(conn: &Connection, layer_name: &str) -> Result<Option<(LayerKind, i32)>> {
    let contents: Option<(String, Option<i32>)> = conn
        .query_row(SQL_SELECT_CONTENTS, [layer_name], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    let Some((data_type, srs_id)) = contents else {
        return Ok(None);
    };
    let kind = if VECTOR_DATA_TYPES.contains(&data_type.as_str()) {
        LayerKind::Vector
    } else if RASTER_DATA_TYPES.contains(&data_type.as_str()) {
        LayerKind::Raster
    } else {
        tracing::debug!(layer = layer_name, data_type, "ignoring unknown content type");
        return Ok(None);
    };
    Ok(Some((kind, srs_id.unwrap_or(0))))
}

fn list_layers_of_kind(conn: &Connection, kind: LayerKind) -> Result<Vec<LayerDescriptor>> {
    let data_types = match kind {
        LayerKind::Vector => VECTOR_DATA_TYPES,
        LayerKind::Raster => RASTER_DATA_TYPES,
    };

    let mut layers = Vec::new();
    for name in list_names(conn, data_types)? {
        match find_layer(conn, &name) {
            Ok(Some(layer)) => layers.push(layer.descriptor),
            Ok(None) => {}
            Err(err) if is_unrepresentable(&err) => {
                tracing::warn!(layer = name.as_str(), error = %err, "skipping layer that cannot be described");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(layers)
}

// Valid GeoPackage content this crate has no descriptor for.
fn is_unrepresentable(err: &GpkgError) -> bool {
    matches!(
        err,
        GpkgError::UnsupportedGeometryType(_)
            | GpkgError::SchemaError { .. }
            | GpkgError::CompositePrimaryKeyUnsupported { .. }
    )
}

fn list_names(conn: &Connection, data_types: [&str; 2]) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(SQL_LIST_LAYERS_BY_DATA_TYPE)?;
    let names = stmt
        .query_map(data_types, |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

struct TableColumn {
    name: String,
    declared_type: String,
    not_null: bool,
    primary_key: bool,
}

fn describe_vector_layer(conn: &Connection, layer_name: &str, srs_id: i32) -> Result<ResolvedLayer> {
    let geometry_meta: Option<(String, String, i32)> = conn
        .query_row(SQL_SELECT_GEOMETRY_COLUMN_META, [layer_name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .optional()?;

    let (geometry_column, geometry_type, srs_id) = match geometry_meta {
        Some((column, type_name, srs_id)) => {
            (Some(column), geometry_type_from_str(&type_name)?, srs_id)
        }
        None => (None, GeometryType::None, srs_id),
    };

    let columns = table_columns(conn, layer_name)?;
    let mut primary_keys = columns.iter().filter(|c| c.primary_key);
    let primary_key_column = primary_keys.next().map(|c| c.name.clone());
    if primary_keys.next().is_some() {
        return Err(GpkgError::CompositePrimaryKeyUnsupported {
            layer_name: layer_name.to_string(),
        });
    }

    // Only an INTEGER primary key aliases the rowid.
    let primary_key_column = primary_key_column.filter(|name| {
        columns
            .iter()
            .any(|c| &c.name == name && c.declared_type.eq_ignore_ascii_case("INTEGER"))
    });

    // Layers created here list their visible columns in the field registry.
    // Without registry rows the primary key is treated as the hidden identifier.
    let registered = registered_columns(conn, layer_name)?;
    let is_visible = |column: &TableColumn| {
        if registered.is_empty() {
            Some(&column.name) != primary_key_column.as_ref()
        } else {
            registered.contains(&column.name)
        }
    };

    let mut fields = Vec::new();
    for column in &columns {
        if Some(&column.name) == geometry_column.as_ref() || !is_visible(column) {
            continue;
        }
        let field_type =
            field_type_from_str(&column.declared_type).ok_or_else(|| GpkgError::SchemaError {
                column: column.name.clone(),
                reason: format!("unsupported declared type '{}'", column.declared_type),
            })?;
        fields.push(FieldDescriptor {
            name: column.name.clone(),
            field_type,
            nullable: !column.not_null,
        });
    }

    let primary_key = primary_key_column
        .as_ref()
        .filter(|pk| fields.iter().any(|f| &f.name == *pk))
        .cloned();
    let id_column = primary_key_column.unwrap_or_else(|| "rowid".to_string());

    Ok(ResolvedLayer {
        descriptor: LayerDescriptor {
            name: layer_name.to_string(),
            kind: LayerKind::Vector,
            geometry_type,
            geometry_column,
            srs_id,
            primary_key,
            fields,
        },
        id_column,
    })
}

fn table_columns(conn: &Connection, layer_name: &str) -> Result<Vec<TableColumn>> {
    let mut stmt = conn.prepare_cached(SQL_TABLE_COLUMNS)?;
    let columns = stmt
        .query_map([layer_name], |row| {
            Ok(TableColumn {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
                primary_key: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn registered_columns(conn: &Connection, layer_name: &str) -> Result<HashSet<String>> {
    if !table_exists(conn, "gpkg_data_columns")? {
        return Ok(HashSet::new());
    }
    let mut stmt = conn.prepare_cached(SQL_SELECT_GPKG_DATA_COLUMNS)?;
    let names = stmt
        .query_map([layer_name], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;
    Ok(names)
}
