//! Layer creation: name and field validation, table DDL and catalog rows.

use super::catalog;
use super::srs::ensure_srs_exists;
use crate::conversions::{field_type_to_str, geometry_type_to_str};
use crate::error::{GpkgError, Result};
use crate::ogc_sql::{
    SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_DATA_COLUMN, SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
    SQL_INSERT_GPKG_TILE_MATRIX_SET, SQL_INSERT_TILES_GPKG_CONTENTS, ensure_schema_extension,
    execute_rtree_sqls, quote_identifier, sql_create_table, sql_create_tile_table, table_exists,
};
use crate::types::{FieldDescriptor, FieldType, GeometryType, LayerDescriptor, TileMatrixSet};
use rusqlite::Connection;

/// Geometry column of every spatial layer created here.
pub(crate) const GEOMETRY_COLUMN: &str = "geom";

/// Hidden identifier column of layers created without a primary key.
pub(crate) const AUTO_ID_COLUMN: &str = "fid";

const RESERVED_PREFIXES: [&str; 3] = ["gpkg_", "rtree_", "sqlite_"];

pub(crate) fn create_vector_layer(
    conn: &Connection,
    layer_name: &str,
    fields: &[FieldDescriptor],
    srs_id: i32,
    geometry_type: GeometryType,
    primary_key: Option<&str>,
    spatial_index: bool,
) -> Result<LayerDescriptor> {
    validate_layer_name(conn, layer_name)?;
    ensure_srs_exists(conn, srs_id)?;
    validate_fields(fields, geometry_type, primary_key)?;

    let column_defs = column_definitions(fields, geometry_type, primary_key);
    conn.execute(&sql_create_table(layer_name, &column_defs), [])?;

    let data_type = if geometry_type.is_spatial() {
        "features"
    } else {
        "attributes"
    };
    conn.execute(
        SQL_INSERT_GPKG_CONTENTS,
        rusqlite::params![layer_name, data_type, srs_id],
    )?;

    if geometry_type.is_spatial() {
        conn.execute(
            SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
            rusqlite::params![
                layer_name,
                GEOMETRY_COLUMN,
                geometry_type_to_str(geometry_type),
                srs_id
            ],
        )?;
    }

    ensure_schema_extension(conn)?;
    let mut stmt = conn.prepare_cached(SQL_INSERT_GPKG_DATA_COLUMN)?;
    for field in fields {
        stmt.execute([layer_name, field.name.as_str()])?;
    }

    if spatial_index && geometry_type.is_spatial() {
        let id_column = primary_key.unwrap_or(AUTO_ID_COLUMN);
        execute_rtree_sqls(conn, layer_name, GEOMETRY_COLUMN, id_column)?;
    }

    tracing::info!(
        layer = layer_name,
        data_type,
        srs_id,
        fields = fields.len(),
        "created vector layer"
    );
    catalog::resolve(conn, layer_name)
}

pub(crate) fn create_tile_layer(
    conn: &Connection,
    layer_name: &str,
    srs_id: i32,
    matrix_set: TileMatrixSet,
) -> Result<LayerDescriptor> {
    validate_layer_name(conn, layer_name)?;
    ensure_srs_exists(conn, srs_id)?;
    if !(matrix_set.min_x < matrix_set.max_x && matrix_set.min_y < matrix_set.max_y) {
        return Err(GpkgError::InvalidSchema(format!(
            "tile matrix set of '{layer_name}' has an empty bounding box"
        )));
    }

    let TileMatrixSet {
        min_x,
        min_y,
        max_x,
        max_y,
    } = matrix_set;
    conn.execute(&sql_create_tile_table(layer_name), [])?;
    conn.execute(
        SQL_INSERT_TILES_GPKG_CONTENTS,
        rusqlite::params![layer_name, min_x, min_y, max_x, max_y, srs_id],
    )?;
    conn.execute(
        SQL_INSERT_GPKG_TILE_MATRIX_SET,
        rusqlite::params![layer_name, srs_id, min_x, min_y, max_x, max_y],
    )?;

    tracing::info!(layer = layer_name, srs_id, "created tile layer");
    catalog::resolve(conn, layer_name)
}

fn validate_layer_name(conn: &Connection, layer_name: &str) -> Result<()> {
    if layer_name.is_empty() {
        return Err(GpkgError::InvalidSchema("layer name is empty".to_string()));
    }
    if layer_name.contains('\0') {
        return Err(GpkgError::InvalidSchema(
            "layer name contains a NUL character".to_string(),
        ));
    }
    if catalog::find_layer(conn, layer_name)?.is_some() || table_exists(conn, layer_name)? {
        return Err(GpkgError::DuplicateLayer {
            layer_name: layer_name.to_string(),
        });
    }

    let lowered = layer_name.to_ascii_lowercase();
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        return Err(GpkgError::InvalidSchema(format!(
            "layer name '{layer_name}' uses the reserved prefix '{prefix}'"
        )));
    }
    Ok(())
}

fn validate_fields(
    fields: &[FieldDescriptor],
    geometry_type: GeometryType,
    primary_key: Option<&str>,
) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        let reject = |reason: &str| GpkgError::SchemaError {
            column: field.name.clone(),
            reason: reason.to_string(),
        };

        if field.name.is_empty() {
            return Err(reject("column name is empty"));
        }
        if field.name.contains('\0') {
            return Err(reject("column name contains a NUL character"));
        }
        // SQLite compares column names case-insensitively.
        if fields[..i]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&field.name))
        {
            return Err(reject("duplicate column name"));
        }
        if geometry_type.is_spatial() && field.name.eq_ignore_ascii_case(GEOMETRY_COLUMN) {
            return Err(reject("collides with the geometry column"));
        }
    }

    match primary_key {
        Some(primary_key) => {
            let field = fields
                .iter()
                .find(|f| f.name == primary_key)
                .ok_or_else(|| {
                    GpkgError::InvalidSchema(format!(
                        "primary key '{primary_key}' is not one of the fields"
                    ))
                })?;
            if field.field_type != FieldType::Integer {
                return Err(GpkgError::InvalidSchema(format!(
                    "primary key '{primary_key}' must be an integer field"
                )));
            }
        }
        None => {
            if let Some(field) = fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(AUTO_ID_COLUMN))
            {
                return Err(GpkgError::InvalidSchema(format!(
                    "field '{}' collides with the feature identifier; declare it as the primary key",
                    field.name
                )));
            }
        }
    }
    Ok(())
}

// [fid], [geom], then the fields in caller order.
fn column_definitions(
    fields: &[FieldDescriptor],
    geometry_type: GeometryType,
    primary_key: Option<&str>,
) -> String {
    let mut defs = Vec::with_capacity(fields.len() + 2);
    if primary_key.is_none() {
        defs.push(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
            quote_identifier(AUTO_ID_COLUMN)
        ));
    }
    if geometry_type.is_spatial() {
        defs.push(format!(
            "{} {}",
            quote_identifier(GEOMETRY_COLUMN),
            geometry_type_to_str(geometry_type)
        ));
    }
    for field in fields {
        let mut def = format!(
            "{} {}",
            quote_identifier(&field.name),
            field_type_to_str(field.field_type)
        );
        if Some(field.name.as_str()) == primary_key {
            def.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if !field.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }
    defs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::column_definitions;
    use crate::Result;
    use crate::error::GpkgError;
    use crate::gpkg::Container;
    use crate::ogc_sql::table_exists;
    use crate::types::{FieldDescriptor, FieldType, GeometryType, LayerKind, TileMatrixSet};

    fn road_fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::not_null("name", FieldType::Text),
            FieldDescriptor::new("lanes", FieldType::Integer),
            FieldDescriptor::new("opened", FieldType::Date),
        ]
    }

    #[test]
    fn hidden_identifier_comes_first() {
        let defs = column_definitions(&road_fields(), GeometryType::LineString, None);
        assert_eq!(
            defs,
            r#""fid" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, "geom" LINESTRING, "name" TEXT NOT NULL, "lanes" INTEGER, "opened" DATE"#
        );
    }

    #[test]
    fn primary_key_keeps_its_position() {
        let fields = vec![
            FieldDescriptor::new("label", FieldType::Text),
            FieldDescriptor::not_null("code", FieldType::Integer),
        ];
        let defs = column_definitions(&fields, GeometryType::None, Some("code"));
        assert_eq!(
            defs,
            r#""label" TEXT, "code" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"#
        );
    }

    #[test]
    fn created_layer_matches_resolved_descriptor() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let created =
            gpkg.create_vector_layer("roads", &road_fields(), 4326, GeometryType::LineString, None)?;

        assert_eq!(created, gpkg.resolve("roads")?);
        assert_eq!(created.kind, LayerKind::Vector);
        assert_eq!(created.geometry_column.as_deref(), Some("geom"));
        assert_eq!(created.fields, road_fields());
        assert_eq!(created.primary_key, None);
        assert!(table_exists(gpkg.connection(), "rtree_roads_geom")?);
        Ok(())
    }

    #[test]
    fn attributes_layer_with_primary_key() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let fields = vec![
            FieldDescriptor::new("label", FieldType::Text),
            FieldDescriptor::new("code", FieldType::Integer),
        ];
        let created =
            gpkg.create_vector_layer("codes", &fields, 0, GeometryType::None, Some("code"))?;

        assert_eq!(created.geometry_type, GeometryType::None);
        assert_eq!(created.geometry_column, None);
        assert_eq!(created.primary_key.as_deref(), Some("code"));
        assert_eq!(created.fields, fields);
        assert_eq!(created.primary_key_index(), Some(1));
        Ok(())
    }

    #[test]
    fn duplicate_name_leaves_catalog_unchanged() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        gpkg.create_vector_layer("roads", &road_fields(), 4326, GeometryType::LineString, None)?;

        let err = gpkg
            .create_vector_layer("roads", &[], 4326, GeometryType::Point, None)
            .expect_err("duplicate");
        assert!(matches!(err, GpkgError::DuplicateLayer { layer_name } if layer_name == "roads"));
        assert_eq!(gpkg.resolve("roads")?.geometry_type, GeometryType::LineString);

        // Plain tables count as taken names too.
        gpkg.connection().execute_batch("CREATE TABLE scratch (x)")?;
        let err = gpkg
            .create_vector_layer("SCRATCH", &[], 4326, GeometryType::Point, None)
            .expect_err("table exists");
        assert!(matches!(err, GpkgError::DuplicateLayer { .. }));
        Ok(())
    }

    #[test]
    fn rejects_bad_names_and_fields() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;

        for name in ["", "gpkg_roads", "RTREE_x", "sqlite_stat9"] {
            let err = gpkg
                .create_vector_layer(name, &[], 4326, GeometryType::Point, None)
                .expect_err("reserved or empty");
            assert!(matches!(err, GpkgError::InvalidSchema(_)), "{name}: {err}");
        }

        let cases: Vec<(Vec<FieldDescriptor>, &str)> = vec![
            (vec![FieldDescriptor::new("", FieldType::Text)], ""),
            (vec![FieldDescriptor::new("a\0b", FieldType::Text)], "a\0b"),
            (
                vec![
                    FieldDescriptor::new("Name", FieldType::Text),
                    FieldDescriptor::new("NAME", FieldType::Text),
                ],
                "NAME",
            ),
            (vec![FieldDescriptor::new("GEOM", FieldType::Binary)], "GEOM"),
        ];
        for (fields, bad) in cases {
            let err = gpkg
                .create_vector_layer("points", &fields, 4326, GeometryType::Point, None)
                .expect_err("unrepresentable field");
            assert!(
                matches!(&err, GpkgError::SchemaError { column, .. } if column == bad),
                "{err}"
            );
        }
        assert!(gpkg.find("points")?.is_none());
        Ok(())
    }

    #[test]
    fn rejects_bad_primary_keys() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let fields = vec![
            FieldDescriptor::new("fid", FieldType::Integer),
            FieldDescriptor::new("name", FieldType::Text),
        ];

        for primary_key in [None, Some("missing"), Some("name")] {
            let err = gpkg
                .create_vector_layer("points", &fields, 4326, GeometryType::Point, primary_key)
                .expect_err("invalid identifier setup");
            assert!(matches!(err, GpkgError::InvalidSchema(_)), "{err}");
        }

        gpkg.create_vector_layer("points", &fields, 4326, GeometryType::Point, Some("fid"))?;
        Ok(())
    }

    #[test]
    fn unknown_srs_is_rejected() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let err = gpkg
            .create_vector_layer("points", &[], 2056, GeometryType::Point, None)
            .expect_err("unregistered srs");
        assert!(matches!(err, GpkgError::MissingSpatialRefSysId { srs_id: 2056 }));
        Ok(())
    }

    #[test]
    fn tile_layer_is_registered_as_raster() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let bbox = TileMatrixSet {
            min_x: -180.0,
            min_y: -90.0,
            max_x: 180.0,
            max_y: 90.0,
        };
        let layer = gpkg.create_tile_layer("imagery", 4326, bbox)?;
        assert_eq!(layer.kind, LayerKind::Raster);
        assert!(layer.fields.is_empty());

        let empty = TileMatrixSet { max_x: -180.0, ..bbox };
        let err = gpkg
            .create_tile_layer("imagery2", 4326, empty)
            .expect_err("empty bbox");
        assert!(matches!(err, GpkgError::InvalidSchema(_)));

        let err = gpkg
            .create_tile_layer("imagery", 4326, bbox)
            .expect_err("duplicate");
        assert!(matches!(err, GpkgError::DuplicateLayer { .. }));
        Ok(())
    }
}
