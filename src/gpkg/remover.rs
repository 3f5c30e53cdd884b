use super::catalog;
use super::srs::purge_unused_srs;
use crate::error::Result;
use crate::ogc_sql::{
    SQL_DELETE_GPKG_CONTENTS, SQL_DELETE_GPKG_DATA_COLUMNS, SQL_DELETE_GPKG_EXTENSIONS,
    SQL_DELETE_GPKG_GEOMETRY_COLUMNS, SQL_DELETE_GPKG_TILE_MATRIX,
    SQL_DELETE_GPKG_TILE_MATRIX_SET, SQL_DELETE_SQLITE_SEQUENCE, gpkg_rtree_drop_sql,
    sql_drop_table, table_exists,
};
use crate::types::LayerKind;
use rusqlite::Connection;

/// Drop a layer and every catalog row that refers to it.
///
/// Returns `false` when no layer of that name exists. Only the catalog rows are
/// consulted, so layers this crate cannot describe can still be removed. The
/// caller provides the savepoint that makes the removal all-or-nothing.
pub(crate) fn remove_layer(conn: &Connection, layer_name: &str) -> Result<bool> {
    let Some(layer) = catalog::find_entry(conn, layer_name)? else {
        tracing::debug!(layer = layer_name, "nothing to remove");
        return Ok(false);
    };

    match layer.kind {
        LayerKind::Vector => {
            if let Some(geometry_column) = layer.geometry_column.as_deref() {
                conn.execute_batch(&gpkg_rtree_drop_sql(layer_name, geometry_column))?;
            }
            conn.execute_batch(&sql_drop_table(layer_name))?;
            conn.execute(SQL_DELETE_GPKG_GEOMETRY_COLUMNS, [layer_name])?;
            delete_if_table_exists(conn, "gpkg_data_columns", SQL_DELETE_GPKG_DATA_COLUMNS, layer_name)?;
        }
        LayerKind::Raster => {
            conn.execute_batch(&sql_drop_table(layer_name))?;
            delete_if_table_exists(conn, "gpkg_tile_matrix", SQL_DELETE_GPKG_TILE_MATRIX, layer_name)?;
            delete_if_table_exists(
                conn,
                "gpkg_tile_matrix_set",
                SQL_DELETE_GPKG_TILE_MATRIX_SET,
                layer_name,
            )?;
        }
    }

    delete_if_table_exists(conn, "gpkg_extensions", SQL_DELETE_GPKG_EXTENSIONS, layer_name)?;
    conn.execute(SQL_DELETE_GPKG_CONTENTS, [layer_name])?;
    delete_if_table_exists(conn, "sqlite_sequence", SQL_DELETE_SQLITE_SEQUENCE, layer_name)?;
    purge_unused_srs(conn, layer.srs_id)?;

    tracing::info!(layer = layer_name, kind = ?layer.kind, "removed layer");
    Ok(true)
}

// Containers written by other tools may lack the optional catalog tables.
fn delete_if_table_exists(conn: &Connection, table: &str, sql: &str, layer_name: &str) -> Result<()> {
    if table_exists(conn, table)? {
        conn.execute(sql, [layer_name])?;
    }
    Ok(())
}
