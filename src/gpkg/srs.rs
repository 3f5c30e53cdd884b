use crate::error::{GpkgError, Result};
use crate::ogc_sql::{
    BUILTIN_SRS_IDS, SQL_DELETE_SRS, SQL_INSERT_SRS, SQL_SRS_EXISTS, SRS_REFERENCING_TABLES,
    sql_srs_referenced, table_exists,
};
use rusqlite::Connection;

pub(crate) fn register_srs(
    conn: &Connection,
    srs_name: &str,
    srs_id: i32,
    organization: &str,
    organization_coordsys_id: i32,
    definition: &str,
    description: &str,
) -> Result<()> {
    conn.execute(
        SQL_INSERT_SRS,
        rusqlite::params![
            srs_name,
            srs_id,
            organization,
            organization_coordsys_id,
            definition,
            description
        ],
    )?;
    tracing::debug!(srs_id, organization, "registered spatial reference system");
    Ok(())
}

pub(crate) fn ensure_srs_exists(conn: &Connection, srs_id: i32) -> Result<()> {
    let exists: bool = conn.query_row(SQL_SRS_EXISTS, [srs_id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(GpkgError::MissingSpatialRefSysId { srs_id })
    }
}

/// Delete an SRS row once nothing in the catalog refers to it.
/// The mandatory rows (-1, 0 and 4326) are kept.
pub(crate) fn purge_unused_srs(conn: &Connection, srs_id: i32) -> Result<bool> {
    if BUILTIN_SRS_IDS.contains(&srs_id) {
        return Ok(false);
    }

    for table in SRS_REFERENCING_TABLES {
        if !table_exists(conn, table)? {
            continue;
        }
        let referenced: bool =
            conn.query_row(&sql_srs_referenced(table), [srs_id], |row| row.get(0))?;
        if referenced {
            return Ok(false);
        }
    }

    let deleted = conn.execute(SQL_DELETE_SRS, [srs_id])?;
    if deleted > 0 {
        tracing::debug!(srs_id, "purged unused spatial reference system");
    }
    Ok(deleted > 0)
}
