use anyhow::Context;
use rusqlite::{params, Connection};

use super::queries::{now_timestamp, parse_timestamp};
use crate::models::{CatalogEntry, CatalogKind};

// ── Catalog Entries ──

pub fn insert_entry(
    conn: &Connection,
    kind: CatalogKind,
    data: &serde_json::Value,
) -> anyhow::Result<CatalogEntry> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO catalog_entries (id, kind, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, kind.as_str(), serde_json::to_string(data)?, now],
    )?;

    get_entry(conn, kind, &id)?.context("catalog entry vanished after insert")
}

pub fn get_entry(
    conn: &Connection,
    kind: CatalogKind,
    id: &str,
) -> anyhow::Result<Option<CatalogEntry>> {
    let result = conn.query_row(
        "SELECT id, kind, data, created_at, updated_at FROM catalog_entries WHERE kind = ?1 AND id = ?2",
        params![kind.as_str(), id],
        |row| Ok(parse_entry_row(row)),
    );

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_entries(conn: &Connection, kind: CatalogKind) -> anyhow::Result<Vec<CatalogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, data, created_at, updated_at FROM catalog_entries
         WHERE kind = ?1 ORDER BY created_at DESC, id ASC",
    )?;
    let rows = stmt.query_map(params![kind.as_str()], |row| Ok(parse_entry_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn update_entry(
    conn: &Connection,
    kind: CatalogKind,
    id: &str,
    data: &serde_json::Value,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE catalog_entries SET data = ?1, updated_at = ?2 WHERE kind = ?3 AND id = ?4",
        params![serde_json::to_string(data)?, now_timestamp(), kind.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_entry(conn: &Connection, kind: CatalogKind, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM catalog_entries WHERE kind = ?1 AND id = ?2",
        params![kind.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn count_entries(conn: &Connection, kind: CatalogKind) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM catalog_entries WHERE kind = ?1",
        params![kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_entry_row(row: &rusqlite::Row) -> anyhow::Result<CatalogEntry> {
    let kind_str: String = row.get(1)?;
    let data_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    let updated_at_str: String = row.get(4)?;

    let kind = CatalogKind::parse(&kind_str)
        .with_context(|| format!("unknown catalog kind in store: {kind_str}"))?;
    let data = match serde_json::from_str(&data_str)? {
        serde_json::Value::Object(map) => map,
        other => anyhow::bail!("catalog entry data is not an object: {other}"),
    };

    Ok(CatalogEntry {
        id: row.get(0)?,
        kind,
        data,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}
