//! # Table Queries
//!
//! Read-only lookups of dining tables inside a transaction.

use sqlx::PgConnection;

use dinein_core::{DiningTable, TableId};

use crate::error::DbResult;

pub(crate) const TABLE_COLUMNS: &str = "id, number, qr_token, seating, active";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TableRow {
    id: i64,
    number: i32,
    qr_token: String,
    seating: i32,
    active: bool,
}

impl From<TableRow> for DiningTable {
    fn from(row: TableRow) -> Self {
        DiningTable {
            id: TableId(row.id),
            number: row.number,
            qr_token: row.qr_token,
            seating: row.seating,
            active: row.active,
        }
    }
}

pub(crate) async fn find(conn: &mut PgConnection, id: TableId) -> DbResult<Option<DiningTable>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM tables WHERE id = $1");
    let row = sqlx::query_as::<_, TableRow>(&sql)
        .bind(id.get())
        .fetch_optional(conn)
        .await?;
    Ok(row.map(DiningTable::from))
}

pub(crate) async fn find_by_qr(
    conn: &mut PgConnection,
    qr_token: &str,
) -> DbResult<Option<DiningTable>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM tables WHERE qr_token = $1");
    let row = sqlx::query_as::<_, TableRow>(&sql)
        .bind(qr_token)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(DiningTable::from))
}
