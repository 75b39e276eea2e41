//! # Menu Snapshot Reader
//!
//! Reads a menu item's current name, price and active flag. Called inside
//! the transaction that inserts the line, so the snapshot is the committed
//! catalog state at that instant. Nothing is cached.

use sqlx::PgConnection;

use dinein_core::{MenuItemId, MenuSnapshot, Money};

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: i64,
    name: String,
    price_minor: i64,
    active: bool,
}

pub(crate) async fn snapshot(
    conn: &mut PgConnection,
    item_id: MenuItemId,
) -> DbResult<Option<MenuSnapshot>> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, name, price_minor, active FROM menu_items WHERE id = $1",
    )
    .bind(item_id.get())
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| MenuSnapshot {
        item_id: MenuItemId(r.id),
        name: r.name,
        price: Money::from_minor(r.price_minor),
        active: r.active,
    }))
}
