//! # Catalog Repository
//!
//! Categories, menu items and tables. Full catalog CRUD is an external
//! collaborator; this repository covers what the seed binary and the
//! integration tests need to put rows in place.

use sqlx::PgPool;
use tracing::debug;

use dinein_core::{
    CategoryId, DiningTable, MenuItem, MenuItemId, Money, QrTokenGenerator, TableId,
};

use super::table::{TableRow, TABLE_COLUMNS};
use crate::error::{DbError, DbResult};

/// Repository for catalog writes.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: i64,
    category_id: i64,
    name: String,
    description: String,
    price_minor: i64,
    active: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: MenuItemId(row.id),
            category_id: CategoryId(row.category_id),
            name: row.name,
            description: row.description,
            price: Money::from_minor(row.price_minor),
            active: row.active,
        }
    }
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: PgPool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a category, or returns the existing one with the same name.
    pub async fn upsert_category(&self, name: &str, sort_order: i32) -> DbResult<CategoryId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO categories (name, sort_order) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET sort_order = EXCLUDED.sort_order
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(CategoryId(id))
    }

    pub async fn insert_menu_item(
        &self,
        category_id: CategoryId,
        name: &str,
        description: &str,
        price: Money,
    ) -> DbResult<MenuItem> {
        debug!(name = %name, price = %price, "Inserting menu item");

        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            INSERT INTO menu_items (category_id, name, description, price_minor)
            VALUES ($1, $2, $3, $4)
            RETURNING id, category_id, name, description, price_minor, active
            "#,
        )
        .bind(category_id.get())
        .bind(name)
        .bind(description)
        .bind(price.to_minor())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Changes the live price. Existing order lines keep their snapshot.
    pub async fn set_menu_price(&self, id: MenuItemId, price: Money) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE menu_items SET price_minor = $2, updated_at = clock_timestamp() WHERE id = $1",
        )
        .bind(id.get())
        .bind(price.to_minor())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Menu item", id));
        }
        Ok(())
    }

    pub async fn set_menu_active(&self, id: MenuItemId, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE menu_items SET active = $2, updated_at = clock_timestamp() WHERE id = $1",
        )
        .bind(id.get())
        .bind(active)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Menu item", id));
        }
        Ok(())
    }

    /// Registers a table with a freshly generated QR token.
    pub async fn insert_table(
        &self,
        number: i32,
        seating: i32,
        tokens: &dyn QrTokenGenerator,
    ) -> DbResult<DiningTable> {
        let sql = format!(
            "INSERT INTO tables (number, qr_token, seating) VALUES ($1, $2, $3) RETURNING {TABLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TableRow>(&sql)
            .bind(number)
            .bind(tokens.generate())
            .bind(seating)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn set_table_active(&self, id: TableId, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE tables SET active = $2 WHERE id = $1")
            .bind(id.get())
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", id));
        }
        Ok(())
    }

    pub async fn count_tables(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tables")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
