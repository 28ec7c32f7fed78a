// ==========================================
// 实验室采购运营系统 - 库存数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 自然键: (catalog_number, vendor)；无货号时 (product_name, vendor)
// ==========================================

use crate::domain::{ApplyOutcome, InventoryItem};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    item_id, product_name, catalog_number, vendor, quantity, unit,
    location, lot_number, min_stock, max_stock, expiration_date
"#;

// ==========================================
// InventoryRepository - 库存仓储
// ==========================================
/// 职责: 管理 inventory_item 表的读写
pub struct InventoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryRepository {
    /// 创建新的 InventoryRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按自然键写入（存在则更新，否则新增）
    ///
    /// # 返回
    /// - Ok(ApplyOutcome::Created): 新增
    /// - Ok(ApplyOutcome::Updated): 命中已有条目并覆盖
    pub fn upsert(&self, item: &InventoryItem) -> RepositoryResult<ApplyOutcome> {
        let conn = self.get_conn()?;

        let existing = Self::find_id_by_natural_key(&conn, item)?;
        let expiration = item.expiration_date.map(|d| d.format("%Y-%m-%d").to_string());

        match existing {
            Some(item_id) => {
                conn.execute(
                    r#"
                    UPDATE inventory_item SET
                        product_name = ?1, catalog_number = ?2, vendor = ?3, quantity = ?4,
                        unit = ?5, location = ?6, lot_number = ?7, min_stock = ?8,
                        max_stock = ?9, expiration_date = ?10, updated_at = datetime('now')
                    WHERE item_id = ?11
                    "#,
                    params![
                        item.product_name,
                        item.catalog_number,
                        item.vendor,
                        item.quantity,
                        item.unit,
                        item.location,
                        item.lot_number,
                        item.min_stock,
                        item.max_stock,
                        expiration,
                        item_id,
                    ],
                )?;
                Ok(ApplyOutcome::Updated)
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO inventory_item (
                        product_name, catalog_number, vendor, quantity, unit,
                        location, lot_number, min_stock, max_stock, expiration_date
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        item.product_name,
                        item.catalog_number,
                        item.vendor,
                        item.quantity,
                        item.unit,
                        item.location,
                        item.lot_number,
                        item.min_stock,
                        item.max_stock,
                        expiration,
                    ],
                )?;
                Ok(ApplyOutcome::Created)
            }
        }
    }

    fn find_id_by_natural_key(conn: &Connection, item: &InventoryItem) -> RepositoryResult<Option<i64>> {
        let id = match &item.catalog_number {
            Some(catalog_number) => conn
                .query_row(
                    "SELECT item_id FROM inventory_item WHERE catalog_number = ?1 AND vendor IS ?2",
                    params![catalog_number, item.vendor],
                    |row| row.get(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT item_id FROM inventory_item
                     WHERE catalog_number IS NULL AND product_name = ?1 AND vendor IS ?2",
                    params![item.product_name, item.vendor],
                    |row| row.get(0),
                )
                .optional()?,
        };
        Ok(id)
    }

    /// 查询全部库存条目（按 item_id 升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM inventory_item ORDER BY item_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 按货号查询
    pub fn find_by_catalog_number(&self, catalog_number: &str) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM inventory_item WHERE catalog_number = ?1 ORDER BY item_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![catalog_number], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 条目总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM inventory_item", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        product_name: row.get(1)?,
        catalog_number: row.get(2)?,
        vendor: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        location: row.get(6)?,
        lot_number: row.get(7)?,
        min_stock: row.get(8)?,
        max_stock: row.get(9)?,
        expiration_date: row
            .get::<_, Option<String>>(10)?
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}
