// ==========================================
// 实验室采购运营系统 - 采购历史仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 自然键: (po_number, catalog_number | product_name, order_date)
// ==========================================

use crate::domain::{ApplyOutcome, PurchaseRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 采购历史仓储
/// 职责: 管理 purchase_history 表的读写
pub struct PurchaseHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PurchaseHistoryRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按自然键写入（存在则更新，否则新增）
    pub fn upsert(&self, record: &PurchaseRecord) -> RepositoryResult<ApplyOutcome> {
        let conn = self.get_conn()?;
        let order_date = record.order_date.map(|d| d.format("%Y-%m-%d").to_string());
        let total_price = record.effective_total_price();

        let existing: Option<i64> = match &record.catalog_number {
            Some(catalog_number) => conn
                .query_row(
                    "SELECT purchase_id FROM purchase_history
                     WHERE po_number IS ?1 AND catalog_number = ?2 AND order_date IS ?3",
                    params![record.po_number, catalog_number, order_date],
                    |row| row.get(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT purchase_id FROM purchase_history
                     WHERE po_number IS ?1 AND catalog_number IS NULL
                       AND product_name = ?2 AND order_date IS ?3",
                    params![record.po_number, record.product_name, order_date],
                    |row| row.get(0),
                )
                .optional()?,
        };

        if let Some(purchase_id) = existing {
            conn.execute(
                r#"
                UPDATE purchase_history SET
                    product_name = ?1, vendor = ?2, quantity = ?3, unit_price = ?4,
                    total_price = ?5, updated_at = datetime('now')
                WHERE purchase_id = ?6
                "#,
                params![
                    record.product_name,
                    record.vendor,
                    record.quantity,
                    record.unit_price,
                    total_price,
                    purchase_id,
                ],
            )?;
            return Ok(ApplyOutcome::Updated);
        }

        conn.execute(
            r#"
            INSERT INTO purchase_history (
                product_name, vendor, catalog_number, quantity,
                unit_price, total_price, order_date, po_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.product_name,
                record.vendor,
                record.catalog_number,
                record.quantity,
                record.unit_price,
                total_price,
                order_date,
                record.po_number,
            ],
        )?;
        Ok(ApplyOutcome::Created)
    }

    /// 按 PO 号查询（按 purchase_id 升序）
    pub fn find_by_po_number(&self, po_number: &str) -> RepositoryResult<Vec<PurchaseRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT product_name, vendor, catalog_number, quantity,
                   unit_price, total_price, order_date, po_number
            FROM purchase_history
            WHERE po_number = ?1
            ORDER BY purchase_id
            "#,
        )?;

        let records = stmt
            .query_map(params![po_number], |row| {
                Ok(PurchaseRecord {
                    product_name: row.get(0)?,
                    vendor: row.get(1)?,
                    catalog_number: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_price: row.get(4)?,
                    total_price: row.get(5)?,
                    order_date: row
                        .get::<_, Option<String>>(6)?
                        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
                    po_number: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 记录总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM purchase_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
