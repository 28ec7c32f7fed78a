// ==========================================
// 实验室采购运营系统 - 领域写入实现
// ==========================================
// 职责: CanonicalRecord → 领域实体 → 仓储 upsert
// 前置条件: 记录已通过行校验；按自然键 upsert 保证重复写入幂等
// ==========================================

use crate::domain::{ApplyOutcome, CanonicalRecord, InventoryItem, PurchaseRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::RecordApplier;
use crate::importer::row_validator::parse_date;
use crate::repository::{InventoryRepository, PurchaseHistoryRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

fn required_text(record: &CanonicalRecord, key: &str) -> ImportResult<String> {
    record
        .text(key)
        .ok_or_else(|| ImportError::ApplyFailed(format!("{} is required", key)))
}

fn required_number(record: &CanonicalRecord, key: &str) -> ImportResult<f64> {
    record
        .number(key)
        .ok_or_else(|| ImportError::ApplyFailed(format!("{} is required", key)))
}

fn date(record: &CanonicalRecord, key: &str) -> Option<NaiveDate> {
    record.text(key).and_then(|s| parse_date(&s))
}

impl InventoryItem {
    /// 从标准记录构建库存条目
    pub fn from_record(record: &CanonicalRecord) -> ImportResult<Self> {
        Ok(Self {
            product_name: required_text(record, "productName")?,
            catalog_number: record.text("catalogNumber"),
            vendor: record.text("vendor"),
            quantity: required_number(record, "quantity")?,
            unit: record.text("unit"),
            location: record.text("location"),
            lot_number: record.text("lotNumber"),
            min_stock: record.number("minStock"),
            max_stock: record.number("maxStock"),
            expiration_date: date(record, "expirationDate"),
        })
    }
}

impl PurchaseRecord {
    /// 从标准记录构建采购记录
    pub fn from_record(record: &CanonicalRecord) -> ImportResult<Self> {
        Ok(Self {
            product_name: required_text(record, "productName")?,
            vendor: record.text("vendor"),
            catalog_number: record.text("catalogNumber"),
            quantity: required_number(record, "quantity")?,
            unit_price: record.number("unitPrice"),
            total_price: record.number("totalPrice"),
            order_date: date(record, "orderDate"),
            po_number: record.text("poNumber"),
        })
    }
}

// ==========================================
// InventoryApplier
// ==========================================
pub struct InventoryApplier {
    repo: Arc<InventoryRepository>,
}

impl InventoryApplier {
    pub fn new(repo: Arc<InventoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RecordApplier for InventoryApplier {
    async fn apply(&self, record: &CanonicalRecord) -> ImportResult<ApplyOutcome> {
        let item = InventoryItem::from_record(record)?;
        let outcome = self.repo.upsert(&item)?;
        debug!(row_number = record.row_number, outcome = ?outcome, "库存条目已写入");
        Ok(outcome)
    }
}

// ==========================================
// PurchaseHistoryApplier
// ==========================================
pub struct PurchaseHistoryApplier {
    repo: Arc<PurchaseHistoryRepository>,
}

impl PurchaseHistoryApplier {
    pub fn new(repo: Arc<PurchaseHistoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RecordApplier for PurchaseHistoryApplier {
    async fn apply(&self, record: &CanonicalRecord) -> ImportResult<ApplyOutcome> {
        let purchase = PurchaseRecord::from_record(record)?;
        let outcome = self.repo.upsert(&purchase)?;
        debug!(row_number = record.row_number, outcome = ?outcome, "采购记录已写入");
        Ok(outcome)
    }
}
