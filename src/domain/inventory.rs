// ==========================================
// 实验室采购运营系统 - 库存与采购记录
// ==========================================
// 职责: 领域存储中的实体（导入的最终落点）
// 自然键:
// - InventoryItem: (catalog_number, vendor)，无货号时按 product_name
// - PurchaseRecord: (po_number, catalog_number | product_name, order_date)
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 库存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub product_name: String,
    pub catalog_number: Option<String>,
    pub vendor: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub lot_number: Option<String>,
    pub min_stock: Option<f64>,
    pub max_stock: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
}

/// 采购历史记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub product_name: String,
    pub vendor: Option<String>,
    pub catalog_number: Option<String>,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    pub order_date: Option<NaiveDate>,
    pub po_number: Option<String>,
}

impl PurchaseRecord {
    /// 总价缺失时按 数量 × 单价 推算
    pub fn effective_total_price(&self) -> Option<f64> {
        self.total_price
            .or_else(|| self.unit_price.map(|price| price * self.quantity))
    }
}
