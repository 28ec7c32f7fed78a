// ==========================================
// 实验室采购运营系统 - 标准字段定义
// ==========================================
// 职责: 每种导入类型的标准字段（key/label/必填/类型）
// 约束: 字段集合为静态配置，声明顺序即映射优先顺序
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// FieldKind - 字段值类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

// ==========================================
// CanonicalField - 标准字段描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalField {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl CanonicalField {
    pub const fn text(key: &'static str, label: &'static str, required: bool) -> Self {
        Self {
            key,
            label,
            required,
            kind: FieldKind::Text,
        }
    }

    pub const fn number(key: &'static str, label: &'static str, required: bool) -> Self {
        Self {
            key,
            label,
            required,
            kind: FieldKind::Number,
        }
    }

    pub const fn date(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            required: false,
            kind: FieldKind::Date,
        }
    }
}

// 库存导入
const INVENTORY_FIELDS: &[CanonicalField] = &[
    CanonicalField::text("productName", "Product Name", true),
    CanonicalField::text("catalogNumber", "Catalog Number", false),
    CanonicalField::text("vendor", "Vendor", false),
    CanonicalField::number("quantity", "Quantity", true),
    CanonicalField::text("unit", "Unit", false),
    CanonicalField::text("location", "Location", false),
    CanonicalField::text("lotNumber", "Lot Number", false),
    CanonicalField::number("minStock", "Min Stock", false),
    CanonicalField::number("maxStock", "Max Stock", false),
    CanonicalField::date("expirationDate", "Expiration Date"),
];

// 采购历史导入
const PURCHASE_HISTORY_FIELDS: &[CanonicalField] = &[
    CanonicalField::text("productName", "Product Name", true),
    CanonicalField::text("vendor", "Vendor", false),
    CanonicalField::text("catalogNumber", "Catalog Number", false),
    CanonicalField::number("quantity", "Quantity", true),
    CanonicalField::number("unitPrice", "Unit Price", false),
    CanonicalField::number("totalPrice", "Total Price", false),
    CanonicalField::date("orderDate", "Order Date"),
    CanonicalField::text("poNumber", "PO Number", false),
];

// ==========================================
// ImportKind - 导入类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    Inventory,
    PurchaseHistory,
}

impl ImportKind {
    /// 该导入类型的标准字段（声明顺序）
    pub fn fields(&self) -> &'static [CanonicalField] {
        match self {
            ImportKind::Inventory => INVENTORY_FIELDS,
            ImportKind::PurchaseHistory => PURCHASE_HISTORY_FIELDS,
        }
    }

    pub fn field(&self, key: &str) -> Option<&'static CanonicalField> {
        self.fields().iter().find(|f| f.key == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Inventory => "inventory",
            ImportKind::PurchaseHistory => "purchase-history",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "inventory" => Ok(ImportKind::Inventory),
            "purchase-history" | "purchasehistory" | "purchases" => Ok(ImportKind::PurchaseHistory),
            other => Err(format!("未知的导入类型: {}", other)),
        }
    }
}
