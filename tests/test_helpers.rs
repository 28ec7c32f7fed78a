// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试文件内容等功能
// ==========================================

#![allow(dead_code)]

use lab_import_staging::db::{init_schema, open_sqlite_connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 三行库存文件，第 2 行缺少产品名
pub const INVENTORY_CSV: &str = "\
Product Name,Catalog Number,Vendor,Qty On Hand,Expiration Date
Pipette tips 200uL,T-200,Eppendorf,10,2027-01-31
,E7023,Sigma,5,2026-12-01
Nitrile gloves M,G-M,VWR,\"1,200\",
";

/// 采购历史文件
pub const PURCHASE_CSV: &str = "\
Item,Supplier,Cat No,Quantity,Unit Price,Order Date,PO
Agarose,Bio-Rad,161-3101,2,30.5,2026-01-15,PO-1001
Tris base,Sigma,T1503,1,45,2026/01/20,PO-1002
";
