// ==========================================
// 实验室采购运营系统 - 导入模板生成
// ==========================================
// 职责: 按导入类型输出仅含表头的 CSV 模板（字段 label 作为表头）
// 说明: 模板表头与字段 label 一致，回传后可被列映射精确命中
// ==========================================

use crate::domain::ImportKind;
use crate::importer::error::{ImportError, ImportResult};

/// 生成导入模板
pub fn render_template(kind: ImportKind) -> ImportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(kind.fields().iter().map(|f| f.label))?;
    writer
        .into_inner()
        .map_err(|e| ImportError::InternalError(format!("模板写出失败: {}", e)))
}
