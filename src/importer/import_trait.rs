// ==========================================
// 实验室采购运营系统 - 导入管道 Trait
// ==========================================
// 职责: 定义解析器与领域写入接口（不包含实现）
// ==========================================

use crate::domain::{ApplyOutcome, CanonicalRecord, TabularData};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// TabularDecoder Trait
// ==========================================
// 用途: 上传字节 → 表头 + 行
// 实现者: CsvDecoder, ExcelDecoder, UniversalDecoder
pub trait TabularDecoder: Send + Sync {
    /// 解析上传内容
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - filename: 原始文件名（用于错误信息/格式判定）
    ///
    /// # 返回
    /// - Ok(TabularData): 有序表头 + 行（row_number 从 1 开始）
    /// - Err: 格式不支持、内容损坏、缺少表头
    fn decode(&self, bytes: &[u8], filename: &str) -> ImportResult<TabularData>;
}

// ==========================================
// RecordApplier Trait
// ==========================================
// 用途: 提交阶段对单行执行 create-or-update
// 实现者: InventoryApplier, PurchaseHistoryApplier（以及测试替身）
//
// 前置条件: 实现必须幂等（以记录内容派生的自然键识别实体），
// 这样整批重试不会产生重复记录
#[async_trait]
pub trait RecordApplier: Send + Sync {
    /// 写入一条标准记录
    ///
    /// # 返回
    /// - Ok(Created | Updated)
    /// - Err: 约束冲突、下游超时等；提交引擎记录为该行 Failed 并继续
    async fn apply(&self, record: &CanonicalRecord) -> ImportResult<ApplyOutcome>;
}
