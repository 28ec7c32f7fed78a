// ==========================================
// 实验室采购运营系统 - 领域层
// ==========================================
// 职责: 导入管道的值对象（单元格/行/字段/映射/结果）与库存实体
// ==========================================

pub mod cell;
pub mod field;
pub mod inventory;
pub mod outcome;
pub mod staging;

// 重导出核心类型
pub use cell::{Cell, CellValue, Row};
pub use field::{CanonicalField, FieldKind, ImportKind};
pub use inventory::{InventoryItem, PurchaseRecord};
pub use outcome::{
    ApplyOutcome, CanonicalRecord, CommitOutcome, CommitResult, RowFailure, RowOutcome,
    RowValidationError, SummaryCounts,
};
pub use staging::{
    ColumnMapping, ExclusionSet, RowEdits, StagedFile, StagedFileSummary, TabularData,
};
