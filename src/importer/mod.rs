// ==========================================
// 实验室采购运营系统 - 导入层
// ==========================================
// 职责: 上传文件 → 暂存 → 列映射/校验预览 → 覆写 → 提交 → 结果汇总
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod appliers;
pub mod column_mapper;
pub mod commit_engine;
pub mod error;
pub mod file_parser;
pub mod import_trait;
pub mod override_layer;
pub mod result_reporter;
pub mod row_validator;
pub mod staging_store;
pub mod template;

// 重导出核心类型
pub use appliers::{InventoryApplier, PurchaseHistoryApplier};
pub use column_mapper::{ColumnMapper, MatchRule};
pub use commit_engine::{CommitEngine, CommitReport, FailureReason};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvDecoder, ExcelDecoder, UniversalDecoder};
pub use override_layer::{EffectiveRow, OverrideLayer};
pub use result_reporter::ResultReporter;
pub use row_validator::RowValidator;
pub use staging_store::StagingStore;
pub use template::render_template;

// 重导出 Trait 接口
pub use import_trait::{RecordApplier, TabularDecoder};
