// ==========================================
// 实验室采购运营系统 - 表格批量导入核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 上传 → 暂存 → 映射/校验预览 → 人工修正 → 容错提交
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值对象与实体
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 暂存导入管道
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CanonicalField, CanonicalRecord, CellValue, ColumnMapping, CommitOutcome, CommitResult,
    ExclusionSet, ImportKind, Row, RowEdits, StagedFile,
};

// 导入管道
pub use importer::{
    ColumnMapper, CommitEngine, OverrideLayer, RecordApplier, ResultReporter, RowValidator,
    StagingStore,
};

// API
pub use api::{ApiError, CommitRequest, ImportApi, PreviewRequest};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "实验室采购运营系统 - 批量导入";
