// ==========================================
// 实验室采购运营系统 - API 层
// ==========================================
// 职责: 提供导入管道的业务 API 接口,供上层（HTTP/CLI）调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{CommitRequest, ImportApi, PreviewRequest, PreviewResponse};
