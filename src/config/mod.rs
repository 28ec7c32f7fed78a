// ==========================================
// 实验室采购运营系统 - 配置层
// ==========================================
// 职责: 导入管道配置（样本大小、失败样本上限、暂存有效期等）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ConfigResult, ImportConfig, ImportConfigReader};
