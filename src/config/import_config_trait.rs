// ==========================================
// 实验室采购运营系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 预览样本行数
    ///
    /// # 默认值
    /// - 20
    async fn get_preview_sample_size(&self) -> ConfigResult<usize>;

    /// 提交结果中失败样本上限
    ///
    /// # 默认值
    /// - 20
    async fn get_error_sample_cap(&self) -> ConfigResult<usize>;

    /// 暂存文件有效期（秒）
    ///
    /// # 默认值
    /// - 1800
    async fn get_staging_ttl_secs(&self) -> ConfigResult<u64>;

    /// 上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 10 MiB
    async fn get_max_upload_bytes(&self) -> ConfigResult<usize>;

    /// 提交时并发写入数
    ///
    /// # 默认值
    /// - 1（顺序写入）
    async fn get_commit_concurrency(&self) -> ConfigResult<usize>;

    /// 提交完成后是否保留暂存文件
    ///
    /// # 默认值
    /// - false
    async fn get_retain_after_commit(&self) -> ConfigResult<bool>;
}

// ==========================================
// ImportConfig - 导入管道配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub preview_sample_size: usize,
    pub error_sample_cap: usize,
    pub staging_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub commit_concurrency: usize,
    pub retain_after_commit: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            preview_sample_size: 20,
            error_sample_cap: 20,
            staging_ttl_secs: 1800,
            max_upload_bytes: 10 * 1024 * 1024,
            commit_concurrency: 1,
            retain_after_commit: false,
        }
    }
}

impl ImportConfig {
    /// 从配置读取器加载完整配置
    pub async fn load(reader: &dyn ImportConfigReader) -> ConfigResult<Self> {
        Ok(Self {
            preview_sample_size: reader.get_preview_sample_size().await?,
            error_sample_cap: reader.get_error_sample_cap().await?,
            staging_ttl_secs: reader.get_staging_ttl_secs().await?,
            max_upload_bytes: reader.get_max_upload_bytes().await?,
            commit_concurrency: reader.get_commit_concurrency().await?,
            retain_after_commit: reader.get_retain_after_commit().await?,
        })
    }
}
