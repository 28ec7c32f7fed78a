// ==========================================
// 实验室采购运营系统 - 配置管理器
// ==========================================
// 职责: 配置查询与覆写
// 存储: config_kv 表 (scope_id + key → value)，未配置项使用默认值
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfig, ImportConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const PREVIEW_SAMPLE_SIZE: &str = "import_preview_sample_size";
    pub const ERROR_SAMPLE_CAP: &str = "import_error_sample_cap";
    pub const STAGING_TTL_SECS: &str = "import_staging_ttl_secs";
    pub const MAX_UPLOAD_BYTES: &str = "import_max_upload_bytes";
    pub const COMMIT_CONCURRENCY: &str = "import_commit_concurrency";
    pub const RETAIN_AFTER_COMMIT: &str = "import_retain_after_commit";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 所有 global 配置（按 key 排序）
    pub fn list_configs(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut configs = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            configs.insert(key, value);
        }
        Ok(configs)
    }

    /// 读取并解析配置，缺失或格式错误时回退默认值
    fn get_parsed_or_default<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key = %key, value = %raw, "配置值格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_preview_sample_size(&self) -> ConfigResult<usize> {
        let default = ImportConfig::default().preview_sample_size;
        self.get_parsed_or_default(config_keys::PREVIEW_SAMPLE_SIZE, default)
    }

    async fn get_error_sample_cap(&self) -> ConfigResult<usize> {
        let default = ImportConfig::default().error_sample_cap;
        self.get_parsed_or_default(config_keys::ERROR_SAMPLE_CAP, default)
    }

    async fn get_staging_ttl_secs(&self) -> ConfigResult<u64> {
        let default = ImportConfig::default().staging_ttl_secs;
        self.get_parsed_or_default(config_keys::STAGING_TTL_SECS, default)
    }

    async fn get_max_upload_bytes(&self) -> ConfigResult<usize> {
        let default = ImportConfig::default().max_upload_bytes;
        self.get_parsed_or_default(config_keys::MAX_UPLOAD_BYTES, default)
    }

    async fn get_commit_concurrency(&self) -> ConfigResult<usize> {
        let value = self.get_parsed_or_default(config_keys::COMMIT_CONCURRENCY, 1usize)?;
        Ok(value.max(1))
    }

    async fn get_retain_after_commit(&self) -> ConfigResult<bool> {
        let value = self
            .get_config_value(config_keys::RETAIN_AFTER_COMMIT)?
            .unwrap_or_default();
        Ok(matches!(
            value.trim().to_uppercase().as_str(),
            "1" | "Y" | "TRUE" | "YES"
        ))
    }
}
