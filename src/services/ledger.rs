//! 已保存信封列表 - 业务能力层
//!
//! 只负责"记住创建过哪些信封"，让用户在下次启动时继续签署。
//! 远程服务没有"列出我的信封"接口，所以本地保存一份信封 ID 列表。
//!
//! 存储格式是一个 JSON 数组，元素为 `SavedEnvelopeRecord`；
//! 文件缺失、无法解析或不是数组时一律视为空列表。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::api::EnvelopeStatus;
use crate::error::{AppError, AppResult};

/// 浏览器版本使用的 localStorage 键名，也用作默认文件名
pub const STORAGE_KEY: &str = "subnoto_embedded_demo_envelopes";

/// 一条已保存的信封记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEnvelopeRecord {
    pub envelope_uuid: String,
    /// 创建时间（Unix 毫秒）
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_email: Option<String>,
}

/// 查询信封当前状态的能力
#[async_trait]
pub trait StatusLookup: Send + Sync {
    async fn lookup_status(&self, envelope_uuid: &str) -> AppResult<EnvelopeStatus>;
}

/// 一次状态扫描的结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatusScan {
    /// 仍可继续签署的记录（保持原顺序）
    pub unsigned: Vec<SavedEnvelopeRecord>,
    /// 已进入终态的信封 ID
    pub terminal: Vec<String>,
    /// 查询失败被跳过的数量
    pub unknown: usize,
}

/// 已保存信封列表
pub struct EnvelopeLedger {
    path: PathBuf,
}

impl EnvelopeLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录，任何读取或格式问题都返回空列表
    pub fn load(&self) -> Vec<SavedEnvelopeRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("读取 {} 失败，视为空列表: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                debug!("{} 不是合法 JSON，视为空列表: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let Some(items) = parsed.as_array() else {
            debug!("{} 不是数组，视为空列表", self.path.display());
            return Vec::new();
        };

        let mut records: Vec<SavedEnvelopeRecord> = Vec::with_capacity(items.len());
        for item in items {
            match parse_record(item) {
                Some(record) => {
                    if !records.iter().any(|r| r.envelope_uuid == record.envelope_uuid) {
                        records.push(record);
                    }
                }
                None => debug!("跳过格式不正确的记录: {}", item),
            }
        }
        records
    }

    /// 保存信封
    ///
    /// 已存在时只更新签署人邮箱；没有新邮箱则不写文件
    pub fn save(&self, envelope_uuid: &str, signer_email: Option<&str>) -> AppResult<()> {
        let mut records = self.load();

        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.envelope_uuid == envelope_uuid)
        {
            let Some(email) = signer_email else {
                return Ok(());
            };
            existing.signer_email = Some(email.to_string());
            return self.write(&records);
        }

        records.push(SavedEnvelopeRecord {
            envelope_uuid: envelope_uuid.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            signer_email: signer_email.map(|s| s.to_string()),
        });
        self.write(&records)
    }

    /// 删除指定信封，返回删除数量
    pub fn prune(&self, envelope_uuids: &[String]) -> AppResult<usize> {
        if envelope_uuids.is_empty() {
            return Ok(0);
        }

        let mut records = self.load();
        let before = records.len();
        records.retain(|r| !envelope_uuids.contains(&r.envelope_uuid));
        let removed = before - records.len();

        if removed > 0 {
            self.write(&records)?;
            info!("🗑️ 已从列表移除 {} 个已结束的信封", removed);
        }
        Ok(removed)
    }

    fn write(&self, records: &[SavedEnvelopeRecord]) -> AppResult<()> {
        let path_str = self.path.display().to_string();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::storage(&path_str, e))?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| AppError::storage(&path_str, e))?;
        fs::write(&self.path, json).map_err(|e| AppError::storage(&path_str, e))?;

        debug!("已写入 {} 条记录到 {}", records.len(), path_str);
        Ok(())
    }
}

/// 逐条查询状态，区分可继续签署 / 已结束 / 查询失败
pub async fn scan<L>(records: Vec<SavedEnvelopeRecord>, lookup: &L) -> StatusScan
where
    L: StatusLookup + ?Sized,
{
    let mut result = StatusScan::default();

    for record in records {
        match lookup.lookup_status(&record.envelope_uuid).await {
            Ok(status) if status.is_unsigned() => result.unsigned.push(record),
            Ok(status) => {
                debug!("信封 {} 已结束: {}", record.envelope_uuid, status);
                result.terminal.push(record.envelope_uuid);
            }
            Err(e) => {
                // 单条失败不影响其余记录的展示
                debug!("信封 {} 状态未知，跳过: {}", record.envelope_uuid, e);
                result.unknown += 1;
            }
        }
    }

    result
}

/// 只保留仍可继续签署的记录
pub async fn filter_unsigned<L>(
    records: Vec<SavedEnvelopeRecord>,
    lookup: &L,
) -> Vec<SavedEnvelopeRecord>
where
    L: StatusLookup + ?Sized,
{
    scan(records, lookup).await.unsigned
}

fn parse_record(item: &Value) -> Option<SavedEnvelopeRecord> {
    let envelope_uuid = item.get("envelopeUuid")?.as_str()?.to_string();
    let created_at = item.get("createdAt")?;
    let created_at = created_at
        .as_i64()
        .or_else(|| created_at.as_f64().map(|f| f as i64))?;
    let signer_email = item
        .get("signerEmail")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Some(SavedEnvelopeRecord {
        envelope_uuid,
        created_at,
        signer_email,
    })
}
