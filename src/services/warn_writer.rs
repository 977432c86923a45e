//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 警告写入服务
///
/// 职责：
/// - 将处理失败的题目与脚本写入 warn.txt
/// - 只处理单条警告
/// - 不关心流程顺序
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 创建新的警告写入服务
    pub fn new() -> Self {
        Self {
            warn_file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 写入警告信息
    ///
    /// # 参数
    /// - `assessment_id`: 考核ID
    /// - `question_id`: 题目ID（整份考核的警告填 0）
    /// - `reason`: 失败原因
    ///
    /// # 返回
    /// 返回是否成功写入
    pub async fn write(&self, assessment_id: i64, question_id: i64, reason: &str) -> Result<()> {
        debug!(
            "写入警告: 考核 {} | 题目 {} | 原因长度: {}",
            assessment_id,
            question_id,
            reason.len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)?;

        let warn_msg = format!("考核 {} | 题目 {} | {}\n", assessment_id, question_id, reason);

        file.write_all(warn_msg.as_bytes())?;

        Ok(())
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}
