//! 确认能力 - 业务能力层
//!
//! 破坏性操作（删题、未答完就交卷）在执行前都要过这一道确认。
//! 拒绝是正常结果而不是错误，读取失败也按拒绝处理。

use std::io::{self, Write};

use async_trait::async_trait;
use tracing::debug;

/// 确认能力
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// 向用户征求确认，返回是否同意
    async fn confirm(&self, prompt: &str) -> bool;
}

/// 标准输入确认：打印提示并读一行答复
pub struct StdinGate;

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = format!("{} [y/N] ", prompt);

        let answer = tokio::task::spawn_blocking(move || {
            print!("{}", prompt);
            io::stdout().flush().ok();

            let mut line = String::new();
            io::stdin().read_line(&mut line).map(|_| line).ok()
        })
        .await;

        match answer {
            Ok(Some(line)) => {
                matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "是")
            }
            _ => {
                debug!("读取确认答复失败，按拒绝处理");
                false
            }
        }
    }
}

/// 固定答复确认：批量模式与测试使用
pub struct FixedGate(pub bool);

#[async_trait]
impl ConfirmationGate for FixedGate {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_gate_returns_configured_answer() {
        assert!(FixedGate(true).confirm("确认？").await);
        assert!(!FixedGate(false).confirm("确认？").await);
    }
}
