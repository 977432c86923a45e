//! # ITS Assessment Client
//!
//! 一个用于智能辅导系统考核作答与出题的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 领域数据：考核、题目、作答、提交、成绩
//! - `QuestionDraft` - 出题表单草稿，校验后才会变成题目
//! - `AnswerLedger` - 作答台账，按题目去重收集作答
//!
//! ### ② 业务能力层（Services & Clients）
//! - `services/` - 描述"我能做什么"，定义后端能力面
//! - `AssessmentService` - 考核后端能力（列取 / 出题 / 提交 / 评分）
//! - `ConfirmationGate` - 确认能力（危险操作前要点头）
//! - `WarnWriter` - 写 warn.txt 能力
//! - `clients/` - HTTP 后端实现
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次作答 / 一次出题"的完整流程
//! - `AssessmentRunner` - 作答状态机（加载 → 作答 → 提交）
//! - `AssessmentEditor` - 出题表单流程（草稿 → 校验 → 保存）
//! - `GradingFlow` - 评分流程（逐题给分 → 汇总定稿）
//!
//! ### ④ 编排层（Orchestration）
//! - `app` - 扫描脚本、分批并发、汇总统计
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;

pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::AssessmentApi;
pub use config::{Config, RunMode};
pub use error::{AppError, AppResult, ServiceError};
pub use models::{AnswerLedger, Assessment, Question, QuestionKind};
pub use services::{AssessmentService, MemoryAssessmentService};
pub use workflow::{
    AssessmentEditor, AssessmentRunner, DeleteOutcome, GradingFlow, RunnerState, SubmitOutcome,
};
