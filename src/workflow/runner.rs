//! 作答流程 - 流程层
//!
//! 核心职责：定义学生"作答一份考核"的完整流程
//!
//! 状态机：
//! 1. Loading → Ready（加载成功）/ LoadFailed（终态）
//! 2. Ready → Ready（翻题、作答）
//! 3. Ready → Submitting → Submitted（终态）
//! 4. Submitting → Ready（提交失败，可重试，台账保留）

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppResult, BusinessError};
use crate::models::assessment::{Assessment, Question, QuestionKind};
use crate::models::ledger::AnswerLedger;
use crate::models::submission::{Answer, AnswerValue, Submission};
use crate::services::{AssessmentService, ConfirmationGate};

/// 作答状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// 正在加载考核
    Loading,
    /// 作答中
    Ready,
    /// 提交请求已发出
    Submitting,
    /// 已提交（终态）
    Submitted,
    /// 考核加载失败（终态）
    LoadFailed,
}

impl RunnerState {
    pub fn name(self) -> &'static str {
        match self {
            RunnerState::Loading => "加载中",
            RunnerState::Ready => "作答中",
            RunnerState::Submitting => "提交中",
            RunnerState::Submitted => "已提交",
            RunnerState::LoadFailed => "加载失败",
        }
    }
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 提交动作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 提交成功
    Submitted,
    /// 用户拒绝提交未完成的作答，继续作答
    Cancelled,
}

/// 作答流程
///
/// 职责：
/// - 持有本次作答的考核快照与作答台账（唯一所有者）
/// - 校验每一次作答（题目存在、类型匹配、选项在范围内）
/// - 管理状态转换，已提交的记录不再可变
pub struct AssessmentRunner {
    service: Arc<dyn AssessmentService>,
    gate: Arc<dyn ConfirmationGate>,
    student_id: i64,
    state: RunnerState,
    assessment: Option<Assessment>,
    ledger: AnswerLedger,
    current_index: usize,
    submission: Option<Submission>,
}

impl AssessmentRunner {
    /// 创建新的作答流程
    pub fn new(
        service: Arc<dyn AssessmentService>,
        gate: Arc<dyn ConfirmationGate>,
        student_id: i64,
    ) -> Self {
        Self {
            service,
            gate,
            student_id,
            state: RunnerState::Loading,
            assessment: None,
            ledger: AnswerLedger::new(),
            current_index: 0,
            submission: None,
        }
    }

    /// 加载考核并进入作答状态
    ///
    /// 服务端返回的考核 id 必须与请求的一致，不一致按加载失败处理。
    pub async fn load(&mut self, assessment_id: i64) -> AppResult<()> {
        if self.state != RunnerState::Loading {
            return Err(BusinessError::AttemptNotReady {
                state: self.state.to_string(),
            }
            .into());
        }

        info!("[考核 {}] 📦 正在加载考核...", assessment_id);

        let mut assessment = match self.service.get_assessment(assessment_id).await {
            Ok(assessment) => assessment,
            Err(e) => {
                self.state = RunnerState::LoadFailed;
                warn!("[考核 {}] ❌ 加载失败: {}", assessment_id, e);
                return Err(e.into());
            }
        };

        if assessment.id != assessment_id {
            self.state = RunnerState::LoadFailed;
            warn!(
                "[考核 {}] ❌ 服务端返回了考核 {}，按加载失败处理",
                assessment_id, assessment.id
            );
            return Err(BusinessError::AssessmentMismatch {
                expected: assessment_id,
                actual: assessment.id,
            }
            .into());
        }

        assessment.recalculate_total_score();

        info!(
            "[考核 {}] ✓ 加载完成《{}》，共 {} 题，总分 {}",
            assessment_id,
            assessment.title,
            assessment.question_count(),
            assessment.total_score
        );

        self.assessment = Some(assessment);
        self.current_index = 0;
        self.state = RunnerState::Ready;
        Ok(())
    }

    /// 下一题；最后一题停在原地（提交动作取代"下一题"）
    pub fn go_next(&mut self) -> AppResult<()> {
        let count = self.require_ready()?.question_count();
        if count > 0 && self.current_index + 1 < count {
            self.current_index += 1;
        }
        Ok(())
    }

    /// 上一题；第一题停在原地
    pub fn go_previous(&mut self) -> AppResult<()> {
        self.require_ready()?;
        if self.current_index > 0 {
            self.current_index -= 1;
        }
        Ok(())
    }

    /// 跳转到指定题目，越界报错
    pub fn jump_to(&mut self, index: usize) -> AppResult<()> {
        let count = self.require_ready()?.question_count();
        if index >= count {
            return Err(BusinessError::QuestionIndexOutOfRange {
                index,
                question_count: count,
            }
            .into());
        }
        self.current_index = index;
        Ok(())
    }

    /// 记录一道题的作答，已有作答则覆盖
    ///
    /// # 参数
    /// - `question_id`: 必须属于当前考核
    /// - `value`: 变体必须与题目类型匹配；选择题的选项索引必须在范围内
    pub fn record_answer(&mut self, question_id: i64, value: AnswerValue) -> AppResult<()> {
        let assessment = self.require_ready()?;

        let question =
            assessment
                .find_question(question_id)
                .ok_or(BusinessError::QuestionMissing { question_id })?;

        if !value.matches(&question.kind) {
            return Err(BusinessError::AnswerTypeMismatch { question_id }.into());
        }

        if let (QuestionKind::Mcq { options, .. }, AnswerValue::Choice(index)) =
            (&question.kind, &value)
        {
            if *index >= options.len() {
                return Err(BusinessError::OptionIndexOutOfRange {
                    index: *index,
                    option_count: options.len(),
                }
                .into());
            }
        }

        self.ledger.record(Answer {
            id: None,
            question_id,
            value,
            score: None,
        });
        Ok(())
    }

    /// 提交本次作答
    ///
    /// 未答完时先过确认门，拒绝则返回 `Cancelled` 且一切保持原样。
    /// 台账按考核的题目顺序序列化后发给服务端；
    /// 提交失败回到作答状态，台账保留，可直接重试。
    pub async fn submit(&mut self) -> AppResult<SubmitOutcome> {
        let (assessment_id, total) = {
            let assessment = self.require_ready()?;
            (assessment.id, assessment.question_count())
        };
        let answered = self.ledger.len();

        if answered < total {
            info!(
                "[考核 {}] ⚠️ 已作答 {}/{} 题，仍有 {} 题未作答",
                assessment_id,
                answered,
                total,
                total - answered
            );
            let prompt = format!(
                "已作答 {}/{} 题，确定提交未完成的作答吗？",
                answered, total
            );
            if !self.gate.confirm(&prompt).await {
                info!("[考核 {}] 已取消提交，继续作答", assessment_id);
                return Ok(SubmitOutcome::Cancelled);
            }
        }

        let answers = match &self.assessment {
            Some(assessment) => self.ledger.snapshot_in_order(&assessment.questions),
            None => Vec::new(),
        };

        self.state = RunnerState::Submitting;
        info!(
            "[考核 {}] 📤 正在提交 {} 条作答...",
            assessment_id,
            answers.len()
        );

        match self
            .service
            .submit_assessment(assessment_id, self.student_id, answers)
            .await
        {
            Ok(submission) => {
                info!(
                    "[考核 {}] ✅ 提交成功，提交ID: {}",
                    assessment_id,
                    submission
                        .id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "未知".to_string())
                );
                self.state = RunnerState::Submitted;
                self.ledger.clear();
                self.submission = Some(submission);
                Ok(SubmitOutcome::Submitted)
            }
            Err(e) => {
                warn!("[考核 {}] ❌ 提交失败，可重试: {}", assessment_id, e);
                self.state = RunnerState::Ready;
                Err(e.into())
            }
        }
    }

    // ========== 只读视图 ==========

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    /// 提交成功后的服务端记录
    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.assessment
            .as_ref()
            .and_then(|a| a.questions.get(self.current_index))
    }

    pub fn question_count(&self) -> usize {
        self.assessment
            .as_ref()
            .map(|a| a.question_count())
            .unwrap_or(0)
    }

    /// 已作答题数（由台账推导，不单独存储）
    pub fn answered_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_answered(&self, question_id: i64) -> bool {
        self.ledger.answered(question_id)
    }

    /// 进度：按当前位置推导，(当前序号 + 1) / 总题数
    pub fn progress_percent(&self) -> f64 {
        let total = self.question_count();
        if total == 0 {
            return 0.0;
        }
        (self.current_index + 1) as f64 / total as f64 * 100.0
    }

    pub fn is_last_question(&self) -> bool {
        let total = self.question_count();
        total > 0 && self.current_index == total - 1
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// 取出作答状态下的考核，其他状态给出对应的业务错误
    fn require_ready(&self) -> Result<&Assessment, BusinessError> {
        match self.state {
            RunnerState::Submitted => Err(BusinessError::AttemptAlreadySubmitted),
            RunnerState::Ready => {
                self.assessment
                    .as_ref()
                    .ok_or(BusinessError::AttemptNotReady {
                        state: self.state.to_string(),
                    })
            }
            _ => Err(BusinessError::AttemptNotReady {
                state: self.state.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ServiceError};
    use crate::models::assessment::AssessmentType;
    use crate::services::{FixedGate, MemoryAssessmentService};

    fn two_question_assessment() -> Assessment {
        Assessment {
            id: 1,
            title: "数学小测".to_string(),
            description: String::new(),
            kind: AssessmentType::Quiz,
            course_id: 2,
            questions: vec![
                Question {
                    id: 1,
                    text: "4 + 4 = ?".to_string(),
                    score: 10.0,
                    kind: QuestionKind::Mcq {
                        options: vec![
                            "6".to_string(),
                            "8".to_string(),
                            "9".to_string(),
                            "5".to_string(),
                        ],
                        correct_option_index: 1,
                    },
                },
                Question {
                    id: 2,
                    text: "说明通分的步骤".to_string(),
                    score: 20.0,
                    kind: QuestionKind::Essay {
                        rubric: None,
                        max_length_answer: Some(500),
                    },
                },
            ],
            total_score: 0.0,
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn runner_with(gate: FixedGate) -> (Arc<MemoryAssessmentService>, AssessmentRunner) {
        let service = Arc::new(MemoryAssessmentService::with_assessments(vec![
            two_question_assessment(),
        ]));
        let runner = AssessmentRunner::new(service.clone(), Arc::new(gate), 3);
        (service, runner)
    }

    #[tokio::test]
    async fn load_failure_is_terminal() {
        let service = Arc::new(MemoryAssessmentService::new());
        let mut runner = AssessmentRunner::new(service, Arc::new(FixedGate(true)), 3);

        assert!(runner.load(99).await.is_err());
        assert_eq!(runner.state(), RunnerState::LoadFailed);
        assert!(runner.record_answer(1, AnswerValue::Choice(0)).is_err());
    }

    #[tokio::test]
    async fn navigation_clamps_at_both_edges() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();

        runner.go_previous().unwrap();
        assert_eq!(runner.current_index(), 0);
        assert!(!runner.is_last_question());

        runner.go_next().unwrap();
        assert_eq!(runner.current_index(), 1);
        assert!(runner.is_last_question());

        runner.go_next().unwrap();
        assert_eq!(runner.current_index(), 1);

        assert!(runner.jump_to(2).is_err());
        runner.jump_to(0).unwrap();
        assert_eq!(runner.current_index(), 0);
    }

    #[tokio::test]
    async fn record_answer_validates_question_and_type() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();

        let missing = runner.record_answer(99, AnswerValue::Choice(0));
        assert!(matches!(
            missing,
            Err(AppError::Business(BusinessError::QuestionMissing { question_id: 99 }))
        ));

        let mismatch = runner.record_answer(1, AnswerValue::Text("八".to_string()));
        assert!(matches!(
            mismatch,
            Err(AppError::Business(BusinessError::AnswerTypeMismatch { .. }))
        ));

        let out_of_range = runner.record_answer(1, AnswerValue::Choice(4));
        assert!(matches!(
            out_of_range,
            Err(AppError::Business(BusinessError::OptionIndexOutOfRange { .. }))
        ));

        assert_eq!(runner.answered_count(), 0);
    }

    // 服务端或种子数据可能带来没有选项的选择题，作答必须报错而不是崩溃
    #[tokio::test]
    async fn mcq_without_options_rejects_any_choice() {
        let degenerate = Assessment {
            questions: vec![Question {
                id: 1,
                text: "4 + 4 = ?".to_string(),
                score: 10.0,
                kind: QuestionKind::Mcq {
                    options: Vec::new(),
                    correct_option_index: 0,
                },
            }],
            ..two_question_assessment()
        };
        let service = Arc::new(MemoryAssessmentService::with_assessments(vec![degenerate]));
        let mut runner = AssessmentRunner::new(service, Arc::new(FixedGate(true)), 3);
        runner.load(1).await.unwrap();

        let rejected = runner.record_answer(1, AnswerValue::Choice(0));
        assert!(matches!(
            rejected,
            Err(AppError::Business(BusinessError::OptionIndexOutOfRange {
                index: 0,
                option_count: 0,
            }))
        ));
        assert_eq!(runner.answered_count(), 0);
    }

    #[tokio::test]
    async fn recording_overwrites_instead_of_duplicating() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();

        runner.record_answer(1, AnswerValue::Choice(0)).unwrap();
        runner.record_answer(1, AnswerValue::Choice(0)).unwrap();
        runner.record_answer(1, AnswerValue::Choice(1)).unwrap();

        assert_eq!(runner.answered_count(), 1);
    }

    #[tokio::test]
    async fn declining_partial_submit_keeps_everything() {
        let (_, mut runner) = runner_with(FixedGate(false));
        runner.load(1).await.unwrap();
        runner.record_answer(1, AnswerValue::Choice(1)).unwrap();

        let outcome = runner.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Cancelled);
        assert_eq!(runner.state(), RunnerState::Ready);
        assert_eq!(runner.answered_count(), 1);
        assert!(runner.submission().is_none());
    }

    #[tokio::test]
    async fn accepting_partial_submit_sends_answered_entries_only() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();
        runner.record_answer(1, AnswerValue::Choice(1)).unwrap();

        let outcome = runner.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Submitted);
        assert_eq!(runner.state(), RunnerState::Submitted);
        let submission = runner.submission().unwrap();
        assert_eq!(submission.answers.len(), 1);
        assert_eq!(submission.answers[0].question_id, 1);
    }

    #[tokio::test]
    async fn failed_submit_returns_to_ready_and_keeps_ledger() {
        let (service, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();
        runner.record_answer(1, AnswerValue::Choice(1)).unwrap();
        runner
            .record_answer(2, AnswerValue::Text("先求最小公倍数".to_string()))
            .unwrap();

        service.set_fail_next(ServiceError::BadResponse {
            endpoint: "/v1/assessments/1/submit".to_string(),
            status: 503,
            message: None,
        });

        let failed = runner.submit().await;
        assert!(failed.is_err());
        assert_eq!(runner.state(), RunnerState::Ready);
        assert_eq!(runner.answered_count(), 2);

        let retried = runner.submit().await.unwrap();
        assert_eq!(retried, SubmitOutcome::Submitted);
        assert_eq!(runner.submission().unwrap().answers.len(), 2);
    }

    #[tokio::test]
    async fn submitted_state_rejects_further_mutation() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();
        runner.record_answer(1, AnswerValue::Choice(1)).unwrap();
        runner
            .record_answer(2, AnswerValue::Text("略".to_string()))
            .unwrap();
        runner.submit().await.unwrap();

        let recorded_total = runner.submission().unwrap().answers.len();

        let record = runner.record_answer(1, AnswerValue::Choice(0));
        assert!(matches!(
            record,
            Err(AppError::Business(BusinessError::AttemptAlreadySubmitted))
        ));
        assert!(runner.go_next().is_err());

        assert_eq!(runner.submission().unwrap().answers.len(), recorded_total);
    }

    #[tokio::test]
    async fn progress_follows_current_position() {
        let (_, mut runner) = runner_with(FixedGate(true));
        runner.load(1).await.unwrap();

        assert_eq!(runner.progress_percent(), 50.0);
        runner.go_next().unwrap();
        assert_eq!(runner.progress_percent(), 100.0);
    }
}
