//! 出题流程 - 流程层
//!
//! 核心职责：定义教师"编辑一份考核的题目"的完整流程
//!
//! 流程顺序：
//! 1. 打开表单（新建默认值 / 从已有题目回填）
//! 2. 本地校验 → 服务端调用 → 应用到本地聚合 → 重算总分
//! 3. 删除前过确认门，拒绝不算错误
//!
//! 任何一步失败都不改动本地聚合，表单保持打开可继续编辑。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppResult, BusinessError};
use crate::models::assessment::{Assessment, Question};
use crate::models::draft::QuestionDraft;
use crate::services::{AssessmentService, ConfirmationGate};
use crate::utils::logging::question_preview;

/// 表单模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// 新建题目
    Create,
    /// 编辑已有题目
    Edit(i64),
}

/// 删除动作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 已删除
    Deleted,
    /// 用户拒绝删除，一切保持原样
    Cancelled,
}

/// 出题流程
///
/// 职责：
/// - 持有被编辑的考核聚合（唯一所有者）
/// - 管理题目表单的打开、校验、提交
/// - 每次成功变更后重算总分
pub struct AssessmentEditor {
    service: Arc<dyn AssessmentService>,
    gate: Arc<dyn ConfirmationGate>,
    assessment: Assessment,
    form: Option<(EditorMode, QuestionDraft)>,
}

impl AssessmentEditor {
    /// 用已拿到的考核创建编辑流程
    pub fn new(
        service: Arc<dyn AssessmentService>,
        gate: Arc<dyn ConfirmationGate>,
        mut assessment: Assessment,
    ) -> Self {
        assessment.recalculate_total_score();
        Self {
            service,
            gate,
            assessment,
            form: None,
        }
    }

    /// 从服务端加载考核并创建编辑流程
    pub async fn open(
        service: Arc<dyn AssessmentService>,
        gate: Arc<dyn ConfirmationGate>,
        assessment_id: i64,
    ) -> AppResult<Self> {
        info!("[考核 {}] 📦 正在加载考核...", assessment_id);

        let assessment = service.get_assessment(assessment_id).await?;
        if assessment.id != assessment_id {
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

        info!(
            "[考核 {}] ✓ 加载完成《{}》，共 {} 题",
            assessment_id,
            assessment.title,
            assessment.question_count()
        );

        Ok(Self::new(service, gate, assessment))
    }

    /// 打开新建题目表单（默认值：选择题、10 分、四个空选项槽）
    pub fn open_create(&mut self) {
        self.form = Some((EditorMode::Create, QuestionDraft::default()));
    }

    /// 打开编辑表单并从已有题目回填
    pub fn open_edit(&mut self, question_id: i64) -> AppResult<()> {
        let question = self
            .assessment
            .find_question(question_id)
            .ok_or(BusinessError::QuestionMissing { question_id })?;

        self.form = Some((EditorMode::Edit(question_id), QuestionDraft::from_question(question)));
        Ok(())
    }

    /// 放弃当前表单
    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// 提交当前表单
    ///
    /// 校验不通过或服务端拒绝时，表单保持打开、聚合不变，可修改后重试。
    /// 成功后把服务端返回的题目应用到聚合并重算总分。
    pub async fn submit_form(&mut self) -> AppResult<Question> {
        let (mode, draft) = self.form.as_ref().ok_or(BusinessError::NoFormOpen)?;
        let mode = *mode;
        let input = draft.validate()?;

        let question = match mode {
            EditorMode::Create => {
                info!(
                    "[考核 {}] 📤 正在添加题目《{}》...",
                    self.assessment.id,
                    question_preview(&input.text, 20)
                );
                let question = self
                    .service
                    .create_question(self.assessment.id, input)
                    .await?;
                self.assessment.apply_created(question.clone());
                question
            }
            EditorMode::Edit(question_id) => {
                info!(
                    "[考核 {}] 📤 正在更新题目 {}...",
                    self.assessment.id, question_id
                );
                let question = self
                    .service
                    .update_question(self.assessment.id, question_id, input)
                    .await?;
                self.assessment.apply_updated(question.clone())?;
                question
            }
        };

        info!(
            "[考核 {}] ✅ 题目 {} 已保存，当前共 {} 题，总分 {}",
            self.assessment.id,
            question.id,
            self.assessment.question_count(),
            self.assessment.total_score
        );

        self.form = None;
        Ok(question)
    }

    /// 删除一道题目，执行前过确认门
    ///
    /// 拒绝返回 `Cancelled`，不是错误；服务端失败时聚合保持不变。
    pub async fn delete_question(&mut self, question_id: i64) -> AppResult<DeleteOutcome> {
        let preview = {
            let question = self
                .assessment
                .find_question(question_id)
                .ok_or(BusinessError::QuestionMissing { question_id })?;
            question_preview(&question.text, 20)
        };

        let prompt = format!("确定删除题目「{}」吗？", preview);
        if !self.gate.confirm(&prompt).await {
            info!(
                "[考核 {}] 已取消删除题目 {}",
                self.assessment.id, question_id
            );
            return Ok(DeleteOutcome::Cancelled);
        }

        self.service
            .delete_question(self.assessment.id, question_id)
            .await?;
        self.assessment.apply_deleted(question_id)?;

        info!(
            "[考核 {}] ✓ 题目 {} 已删除，当前共 {} 题，总分 {}",
            self.assessment.id,
            question_id,
            self.assessment.question_count(),
            self.assessment.total_score
        );

        Ok(DeleteOutcome::Deleted)
    }

    // ========== 只读视图 ==========

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn has_form(&self) -> bool {
        self.form.is_some()
    }

    pub fn form(&self) -> Option<&QuestionDraft> {
        self.form.as_ref().map(|(_, draft)| draft)
    }

    /// 表单的可写视图，宿主直接修改字段
    pub fn form_mut(&mut self) -> Option<&mut QuestionDraft> {
        self.form.as_mut().map(|(_, draft)| draft)
    }

    pub fn form_mode(&self) -> Option<EditorMode> {
        self.form.as_ref().map(|(mode, _)| *mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ServiceError};
    use crate::models::assessment::{AssessmentType, QuestionKind, QuestionType};
    use crate::services::{FixedGate, MemoryAssessmentService};

    fn seeded_assessment() -> Assessment {
        Assessment {
            id: 1,
            title: "数学小测".to_string(),
            description: String::new(),
            kind: AssessmentType::Quiz,
            course_id: 2,
            questions: vec![Question {
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
            }],
            total_score: 0.0,
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    async fn editor_with(gate: FixedGate) -> (Arc<MemoryAssessmentService>, AssessmentEditor) {
        let service = Arc::new(MemoryAssessmentService::with_assessments(vec![
            seeded_assessment(),
        ]));
        let editor = AssessmentEditor::open(service.clone(), Arc::new(gate), 1)
            .await
            .unwrap();
        (service, editor)
    }

    #[tokio::test]
    async fn create_appends_question_and_recomputes_total() {
        let (_, mut editor) = editor_with(FixedGate(true)).await;
        assert_eq!(editor.assessment().total_score, 10.0);

        editor.open_create();
        {
            let draft = editor.form_mut().unwrap();
            draft.text = "说明通分的步骤".to_string();
            draft.question_type = QuestionType::Essay;
            draft.score = 20.0;
        }

        let question = editor.submit_form().await.unwrap();

        assert!(question.id > 1);
        assert!(!editor.has_form());
        assert_eq!(editor.assessment().question_count(), 2);
        assert_eq!(editor.assessment().total_score, 30.0);
    }

    #[tokio::test]
    async fn edit_replaces_by_identity_and_recomputes_total() {
        let (_, mut editor) = editor_with(FixedGate(true)).await;

        editor.open_edit(1).unwrap();
        {
            let draft = editor.form_mut().unwrap();
            assert_eq!(draft.text, "4 + 4 = ?");
            draft.score = 15.0;
        }

        let question = editor.submit_form().await.unwrap();

        assert_eq!(question.id, 1);
        assert_eq!(editor.assessment().question_count(), 1);
        assert_eq!(editor.assessment().total_score, 15.0);
    }

    #[tokio::test]
    async fn validation_failure_keeps_form_open_and_aggregate_unchanged() {
        let (_, mut editor) = editor_with(FixedGate(true)).await;
        let before = editor.assessment().clone();

        editor.open_create();
        editor.form_mut().unwrap().text = "   ".to_string();

        let result = editor.submit_form().await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(editor.has_form());
        assert_eq!(editor.assessment(), &before);
    }

    #[tokio::test]
    async fn transport_failure_leaves_aggregate_deep_equal() {
        let (service, mut editor) = editor_with(FixedGate(true)).await;
        let before = editor.assessment().clone();

        editor.open_edit(1).unwrap();
        editor.form_mut().unwrap().score = 99.0;

        service.set_fail_next(ServiceError::BadResponse {
            endpoint: "/v1/assessments/1/questions/1".to_string(),
            status: 503,
            message: None,
        });

        let result = editor.submit_form().await;

        assert!(result.is_err());
        assert!(editor.has_form());
        assert_eq!(editor.assessment(), &before);
    }

    #[tokio::test]
    async fn declined_delete_is_not_an_error() {
        let (_, mut editor) = editor_with(FixedGate(false)).await;
        let before = editor.assessment().clone();

        let outcome = editor.delete_question(1).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(editor.assessment(), &before);
    }

    #[tokio::test]
    async fn accepted_delete_removes_question_and_recomputes_total() {
        let (_, mut editor) = editor_with(FixedGate(true)).await;

        let outcome = editor.delete_question(1).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(editor.assessment().question_count(), 0);
        assert_eq!(editor.assessment().total_score, 0.0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_aggregate_unchanged() {
        let (service, mut editor) = editor_with(FixedGate(true)).await;
        let before = editor.assessment().clone();

        service.set_fail_next(ServiceError::BadResponse {
            endpoint: "/v1/assessments/1/questions/1".to_string(),
            status: 503,
            message: None,
        });

        let result = editor.delete_question(1).await;

        assert!(result.is_err());
        assert_eq!(editor.assessment(), &before);
    }

    #[tokio::test]
    async fn open_edit_rejects_unknown_question() {
        let (_, mut editor) = editor_with(FixedGate(true)).await;
        assert!(editor.open_edit(99).is_err());
        assert!(!editor.has_form());
    }
}
