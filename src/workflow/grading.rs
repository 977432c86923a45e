//! 评分流程 - 流程层
//!
//! 核心职责：定义教师"给一次提交出成绩"的完整流程
//!
//! 流程顺序：
//! 1. 拉取提交与对应考核
//! 2. 给待人工评分的作答逐条打分（选择题提交时已自动判分）
//! 3. 出成绩：汇总分值、标记 GRADED

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::assessment::QuestionType;
use crate::models::submission::Grade;
use crate::services::AssessmentService;

/// 评分流程
pub struct GradingFlow {
    service: Arc<dyn AssessmentService>,
}

impl GradingFlow {
    /// 创建新的评分流程
    pub fn new(service: Arc<dyn AssessmentService>) -> Self {
        Self { service }
    }

    /// 对一次提交执行人工评分并出成绩
    ///
    /// # 参数
    /// - `submission_id`: 提交ID
    /// - `scores`: 题目 id -> 人工分值，只对简答 / 编程题生效
    /// - `graded_by`: 评分人
    /// - `feedback`: 总评（可省略）
    ///
    /// # 返回
    /// 返回服务端汇总后的成绩
    pub async fn grade(
        &self,
        submission_id: i64,
        scores: &HashMap<i64, f64>,
        graded_by: &str,
        feedback: Option<&str>,
    ) -> AppResult<Grade> {
        info!("[提交 {}] 📊 开始评分...", submission_id);

        let submission = self.service.get_submission(submission_id).await?;
        let assessment = self.service.get_assessment(submission.assessment_id).await?;

        let mut applied = 0usize;
        for answer in &submission.answers {
            let score = match scores.get(&answer.question_id) {
                Some(score) => *score,
                None => continue,
            };

            let question = match assessment.find_question(answer.question_id) {
                Some(question) => question,
                None => {
                    warn!(
                        "[提交 {}] ⚠️ 题目 {} 不在考核 {} 中，跳过该评分",
                        submission_id, answer.question_id, assessment.id
                    );
                    continue;
                }
            };

            if question.kind.question_type() == QuestionType::Mcq {
                warn!(
                    "[提交 {}] ⚠️ 题目 {} 是选择题，已自动判分，跳过人工分值",
                    submission_id, answer.question_id
                );
                continue;
            }

            let answer_id = match answer.id {
                Some(answer_id) => answer_id,
                None => {
                    warn!(
                        "[提交 {}] ⚠️ 题目 {} 的作答没有服务端ID，跳过该评分",
                        submission_id, answer.question_id
                    );
                    continue;
                }
            };

            self.service.grade_answer(answer_id, score).await?;
            info!(
                "[提交 {}] ✓ 题目 {} 评分 {}",
                submission_id, answer.question_id, score
            );
            applied += 1;
        }

        info!(
            "[提交 {}] 📤 人工评分 {} 条，正在出成绩...",
            submission_id, applied
        );

        let grade = self
            .service
            .grade_submission(submission_id, graded_by, feedback)
            .await?;

        info!(
            "[提交 {}] ✅ 成绩: {}/{} (评分人: {})",
            submission_id, grade.total_score, grade.max_score, grade.graded_by
        );

        Ok(grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::{Assessment, AssessmentType, Question, QuestionKind};
    use crate::models::submission::{Answer, SubmissionStatus};
    use crate::services::MemoryAssessmentService;

    fn mixed_assessment() -> Assessment {
        Assessment {
            id: 1,
            title: "期中考".to_string(),
            description: String::new(),
            kind: AssessmentType::Exam,
            course_id: 2,
            questions: vec![
                Question {
                    id: 1,
                    text: "4 + 4 = ?".to_string(),
                    score: 10.0,
                    kind: QuestionKind::Mcq {
                        options: vec!["6".to_string(), "8".to_string()],
                        correct_option_index: 1,
                    },
                },
                Question {
                    id: 2,
                    text: "说明通分的步骤".to_string(),
                    score: 20.0,
                    kind: QuestionKind::Essay {
                        rubric: None,
                        max_length_answer: None,
                    },
                },
            ],
            total_score: 0.0,
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn grades_manual_answers_and_finalizes() {
        let service = Arc::new(MemoryAssessmentService::with_assessments(vec![
            mixed_assessment(),
        ]));
        let submission = service
            .submit_assessment(
                1,
                3,
                vec![Answer::choice(1, 1), Answer::text(2, "先求最小公倍数")],
            )
            .await
            .unwrap();
        let submission_id = submission.id.unwrap();

        let flow = GradingFlow::new(service.clone());
        let scores = HashMap::from([(2, 15.0)]);

        let grade = flow
            .grade(submission_id, &scores, "王老师", Some("步骤完整"))
            .await
            .unwrap();

        assert_eq!(grade.total_score, 25.0);
        assert_eq!(grade.max_score, 30.0);
        assert_eq!(grade.graded_by, "王老师");

        let graded = service.get_submission(submission_id).await.unwrap();
        assert_eq!(graded.status, SubmissionStatus::Graded);
    }

    #[tokio::test]
    async fn mcq_scores_are_skipped_not_overwritten() {
        let service = Arc::new(MemoryAssessmentService::with_assessments(vec![
            mixed_assessment(),
        ]));
        let submission = service
            .submit_assessment(1, 3, vec![Answer::choice(1, 1)])
            .await
            .unwrap();
        let submission_id = submission.id.unwrap();

        let flow = GradingFlow::new(service.clone());
        let scores = HashMap::from([(1, 0.0)]);

        let grade = flow.grade(submission_id, &scores, "王老师", None).await.unwrap();

        // 自动判分结果保留
        assert_eq!(grade.total_score, 10.0);
    }

    #[tokio::test]
    async fn unknown_submission_is_reported() {
        let service = Arc::new(MemoryAssessmentService::new());
        let flow = GradingFlow::new(service);

        let result = flow.grade(99, &HashMap::new(), "王老师", None).await;
        assert!(result.is_err());
    }
}
