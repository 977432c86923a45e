//! 内存考核服务 - 业务能力层
//!
//! 离线模式与集成测试用的后端实现，语义与 HTTP 后端保持一致：
//! 服务端校验、选择题自动判分、成绩汇总都在这里复现。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::ServiceError;
use crate::models::assessment::{
    Assessment, NewAssessment, Question, QuestionInput, QuestionKind,
};
use crate::models::submission::{
    Answer, AnswerValue, Grade, Submission, SubmissionStatus,
};
use crate::services::assessment_service::AssessmentService;

/// 内存态的全部数据与ID计数器
struct MemoryState {
    assessments: HashMap<i64, Assessment>,
    submissions: HashMap<i64, Submission>,
    /// 以提交ID为键
    grades: HashMap<i64, Grade>,
    next_assessment_id: i64,
    next_question_id: i64,
    next_submission_id: i64,
    next_answer_id: i64,
    next_grade_id: i64,
}

impl MemoryState {
    fn empty() -> Self {
        Self {
            assessments: HashMap::new(),
            submissions: HashMap::new(),
            grades: HashMap::new(),
            next_assessment_id: 1,
            next_question_id: 1,
            next_submission_id: 1,
            next_answer_id: 1,
            next_grade_id: 1,
        }
    }
}

/// 内存考核服务
///
/// 职责：
/// - 在进程内存里维护考核、提交、成绩三张表
/// - 复现服务端的校验与判分规则
/// - 支持注入一次性失败，供流程层的失败路径测试使用
pub struct MemoryAssessmentService {
    state: Mutex<MemoryState>,
    fail_next: Mutex<Option<ServiceError>>,
}

impl MemoryAssessmentService {
    /// 创建空服务
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::empty()),
            fail_next: Mutex::new(None),
        }
    }

    /// 用种子考核数据创建服务
    ///
    /// 种子数据的总分会重新按题目分值之和计算，ID计数器从已有最大值继续。
    pub fn with_assessments(assessments: Vec<Assessment>) -> Self {
        let mut state = MemoryState::empty();

        for mut assessment in assessments {
            assessment.recalculate_total_score();
            state.next_assessment_id = state.next_assessment_id.max(assessment.id + 1);
            for question in &assessment.questions {
                state.next_question_id = state.next_question_id.max(question.id + 1);
            }
            state.assessments.insert(assessment.id, assessment);
        }

        debug!("内存服务已就绪，载入 {} 份考核", state.assessments.len());

        Self {
            state: Mutex::new(state),
            fail_next: Mutex::new(None),
        }
    }

    /// 让下一次调用失败一次
    pub fn set_fail_next(&self, error: ServiceError) {
        *lock_recovered(&self.fail_next) = Some(error);
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock_recovered(&self.state)
    }

    fn take_injected_failure(&self) -> Option<ServiceError> {
        lock_recovered(&self.fail_next).take()
    }

    fn check_injected_failure(&self) -> Result<(), ServiceError> {
        match self.take_injected_failure() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MemoryAssessmentService {
    fn default() -> Self {
        Self::new()
    }
}

/// 锁中毒时直接取回内部数据继续使用
fn lock_recovered<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 服务端格式的时间戳（ISO-8601，不带时区）
fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// 服务端对题目内容的校验，不通过时整体拒绝
fn validate_question_input(input: &QuestionInput) -> Result<(), ServiceError> {
    if input.text.trim().is_empty() {
        return Err(ServiceError::Rejected {
            message: "题干不能为空".to_string(),
        });
    }
    if !input.score.is_finite() || input.score < 1.0 {
        return Err(ServiceError::Rejected {
            message: "题目分值不能低于 1".to_string(),
        });
    }
    if let QuestionKind::Mcq {
        options,
        correct_option_index,
    } = &input.kind
    {
        if options.len() < 2 {
            return Err(ServiceError::Rejected {
                message: "选择题至少需要两个选项".to_string(),
            });
        }
        if *correct_option_index >= options.len() {
            return Err(ServiceError::Rejected {
                message: format!(
                    "正确选项下标 {} 超出选项数量 {}",
                    correct_option_index,
                    options.len()
                ),
            });
        }
    }
    Ok(())
}

/// 提交时的自动判分：选择题答对得满分，其余题型留待人工
fn auto_score(question: &Question, value: &AnswerValue) -> f64 {
    match (&question.kind, value) {
        (
            QuestionKind::Mcq {
                correct_option_index,
                ..
            },
            AnswerValue::Choice(selected),
        ) => {
            if selected == correct_option_index {
                question.score
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

#[async_trait]
impl AssessmentService for MemoryAssessmentService {
    async fn list_assessments(&self) -> Result<Vec<Assessment>, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        let mut all: Vec<Assessment> = state.assessments.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn get_assessment(&self, assessment_id: i64) -> Result<Assessment, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        state
            .assessments
            .get(&assessment_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            })
    }

    async fn create_assessment(
        &self,
        new_assessment: NewAssessment,
    ) -> Result<Assessment, ServiceError> {
        self.check_injected_failure()?;
        if new_assessment.title.trim().is_empty() {
            return Err(ServiceError::Rejected {
                message: "考核标题不能为空".to_string(),
            });
        }

        let mut state = self.state();
        let id = state.next_assessment_id;
        state.next_assessment_id += 1;

        let assessment = Assessment {
            id,
            title: new_assessment.title,
            description: new_assessment.description,
            kind: new_assessment.kind,
            course_id: new_assessment.course_id,
            questions: Vec::new(),
            total_score: 0.0,
            due_date: new_assessment.due_date,
            created_at: Some(now_timestamp()),
            updated_at: None,
        };

        debug!("内存服务: 创建考核 {} 《{}》", id, assessment.title);
        state.assessments.insert(id, assessment.clone());
        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        assessment_id: i64,
        details: NewAssessment,
    ) -> Result<Assessment, ServiceError> {
        self.check_injected_failure()?;
        if details.title.trim().is_empty() {
            return Err(ServiceError::Rejected {
                message: "考核标题不能为空".to_string(),
            });
        }

        let mut state = self.state();
        let assessment = state.assessments.get_mut(&assessment_id).ok_or_else(|| {
            ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            }
        })?;

        assessment.title = details.title;
        assessment.description = details.description;
        assessment.kind = details.kind;
        assessment.course_id = details.course_id;
        assessment.due_date = details.due_date;
        assessment.updated_at = Some(now_timestamp());

        Ok(assessment.clone())
    }

    async fn delete_assessment(&self, assessment_id: i64) -> Result<(), ServiceError> {
        self.check_injected_failure()?;

        let mut state = self.state();
        if state.assessments.remove(&assessment_id).is_none() {
            return Err(ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            });
        }

        debug!("内存服务: 删除考核 {}", assessment_id);
        Ok(())
    }

    async fn create_question(
        &self,
        assessment_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError> {
        self.check_injected_failure()?;
        validate_question_input(&input)?;

        let mut state = self.state();
        let question_id = state.next_question_id;

        let assessment = state.assessments.get_mut(&assessment_id).ok_or_else(|| {
            ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            }
        })?;

        let question = Question {
            id: question_id,
            text: input.text,
            score: input.score,
            kind: input.kind,
        };

        assessment.questions.push(question.clone());
        assessment.recalculate_total_score();
        assessment.updated_at = Some(now_timestamp());
        state.next_question_id += 1;

        Ok(question)
    }

    async fn update_question(
        &self,
        assessment_id: i64,
        question_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError> {
        self.check_injected_failure()?;
        validate_question_input(&input)?;

        let mut state = self.state();
        let assessment = state.assessments.get_mut(&assessment_id).ok_or_else(|| {
            ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            }
        })?;

        let question = assessment
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("题目 {}", question_id),
            })?;

        question.text = input.text;
        question.score = input.score;
        question.kind = input.kind;
        let updated = question.clone();

        assessment.recalculate_total_score();
        assessment.updated_at = Some(now_timestamp());

        Ok(updated)
    }

    async fn delete_question(
        &self,
        assessment_id: i64,
        question_id: i64,
    ) -> Result<(), ServiceError> {
        self.check_injected_failure()?;

        let mut state = self.state();
        let assessment = state.assessments.get_mut(&assessment_id).ok_or_else(|| {
            ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            }
        })?;

        let position = assessment
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("题目 {}", question_id),
            })?;

        assessment.questions.remove(position);
        assessment.recalculate_total_score();
        assessment.updated_at = Some(now_timestamp());

        Ok(())
    }

    async fn submit_assessment(
        &self,
        assessment_id: i64,
        student_id: i64,
        answers: Vec<Answer>,
    ) -> Result<Submission, ServiceError> {
        self.check_injected_failure()?;

        let mut state = self.state();
        let assessment = state
            .assessments
            .get(&assessment_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            })?;

        let mut stored_answers = Vec::with_capacity(answers.len());
        for answer in answers {
            let question = assessment
                .find_question(answer.question_id)
                .ok_or_else(|| ServiceError::Rejected {
                    message: format!("作答引用了不存在的题目 {}", answer.question_id),
                })?;

            let score = auto_score(question, &answer.value);
            stored_answers.push(Answer {
                id: Some(state.next_answer_id),
                question_id: answer.question_id,
                value: answer.value,
                score: Some(score),
            });
            state.next_answer_id += 1;
        }

        let submission = Submission {
            id: Some(state.next_submission_id),
            assessment_id,
            student_id,
            answers: stored_answers,
            status: SubmissionStatus::Submitted,
            total_score: None,
            submitted_at: Some(now_timestamp()),
            graded_at: None,
        };
        state.next_submission_id += 1;

        debug!(
            "内存服务: 学生 {} 提交考核 {}，共 {} 条作答",
            student_id,
            assessment_id,
            submission.answers.len()
        );

        if let Some(id) = submission.id {
            state.submissions.insert(id, submission.clone());
        }
        Ok(submission)
    }

    async fn get_submissions(
        &self,
        assessment_id: i64,
    ) -> Result<Vec<Submission>, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        let mut found: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| s.assessment_id == assessment_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);
        Ok(found)
    }

    async fn get_submission(&self, submission_id: i64) -> Result<Submission, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        state
            .submissions
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("提交 {}", submission_id),
            })
    }

    async fn grade_answer(&self, answer_id: i64, score: f64) -> Result<Answer, ServiceError> {
        self.check_injected_failure()?;
        if !score.is_finite() || score < 0.0 {
            return Err(ServiceError::Rejected {
                message: format!("分值 {} 不合法", score),
            });
        }

        let mut state = self.state();
        for submission in state.submissions.values_mut() {
            if let Some(answer) = submission
                .answers
                .iter_mut()
                .find(|a| a.id == Some(answer_id))
            {
                answer.score = Some(score);
                return Ok(answer.clone());
            }
        }

        Err(ServiceError::NotFound {
            resource: format!("作答 {}", answer_id),
        })
    }

    async fn grade_submission(
        &self,
        submission_id: i64,
        graded_by: &str,
        feedback: Option<&str>,
    ) -> Result<Grade, ServiceError> {
        self.check_injected_failure()?;

        let mut state = self.state();
        let assessment_id = state
            .submissions
            .get(&submission_id)
            .map(|s| s.assessment_id)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("提交 {}", submission_id),
            })?;

        let max_score = state
            .assessments
            .get(&assessment_id)
            .map(|a| a.total_score)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("考核 {}", assessment_id),
            })?;

        let grade_id = state.next_grade_id;
        state.next_grade_id += 1;
        let graded_at = now_timestamp();

        let submission = state
            .submissions
            .get_mut(&submission_id)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("提交 {}", submission_id),
            })?;

        let total_score: f64 = submission
            .answers
            .iter()
            .map(|a| a.score.unwrap_or(0.0))
            .sum();

        submission.status = SubmissionStatus::Graded;
        submission.total_score = Some(total_score);
        submission.graded_at = Some(graded_at.clone());

        let grade = Grade {
            id: grade_id,
            submission_id,
            total_score,
            max_score,
            graded_at: Some(graded_at),
            graded_by: graded_by.to_string(),
            feedback: feedback.map(|f| f.to_string()),
        };

        debug!(
            "内存服务: 提交 {} 出成绩 {}/{}",
            submission_id, total_score, max_score
        );

        state.grades.insert(submission_id, grade.clone());
        Ok(grade)
    }

    async fn get_grade(&self, submission_id: i64) -> Result<Grade, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        state
            .grades
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("提交 {} 的成绩", submission_id),
            })
    }

    async fn get_history(&self, student_id: i64) -> Result<Vec<Submission>, ServiceError> {
        self.check_injected_failure()?;
        let state = self.state();
        let mut found: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);
        Ok(found)
    }
}
