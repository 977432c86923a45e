//! 考核服务接口 - 业务能力层
//!
//! 描述"后端能为我做什么"，不关心数据存在哪里。
//! 两个实现：`AssessmentApi`（HTTP 后端）与 `MemoryAssessmentService`（离线内存）。

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::assessment::{Assessment, NewAssessment, Question, QuestionInput};
use crate::models::submission::{Answer, Grade, Submission};

/// 考核服务能力
///
/// 职责：
/// - 考核与题目的增删改查
/// - 作答提交与查询
/// - 评分与成绩查询
/// - 只做单次调用，不关心流程顺序
#[async_trait]
pub trait AssessmentService: Send + Sync {
    /// 列出全部考核（不含题目明细）
    async fn list_assessments(&self) -> Result<Vec<Assessment>, ServiceError>;

    /// 获取单份考核（含题目列表与总分）
    async fn get_assessment(&self, assessment_id: i64) -> Result<Assessment, ServiceError>;

    /// 创建考核
    async fn create_assessment(
        &self,
        new_assessment: NewAssessment,
    ) -> Result<Assessment, ServiceError>;

    /// 更新考核的基本信息（标题、描述、类型、课程、截止时间）
    ///
    /// 题目列表与总分不受影响。
    async fn update_assessment(
        &self,
        assessment_id: i64,
        details: NewAssessment,
    ) -> Result<Assessment, ServiceError>;

    /// 删除考核，连同其题目一并移除
    async fn delete_assessment(&self, assessment_id: i64) -> Result<(), ServiceError>;

    /// 向考核添加题目
    ///
    /// # 参数
    /// - `assessment_id`: 目标考核ID
    /// - `input`: 校验通过的题目内容
    ///
    /// # 返回
    /// 返回带服务端ID的题目
    async fn create_question(
        &self,
        assessment_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError>;

    /// 更新考核中的一道题目
    async fn update_question(
        &self,
        assessment_id: i64,
        question_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError>;

    /// 删除考核中的一道题目
    async fn delete_question(
        &self,
        assessment_id: i64,
        question_id: i64,
    ) -> Result<(), ServiceError>;

    /// 提交一次作答
    ///
    /// # 参数
    /// - `assessment_id`: 考核ID
    /// - `student_id`: 学生ID
    /// - `answers`: 作答列表（按题目顺序）
    ///
    /// # 返回
    /// 返回服务端生成的提交记录（选择题已自动判分）
    async fn submit_assessment(
        &self,
        assessment_id: i64,
        student_id: i64,
        answers: Vec<Answer>,
    ) -> Result<Submission, ServiceError>;

    /// 列出一份考核的全部提交
    async fn get_submissions(&self, assessment_id: i64)
        -> Result<Vec<Submission>, ServiceError>;

    /// 获取单次提交（含作答明细）
    async fn get_submission(&self, submission_id: i64) -> Result<Submission, ServiceError>;

    /// 给单条作答打分
    async fn grade_answer(&self, answer_id: i64, score: f64) -> Result<Answer, ServiceError>;

    /// 对一次提交出成绩
    ///
    /// # 参数
    /// - `submission_id`: 提交ID
    /// - `graded_by`: 评分人
    /// - `feedback`: 总评（可省略）
    async fn grade_submission(
        &self,
        submission_id: i64,
        graded_by: &str,
        feedback: Option<&str>,
    ) -> Result<Grade, ServiceError>;

    /// 查询一次提交的成绩
    async fn get_grade(&self, submission_id: i64) -> Result<Grade, ServiceError>;

    /// 查询一个学生的历史提交
    async fn get_history(&self, student_id: i64) -> Result<Vec<Submission>, ServiceError>;
}
