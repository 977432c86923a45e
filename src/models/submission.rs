//! 作答与提交数据模型
//!
//! 内部用 `AnswerValue` 枚举区分选择题索引与文本作答，
//! 进出服务端时转换为平铺的 `AnswerPayload` 线上格式。

use serde::{Deserialize, Serialize};

use crate::models::assessment::QuestionKind;

/// 学生对一道题的作答内容
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// 选择题：选中的选项索引
    Choice(usize),
    /// 简答 / 编程题：自由文本
    Text(String),
}

impl AnswerValue {
    /// 作答内容是否与题目类型匹配
    pub fn matches(&self, kind: &QuestionKind) -> bool {
        matches!(
            (self, kind),
            (AnswerValue::Choice(_), QuestionKind::Mcq { .. })
                | (AnswerValue::Text(_), QuestionKind::Essay { .. })
                | (AnswerValue::Text(_), QuestionKind::Coding { .. })
        )
    }
}

/// 一道题的作答记录
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// 服务端分配的作答 id（提交前为 None）
    pub id: Option<i64>,
    pub question_id: i64,
    pub value: AnswerValue,
    /// 评分后才会出现
    pub score: Option<f64>,
}

impl Answer {
    /// 选择题作答
    pub fn choice(question_id: i64, index: usize) -> Self {
        Self {
            id: None,
            question_id,
            value: AnswerValue::Choice(index),
            score: None,
        }
    }

    /// 文本作答
    pub fn text(question_id: i64, content: impl Into<String>) -> Self {
        Self {
            id: None,
            question_id,
            value: AnswerValue::Text(content.into()),
            score: None,
        }
    }
}

/// 作答记录的线上格式
///
/// 选择题同时携带空 `content` 与 `selectedOptionIndex`，
/// 文本题只携带 `content`，与原服务约定保持一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub question_id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl From<&Answer> for AnswerPayload {
    fn from(answer: &Answer) -> Self {
        let (content, selected_option_index) = match &answer.value {
            AnswerValue::Choice(index) => (String::new(), Some(*index)),
            AnswerValue::Text(text) => (text.clone(), None),
        };
        Self {
            id: answer.id,
            question_id: answer.question_id,
            content,
            selected_option_index,
            score: answer.score,
        }
    }
}

impl From<AnswerPayload> for Answer {
    fn from(payload: AnswerPayload) -> Self {
        let value = match payload.selected_option_index {
            Some(index) => AnswerValue::Choice(index),
            None => AnswerValue::Text(payload.content),
        };
        Self {
            id: payload.id,
            question_id: payload.question_id,
            value,
            score: payload.score,
        }
    }
}

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub fn name(self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "草稿",
            SubmissionStatus::Submitted => "已提交",
            SubmissionStatus::Graded => "已评分",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 一次提交
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: Option<i64>,
    pub assessment_id: i64,
    pub student_id: i64,
    pub answers: Vec<Answer>,
    pub status: SubmissionStatus,
    pub total_score: Option<f64>,
    pub submitted_at: Option<String>,
    pub graded_at: Option<String>,
}

/// 提交请求的线上格式
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub assessment_id: i64,
    pub student_id: i64,
    pub answers: Vec<AnswerPayload>,
}

/// 提交记录的线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub assessment_id: i64,
    pub student_id: i64,
    #[serde(default)]
    pub answers: Vec<AnswerPayload>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<String>,
}

impl From<SubmissionPayload> for Submission {
    fn from(payload: SubmissionPayload) -> Self {
        Self {
            id: payload.id,
            assessment_id: payload.assessment_id,
            student_id: payload.student_id,
            answers: payload.answers.into_iter().map(Answer::from).collect(),
            status: payload.status,
            total_score: payload.total_score,
            submitted_at: payload.submitted_at,
            graded_at: payload.graded_at,
        }
    }
}

impl From<&Submission> for SubmissionPayload {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id,
            assessment_id: submission.assessment_id,
            student_id: submission.student_id,
            answers: submission.answers.iter().map(AnswerPayload::from).collect(),
            status: submission.status,
            total_score: submission.total_score,
            submitted_at: submission.submitted_at.clone(),
            graded_at: submission.graded_at.clone(),
        }
    }
}

/// 评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: i64,
    pub submission_id: i64,
    pub total_score: f64,
    /// 满分，等于所属考核的总分
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<String>,
    #[serde(default)]
    pub graded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_answer_maps_to_index_payload() {
        let answer = Answer::choice(7, 2);
        let payload = AnswerPayload::from(&answer);

        assert_eq!(payload.question_id, 7);
        assert_eq!(payload.selected_option_index, Some(2));
        assert_eq!(payload.content, "");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["selectedOptionIndex"], 2);
        assert_eq!(json["questionId"], 7);
    }

    #[test]
    fn payload_without_index_becomes_text_answer() {
        let payload = AnswerPayload {
            id: Some(11),
            question_id: 3,
            content: "循环不变量保持成立".to_string(),
            selected_option_index: None,
            score: None,
        };

        let answer = Answer::from(payload);
        assert_eq!(answer.id, Some(11));
        assert_eq!(
            answer.value,
            AnswerValue::Text("循环不变量保持成立".to_string())
        );
    }

    #[test]
    fn submission_status_uses_uppercase_wire_names() {
        let json = serde_json::to_value(SubmissionStatus::Submitted).unwrap();
        assert_eq!(json, "SUBMITTED");

        let back: SubmissionStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, SubmissionStatus::Submitted);
    }
}
