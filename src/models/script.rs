//! TOML 脚本数据结构
//!
//! 三种运行模式各有一种脚本：作答脚本、出题脚本、评分脚本。
//! 脚本文件是手写的，字段用 snake_case；种子数据直接复用线上格式。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::assessment::{
    Assessment, AssessmentType, NewAssessment, QuestionType,
};
use crate::models::draft::{QuestionDraft, OPTION_SLOTS};
use crate::models::submission::AnswerValue;

/// 作答脚本：一个学生对一份考核的全部作答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptScript {
    #[serde(default)]
    pub name: Option<String>,
    pub assessment_id: i64,
    /// 省略时使用配置中的学生ID
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub answers: Vec<ScriptAnswer>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl AttemptScript {
    /// 日志里使用的脚本名
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.file_path.clone())
            .unwrap_or_else(|| format!("考核 {}", self.assessment_id))
    }
}

/// 脚本里的一条作答：`option` 与 `text` 恰好给出一个
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptAnswer {
    pub question_id: i64,
    #[serde(default)]
    pub option: Option<usize>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ScriptAnswer {
    /// 转成作答内容；两个字段都给或都不给时返回 None
    pub fn to_value(&self) -> Option<AnswerValue> {
        match (self.option, &self.text) {
            (Some(index), None) => Some(AnswerValue::Choice(index)),
            (None, Some(text)) => Some(AnswerValue::Text(text.clone())),
            _ => None,
        }
    }
}

/// 出题脚本：向一份考核批量添加题目
///
/// 给出 `assessment_id` 表示向已有考核添加；
/// 给出 `[assessment]` 段表示先新建考核再添加。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorScript {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assessment_id: Option<i64>,
    #[serde(default)]
    pub assessment: Option<NewAssessmentSpec>,
    #[serde(default)]
    pub questions: Vec<ScriptQuestion>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl AuthorScript {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.file_path.clone())
            .unwrap_or_else(|| "出题脚本".to_string())
    }
}

/// 新建考核的脚本字段（snake_case，转换为线上载荷）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssessmentSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub assessment_type: String,
    pub course_id: i64,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl NewAssessmentSpec {
    /// 转成创建考核的载荷；类型不合法时返回 None
    pub fn to_new_assessment(&self) -> Option<NewAssessment> {
        let kind = match self.assessment_type.trim().to_uppercase().as_str() {
            "QUIZ" => AssessmentType::Quiz,
            "EXAM" => AssessmentType::Exam,
            "PROJECT" => AssessmentType::Project,
            _ => return None,
        };
        Some(NewAssessment {
            title: self.title.clone(),
            description: self.description.clone(),
            kind,
            course_id: self.course_id,
            due_date: self.due_date.clone(),
        })
    }
}

/// 脚本里的一道题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptQuestion {
    pub text: String,
    /// 题目类型，接受别名（mcq / choice / 单选 / essay / ...）
    #[serde(rename = "type")]
    pub question_type: String,
    pub score: f64,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_option_index: Option<usize>,
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default)]
    pub max_length_answer: Option<u32>,
}

impl ScriptQuestion {
    /// 转成编辑表单；类型别名无法识别时返回 None
    pub fn to_draft(&self) -> Option<QuestionDraft> {
        let question_type = QuestionType::find(&self.question_type)?;

        let mut draft = QuestionDraft::default();
        draft.text = self.text.clone();
        draft.question_type = question_type;
        draft.score = self.score;

        if question_type == QuestionType::Mcq {
            draft.option_slots = self.options.clone();
            while draft.option_slots.len() < OPTION_SLOTS {
                draft.option_slots.push(String::new());
            }
            draft.correct_option_index = self.correct_option_index.unwrap_or(0);
        }
        draft.rubric = self.rubric.clone().unwrap_or_default();
        draft.max_length_answer = self.max_length_answer;

        Some(draft)
    }
}

/// 评分脚本：对一次提交的人工评分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeScript {
    #[serde(default)]
    pub name: Option<String>,
    pub submission_id: i64,
    /// 省略时使用配置中的评分人
    #[serde(default)]
    pub graded_by: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub scores: Vec<ScriptScore>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl GradeScript {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.file_path.clone())
            .unwrap_or_else(|| format!("提交 {}", self.submission_id))
    }

    /// 题目 id -> 人工分值
    pub fn score_map(&self) -> HashMap<i64, f64> {
        self.scores
            .iter()
            .map(|s| (s.question_id, s.score))
            .collect()
    }
}

/// 一条人工评分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptScore {
    pub question_id: i64,
    pub score: f64,
}

/// 离线模式的种子数据（线上格式的考核列表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub assessments: Vec<Assessment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_answer_requires_exactly_one_field() {
        let both = ScriptAnswer {
            question_id: 1,
            option: Some(0),
            text: Some("x".to_string()),
        };
        assert!(both.to_value().is_none());

        let neither = ScriptAnswer {
            question_id: 1,
            option: None,
            text: None,
        };
        assert!(neither.to_value().is_none());

        let choice = ScriptAnswer {
            question_id: 1,
            option: Some(2),
            text: None,
        };
        assert_eq!(choice.to_value(), Some(AnswerValue::Choice(2)));
    }

    #[test]
    fn script_question_resolves_type_aliases() {
        let script = ScriptQuestion {
            text: "4 + 4 = ?".to_string(),
            question_type: "单选".to_string(),
            score: 10.0,
            options: vec!["6".to_string(), "8".to_string()],
            correct_option_index: Some(1),
            rubric: None,
            max_length_answer: None,
        };

        let draft = script.to_draft().unwrap();
        assert_eq!(draft.question_type, QuestionType::Mcq);
        assert_eq!(draft.option_slots.len(), OPTION_SLOTS);
        assert_eq!(draft.correct_option_index, 1);

        let unknown = ScriptQuestion {
            question_type: "oral".to_string(),
            ..script
        };
        assert!(unknown.to_draft().is_none());
    }

    #[test]
    fn attempt_script_parses_from_toml() {
        let raw = r#"
            name = "数学小测"
            assessment_id = 1

            [[answers]]
            question_id = 1
            option = 1

            [[answers]]
            question_id = 2
            text = "先通分再比较"
        "#;

        let script: AttemptScript = toml::from_str(raw).unwrap();
        assert_eq!(script.assessment_id, 1);
        assert_eq!(script.answers.len(), 2);
        assert_eq!(script.answers[0].to_value(), Some(AnswerValue::Choice(1)));
    }
}
