//! 考核与题目数据模型
//!
//! 与考核服务的 JSON 线上格式一一对应；题目的类型相关字段
//! 收在 `QuestionKind` 的各个变体里，非选择题不可能携带选项。

use serde::{Deserialize, Serialize};

use crate::error::BusinessError;

/// 考核类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentType {
    Quiz,
    Exam,
    Project,
}

impl AssessmentType {
    /// 获取显示名称
    pub fn name(self) -> &'static str {
        match self {
            AssessmentType::Quiz => "测验",
            AssessmentType::Exam => "考试",
            AssessmentType::Project => "项目",
        }
    }
}

impl std::fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目类型（判别用的轻量枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    Mcq,
    Essay,
    Coding,
}

/// 脚本文件中允许的题目类型别名
static QUESTION_TYPE_ALIASES: phf::Map<&'static str, QuestionType> = phf::phf_map! {
    "mcq" => QuestionType::Mcq,
    "choice" => QuestionType::Mcq,
    "multiple_choice" => QuestionType::Mcq,
    "单选" => QuestionType::Mcq,
    "选择" => QuestionType::Mcq,
    "选择题" => QuestionType::Mcq,
    "essay" => QuestionType::Essay,
    "text" => QuestionType::Essay,
    "简答" => QuestionType::Essay,
    "简答题" => QuestionType::Essay,
    "问答题" => QuestionType::Essay,
    "coding" => QuestionType::Coding,
    "code" => QuestionType::Coding,
    "编程" => QuestionType::Coding,
    "编程题" => QuestionType::Coding,
};

impl QuestionType {
    /// 获取显示名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionType::Mcq => "选择题",
            QuestionType::Essay => "简答题",
            QuestionType::Coding => "编程题",
        }
    }

    /// 从别名查找题目类型（大小写不敏感）
    pub fn find(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        QUESTION_TYPE_ALIASES.get(key.as_str()).copied()
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目的类型相关载荷
///
/// 线上格式以 `type` 字段区分，其余字段平铺在题目对象里。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionKind {
    /// 选择题：选项列表 + 正确选项索引
    #[serde(rename = "MCQ", rename_all = "camelCase")]
    Mcq {
        options: Vec<String>,
        correct_option_index: usize,
    },
    /// 简答题：可选的评分标准与答案长度上限
    #[serde(rename = "ESSAY", rename_all = "camelCase")]
    Essay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rubric: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length_answer: Option<u32>,
    },
    /// 编程题：同简答题的元数据
    #[serde(rename = "CODING", rename_all = "camelCase")]
    Coding {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rubric: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length_answer: Option<u32>,
    },
}

impl QuestionKind {
    /// 对应的题目类型
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Mcq { .. } => QuestionType::Mcq,
            QuestionKind::Essay { .. } => QuestionType::Essay,
            QuestionKind::Coding { .. } => QuestionType::Coding,
        }
    }

    /// 类型显示名称
    pub fn type_name(&self) -> &'static str {
        self.question_type().name()
    }
}

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub score: f64,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// 创建 / 更新题目时发往服务端的载荷（无 id，id 由服务端分配）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub score: f64,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// 创建考核时发往服务端的载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessment {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
    pub course_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// 考核聚合：题目列表 + 元信息
///
/// `total_score` 必须等于所有题目分值之和；每次题目变更落地后
/// 通过 `recalculate_total_score` 重新建立该不变式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
    pub course_id: i64,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Assessment {
    /// 题目数量
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 按 id 查找题目
    pub fn find_question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// 所有题目分值之和
    pub fn sum_of_question_scores(&self) -> f64 {
        self.questions.iter().map(|q| q.score).sum()
    }

    /// 以题目列表为准重算总分
    pub fn recalculate_total_score(&mut self) {
        self.total_score = self.sum_of_question_scores();
    }

    /// 落地一个新创建的题目（追加并重算总分）
    pub fn apply_created(&mut self, question: Question) {
        self.questions.push(question);
        self.recalculate_total_score();
    }

    /// 落地一个更新后的题目（按 id 替换并重算总分）
    pub fn apply_updated(&mut self, question: Question) -> Result<(), BusinessError> {
        let slot = self
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or(BusinessError::QuestionMissing {
                question_id: question.id,
            })?;
        *slot = question;
        self.recalculate_total_score();
        Ok(())
    }

    /// 落地一次题目删除（按 id 移除并重算总分）
    pub fn apply_deleted(&mut self, question_id: i64) -> Result<(), BusinessError> {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != question_id);
        if self.questions.len() == before {
            return Err(BusinessError::QuestionMissing { question_id });
        }
        self.recalculate_total_score();
        Ok(())
    }
}

/// 选项的展示字母（按位置推导，不参与存储）
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq_question() -> Question {
        Question {
            id: 1,
            text: "2 + 2 = ?".to_string(),
            score: 10.0,
            kind: QuestionKind::Mcq {
                options: vec!["3".to_string(), "4".to_string(), "5".to_string()],
                correct_option_index: 1,
            },
        }
    }

    #[test]
    fn mcq_serializes_with_flat_type_tag() {
        let json = serde_json::to_value(mcq_question()).unwrap();
        assert_eq!(json["type"], "MCQ");
        assert_eq!(json["correctOptionIndex"], 1);
        assert_eq!(json["options"].as_array().unwrap().len(), 3);

        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back, mcq_question());
    }

    #[test]
    fn essay_serializes_without_option_fields() {
        let question = Question {
            id: 2,
            text: "谈谈你的理解".to_string(),
            score: 20.0,
            kind: QuestionKind::Essay {
                rubric: Some("按要点给分".to_string()),
                max_length_answer: None,
            },
        };

        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["type"], "ESSAY");
        assert!(json.get("options").is_none());
        assert!(json.get("correctOptionIndex").is_none());
        assert_eq!(json["rubric"], "按要点给分");
        assert!(json.get("maxLengthAnswer").is_none());
    }

    #[test]
    fn unknown_question_type_is_rejected() {
        let raw = r#"{"id":1,"text":"x","score":5.0,"type":"ORAL"}"#;
        assert!(serde_json::from_str::<Question>(raw).is_err());
    }

    #[test]
    fn recalculate_restores_score_invariant() {
        let mut assessment = Assessment {
            id: 1,
            title: "单元测验".to_string(),
            description: String::new(),
            kind: AssessmentType::Quiz,
            course_id: 1,
            questions: vec![mcq_question()],
            total_score: 0.0,
            due_date: None,
            created_at: None,
            updated_at: None,
        };

        assessment.apply_created(Question {
            id: 2,
            text: "简述氧化反应".to_string(),
            score: 15.0,
            kind: QuestionKind::Essay {
                rubric: None,
                max_length_answer: Some(500),
            },
        });
        assert_eq!(assessment.total_score, 25.0);

        assessment.apply_deleted(1).unwrap();
        assert_eq!(assessment.total_score, 15.0);
        assert_eq!(assessment.total_score, assessment.sum_of_question_scores());
    }

    #[test]
    fn question_type_find_accepts_aliases() {
        assert_eq!(QuestionType::find("MCQ"), Some(QuestionType::Mcq));
        assert_eq!(QuestionType::find("选择题"), Some(QuestionType::Mcq));
        assert_eq!(QuestionType::find(" essay "), Some(QuestionType::Essay));
        assert_eq!(QuestionType::find("编程"), Some(QuestionType::Coding));
        assert_eq!(QuestionType::find("oral"), None);
    }

    #[test]
    fn option_labels_are_positional() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
    }
}
