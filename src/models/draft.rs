//! 题目编辑表单
//!
//! 表单固定提供 4 个选项槽位；校验时先过滤空白槽位再检查，
//! 正确选项索引随之重新映射到过滤后的列表。

use crate::error::ValidationError;
use crate::models::assessment::{Question, QuestionInput, QuestionKind, QuestionType};

/// 表单提供的选项槽位数量
pub const OPTION_SLOTS: usize = 4;

/// 题目编辑表单状态
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub text: String,
    pub question_type: QuestionType,
    pub score: f64,
    /// 选项槽位（仅选择题使用，可能含空白）
    pub option_slots: Vec<String>,
    /// 指向槽位的正确选项索引
    pub correct_option_index: usize,
    pub rubric: String,
    pub max_length_answer: Option<u32>,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        Self {
            text: String::new(),
            question_type: QuestionType::Mcq,
            score: 10.0,
            option_slots: vec![String::new(); OPTION_SLOTS],
            correct_option_index: 0,
            rubric: String::new(),
            max_length_answer: None,
        }
    }
}

impl QuestionDraft {
    /// 用已有题目填充表单（编辑模式），选项补齐到固定槽位数
    pub fn from_question(question: &Question) -> Self {
        let mut draft = Self::default();
        draft.text = question.text.clone();
        draft.score = question.score;

        match &question.kind {
            QuestionKind::Mcq {
                options,
                correct_option_index,
            } => {
                draft.question_type = QuestionType::Mcq;
                draft.option_slots = options.clone();
                while draft.option_slots.len() < OPTION_SLOTS {
                    draft.option_slots.push(String::new());
                }
                draft.correct_option_index = *correct_option_index;
            }
            QuestionKind::Essay {
                rubric,
                max_length_answer,
            } => {
                draft.question_type = QuestionType::Essay;
                draft.rubric = rubric.clone().unwrap_or_default();
                draft.max_length_answer = *max_length_answer;
            }
            QuestionKind::Coding {
                rubric,
                max_length_answer,
            } => {
                draft.question_type = QuestionType::Coding;
                draft.rubric = rubric.clone().unwrap_or_default();
                draft.max_length_answer = *max_length_answer;
            }
        }

        draft
    }

    /// 校验表单并生成提交载荷
    ///
    /// 非选择题即使槽位里残留旧选项也不会进入载荷。
    pub fn validate(&self) -> Result<QuestionInput, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::new("text", "题干不能为空"));
        }
        if !self.score.is_finite() || self.score < 1.0 {
            return Err(ValidationError::new("score", "分值必须是不小于 1 的数字"));
        }

        let kind = match self.question_type {
            QuestionType::Mcq => {
                let mut options = Vec::new();
                let mut remapped_correct = None;
                for (slot_index, slot) in self.option_slots.iter().enumerate() {
                    let trimmed = slot.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if slot_index == self.correct_option_index {
                        remapped_correct = Some(options.len());
                    }
                    options.push(trimmed.to_string());
                }

                if options.len() < 2 {
                    return Err(ValidationError::new("options", "至少需要两个非空选项"));
                }
                let correct_option_index = remapped_correct.ok_or_else(|| {
                    ValidationError::new("correctOptionIndex", "必须选择一个非空白的正确选项")
                })?;

                QuestionKind::Mcq {
                    options,
                    correct_option_index,
                }
            }
            QuestionType::Essay => QuestionKind::Essay {
                rubric: non_blank(&self.rubric),
                max_length_answer: self.max_length_answer,
            },
            QuestionType::Coding => QuestionKind::Coding {
                rubric: non_blank(&self.rubric),
                max_length_answer: self.max_length_answer,
            },
        };

        Ok(QuestionInput {
            text: text.to_string(),
            score: self.score,
            kind,
        })
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_create_form() {
        let draft = QuestionDraft::default();
        assert_eq!(draft.question_type, QuestionType::Mcq);
        assert_eq!(draft.score, 10.0);
        assert_eq!(draft.option_slots.len(), OPTION_SLOTS);
        assert_eq!(draft.correct_option_index, 0);
    }

    #[test]
    fn from_question_pads_option_slots() {
        let question = Question {
            id: 9,
            text: "最大的行星是？".to_string(),
            score: 5.0,
            kind: QuestionKind::Mcq {
                options: vec!["木星".to_string(), "土星".to_string()],
                correct_option_index: 0,
            },
        };

        let draft = QuestionDraft::from_question(&question);
        assert_eq!(draft.option_slots.len(), OPTION_SLOTS);
        assert_eq!(draft.option_slots[0], "木星");
        assert_eq!(draft.option_slots[2], "");
    }

    #[test]
    fn blank_text_and_low_score_are_rejected() {
        let mut draft = QuestionDraft::default();
        draft.text = "   ".to_string();
        assert_eq!(draft.validate().unwrap_err().field, "text");

        draft.text = "题干".to_string();
        draft.score = 0.5;
        assert_eq!(draft.validate().unwrap_err().field, "score");
    }

    #[test]
    fn mcq_needs_two_options_and_non_blank_correct_slot() {
        let mut draft = QuestionDraft {
            text: "2 的平方是？".to_string(),
            ..QuestionDraft::default()
        };
        draft.option_slots = vec!["4".to_string(), String::new(), String::new(), String::new()];
        assert_eq!(draft.validate().unwrap_err().field, "options");

        draft.option_slots[2] = "8".to_string();
        draft.correct_option_index = 1; // 空白槽位
        assert_eq!(draft.validate().unwrap_err().field, "correctOptionIndex");
    }

    #[test]
    fn correct_index_is_remapped_after_blank_filtering() {
        let mut draft = QuestionDraft {
            text: "4 + 4 = ?".to_string(),
            ..QuestionDraft::default()
        };
        draft.option_slots = vec![
            String::new(),
            "8".to_string(),
            String::new(),
            "5".to_string(),
        ];
        draft.correct_option_index = 1;

        let input = draft.validate().unwrap();
        match input.kind {
            QuestionKind::Mcq {
                options,
                correct_option_index,
            } => {
                assert_eq!(options, vec!["8".to_string(), "5".to_string()]);
                assert_eq!(correct_option_index, 0);
            }
            other => panic!("应当得到选择题载荷，实际为 {:?}", other),
        }
    }

    #[test]
    fn stale_options_never_leak_into_essay_payload() {
        let mut draft = QuestionDraft {
            text: "谈谈测试的价值".to_string(),
            ..QuestionDraft::default()
        };
        draft.option_slots[0] = "残留选项".to_string();
        draft.question_type = QuestionType::Essay;
        draft.rubric = "  按论证深度给分  ".to_string();

        let input = draft.validate().unwrap();
        match &input.kind {
            QuestionKind::Essay { rubric, .. } => {
                assert_eq!(rubric.as_deref(), Some("按论证深度给分"));
            }
            other => panic!("应当得到简答题载荷，实际为 {:?}", other),
        }

        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("options").is_none());
    }
}
