//! 作答台账
//!
//! 题目 id -> 当前作答的映射，一题至多一条；重复作答覆盖旧值。
//! 提交时按考核的题目顺序导出快照。

use std::collections::HashMap;

use crate::models::assessment::Question;
use crate::models::submission::Answer;

/// 一次作答期间的台账（仅归当前 Runner 所有，不跨界共享）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerLedger {
    entries: HashMap<i64, Answer>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入 / 覆盖一道题的作答
    pub fn record(&mut self, answer: Answer) {
        self.entries.insert(answer.question_id, answer);
    }

    /// 读取某道题的当前作答
    pub fn get(&self, question_id: i64) -> Option<&Answer> {
        self.entries.get(&question_id)
    }

    /// 该题是否已作答
    pub fn answered(&self, question_id: i64) -> bool {
        self.entries.contains_key(&question_id)
    }

    /// 已作答的题目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按题目顺序导出作答快照（未作答的题目不占位）
    pub fn snapshot_in_order(&self, questions: &[Question]) -> Vec<Answer> {
        questions
            .iter()
            .filter_map(|q| self.entries.get(&q.id).cloned())
            .collect()
    }

    /// 清空台账（提交成功或放弃作答后）
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::QuestionKind;

    fn question(id: i64) -> Question {
        Question {
            id,
            text: format!("题目 {}", id),
            score: 10.0,
            kind: QuestionKind::Essay {
                rubric: None,
                max_length_answer: None,
            },
        }
    }

    #[test]
    fn recording_same_answer_twice_equals_once() {
        let mut once = AnswerLedger::new();
        once.record(Answer::choice(1, 2));

        let mut twice = AnswerLedger::new();
        twice.record(Answer::choice(1, 2));
        twice.record(Answer::choice(1, 2));

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn new_answer_overwrites_instead_of_duplicating() {
        let mut ledger = AnswerLedger::new();
        ledger.record(Answer::choice(1, 0));
        ledger.record(Answer::choice(1, 3));

        assert_eq!(ledger.len(), 1);
        match &ledger.get(1).unwrap().value {
            crate::models::submission::AnswerValue::Choice(index) => assert_eq!(*index, 3),
            other => panic!("应当是选择题作答，实际为 {:?}", other),
        }
    }

    #[test]
    fn snapshot_follows_question_order_not_insertion_order() {
        let questions = vec![question(10), question(20), question(30)];

        let mut ledger = AnswerLedger::new();
        ledger.record(Answer::text(30, "后答的"));
        ledger.record(Answer::text(10, "先答的"));

        let snapshot = ledger.snapshot_in_order(&questions);
        let ids: Vec<i64> = snapshot.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![10, 30]);
    }
}
