//! 答题流水解析
//!
//! 正确数、完成度和得分都从流水重新推导，不维护增量计数器：
//! 后一次重新作答可能推翻前一次的判定，只有逐题取最新记录才能得到正确结果。

use std::collections::BTreeMap;

use crate::models::SubmissionHistoryEntry;

/// 题目 ID -> 该题最新一条流水
pub type LatestEntries = BTreeMap<String, SubmissionHistoryEntry>;

/// 按题目取最新记录
///
/// 比较 (submitted_at, seq)，时间戳相同时插入序号较大者生效，结果与扫描顺序无关
pub fn latest_by_question(entries: &[SubmissionHistoryEntry]) -> LatestEntries {
    let mut latest = LatestEntries::new();
    for entry in entries {
        match latest.get(&entry.question_id) {
            Some(current) if current.recency_key() >= entry.recency_key() => {}
            _ => {
                latest.insert(entry.question_id.clone(), entry.clone());
            }
        }
    }
    latest
}

/// 顺序中已作答的题目数
pub fn answered_count(ordering: &[String], latest: &LatestEntries) -> usize {
    ordering.iter().filter(|id| latest.contains_key(*id)).count()
}

/// 顺序中的每道题都至少有一条记录
pub fn is_complete(ordering: &[String], latest: &LatestEntries) -> bool {
    answered_count(ordering, latest) == ordering.len()
}

/// 最新记录被认可的题目数
pub fn count_accepted(ordering: &[String], latest: &LatestEntries) -> usize {
    ordering
        .iter()
        .filter_map(|id| latest.get(id))
        .filter(|entry| entry.accepted)
        .count()
}

/// 最新记录未被认可（含未作答）的题目，保持原顺序
pub fn not_accepted<'a>(ordering: &'a [String], latest: &LatestEntries) -> Vec<&'a String> {
    ordering
        .iter()
        .filter(|id| !latest.get(*id).is_some_and(|entry| entry.accepted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn entry(seq: i64, question_id: &str, accepted: bool, secs: i64) -> SubmissionHistoryEntry {
        SubmissionHistoryEntry {
            seq,
            shuffled_quiz_set_id: "sqs-1".to_string(),
            question_id: question_id.to_string(),
            correct: accepted,
            accepted,
            submitted_at: at(secs),
        }
    }

    fn ordering() -> Vec<String> {
        vec!["q1".to_string(), "q2".to_string(), "q3".to_string()]
    }

    #[test]
    fn test_latest_wins_by_timestamp() {
        let entries = vec![entry(1, "q1", false, 1), entry(2, "q1", true, 2)];
        let latest = latest_by_question(&entries);
        assert!(latest["q1"].correct);

        // 插入顺序与时间戳相反时仍以时间戳为准
        let entries = vec![entry(1, "q1", true, 5), entry(2, "q1", false, 3)];
        assert!(latest_by_question(&entries)["q1"].accepted);
    }

    #[test]
    fn test_timestamp_tie_broken_by_seq() {
        let entries = vec![entry(8, "q2", true, 4), entry(3, "q2", false, 4)];
        let latest = latest_by_question(&entries);
        assert_eq!(latest["q2"].seq, 8);

        let reversed: Vec<_> = entries.into_iter().rev().collect();
        assert_eq!(latest_by_question(&reversed)["q2"].seq, 8);
    }

    #[test]
    fn test_duplicate_append_is_harmless() {
        let once = vec![entry(1, "q1", true, 1)];
        let twice = vec![entry(1, "q1", true, 1), entry(2, "q1", true, 1)];
        assert_eq!(
            count_accepted(&ordering(), &latest_by_question(&once)),
            count_accepted(&ordering(), &latest_by_question(&twice))
        );
    }

    #[test]
    fn test_is_complete() {
        let mut entries = vec![entry(1, "q1", true, 1), entry(2, "q2", false, 2)];
        assert!(!is_complete(&ordering(), &latest_by_question(&entries)));

        entries.push(entry(3, "q3", false, 3));
        assert!(is_complete(&ordering(), &latest_by_question(&entries)));

        // 重新作答后仍然完成
        entries.push(entry(4, "q1", false, 4));
        assert!(is_complete(&ordering(), &latest_by_question(&entries)));
    }

    #[test]
    fn test_answers_outside_ordering_do_not_count() {
        let entries = vec![
            entry(1, "q1", true, 1),
            entry(2, "q2", true, 1),
            entry(3, "stray", true, 1),
        ];
        let latest = latest_by_question(&entries);
        assert_eq!(answered_count(&ordering(), &latest), 2);
        assert_eq!(count_accepted(&ordering(), &latest), 2);
        assert!(!is_complete(&ordering(), &latest));
    }

    #[test]
    fn test_count_accepted_uses_latest_only() {
        let entries = vec![
            entry(1, "q1", true, 1),
            entry(2, "q1", false, 2),
            entry(3, "q3", true, 1),
        ];
        let latest = latest_by_question(&entries);
        assert_eq!(count_accepted(&ordering(), &latest), 1);
        assert_eq!(not_accepted(&ordering(), &latest), vec!["q1", "q2"]);
    }

    #[test]
    fn test_empty_ordering_is_complete() {
        assert!(is_complete(&[], &LatestEntries::new()));
    }
}
