//! 正确数重算
//!
//! `total_correctness` 是答题流水的派生值：最新记录被认可的题目数。
//! 重算是幂等的，流水不变时反复执行结果相同。

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use quiz_shared::observability::metrics;

use crate::error::{EngineError, Result};
use crate::ledger;
use crate::repository::{ShuffledQuizSetRepositoryTrait, SubmissionRepositoryTrait};
use crate::service::batch::run_batch;
use crate::service::dto::{BatchResult, CorrectnessSummary};

const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// 正确数重算器
pub struct CorrectnessRecalculator<SR, LR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
{
    shuffled_repo: Arc<SR>,
    submission_repo: Arc<LR>,
    batch_concurrency: usize,
}

impl<SR, LR> CorrectnessRecalculator<SR, LR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
{
    pub fn new(shuffled_repo: Arc<SR>, submission_repo: Arc<LR>) -> Self {
        Self {
            shuffled_repo,
            submission_repo,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency;
        self
    }

    /// 根据答题流水重算并写回 `total_correctness`
    #[instrument(skip(self))]
    pub async fn recompute(&self, shuffled_quiz_set_id: &str) -> Result<CorrectnessSummary> {
        let start = Instant::now();
        let result = self.recompute_inner(shuffled_quiz_set_id).await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        };
        metrics::record_correctness_recompute(status, start.elapsed().as_secs_f64());
        result
    }

    /// 批量重算，单项失败不影响其他项
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_recompute(&self, ids: Vec<String>) -> BatchResult<CorrectnessSummary> {
        run_batch(
            "recompute_correctness",
            ids,
            self.batch_concurrency,
            |id| id.clone(),
            |id| async move { self.recompute(&id).await },
        )
        .await
    }

    /// 题目在乱序顺序中的位置（从 1 开始），不在题集中时为 0
    pub async fn progress_index(&self, shuffled_quiz_set_id: &str, question_id: &str) -> Result<i32> {
        let set = self
            .shuffled_repo
            .get_shuffled_set(shuffled_quiz_set_id)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(shuffled_quiz_set_id.to_string()))?;

        Ok(set
            .position_of(question_id)
            .map_or(0, |pos| i32::try_from(pos + 1).unwrap_or(i32::MAX)))
    }

    async fn recompute_inner(&self, id: &str) -> Result<CorrectnessSummary> {
        let set = self
            .shuffled_repo
            .get_shuffled_set(id)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(id.to_string()))?;

        let entries = self.submission_repo.list_entries(id).await?;
        let latest = ledger::latest_by_question(&entries);
        let accepted = ledger::count_accepted(&set.question_ids, &latest);
        let total_correctness = i32::try_from(accepted).map_err(|_| {
            EngineError::DataIntegrity(format!("correctness overflow for shuffled quiz set {}", id))
        })?;

        if !self
            .shuffled_repo
            .update_total_correctness(id, total_correctness)
            .await?
        {
            // 读取与写回之间题集被删除
            return Err(EngineError::ShuffledQuizSetNotFound(id.to_string()));
        }

        let answered = ledger::answered_count(&set.question_ids, &latest);
        debug!(
            previous = set.total_correctness,
            total_correctness, answered, "正确数已重算"
        );

        Ok(CorrectnessSummary {
            shuffled_quiz_set_id: set.id.clone(),
            total_correctness,
            answered,
            total_questions: set.len(),
            is_complete: answered == set.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ShuffledQuizSet, SubmissionHistoryEntry};
    use crate::repository::{MockShuffledQuizSetRepositoryTrait, MockSubmissionRepositoryTrait};
    use chrono::Utc;

    fn create_test_set(id: &str) -> ShuffledQuizSet {
        let now = Utc::now();
        ShuffledQuizSet {
            id: id.to_string(),
            original_quiz_set_id: "qs-1".to_string(),
            original_shuffled_quiz_set_id: None,
            student_id: "student-1".to_string(),
            study_plan_id: "sp-1".to_string(),
            learning_material_id: "lm-1".to_string(),
            study_plan_item_id: None,
            session_id: None,
            question_ids: vec!["q3".to_string(), "q1".to_string(), "q2".to_string()],
            random_seed: "1".to_string(),
            total_correctness: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn entry(seq: i64, question_id: &str, accepted: bool) -> SubmissionHistoryEntry {
        SubmissionHistoryEntry {
            seq,
            shuffled_quiz_set_id: "sqs-1".to_string(),
            question_id: question_id.to_string(),
            correct: accepted,
            accepted,
            submitted_at: Utc::now(),
        }
    }

    fn recalculator(
        shuffled: MockShuffledQuizSetRepositoryTrait,
        submissions: MockSubmissionRepositoryTrait,
    ) -> CorrectnessRecalculator<MockShuffledQuizSetRepositoryTrait, MockSubmissionRepositoryTrait>
    {
        CorrectnessRecalculator::new(Arc::new(shuffled), Arc::new(submissions))
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_shuffled_set()
            .returning(|id| Ok(Some(create_test_set(id))));
        shuffled
            .expect_update_total_correctness()
            .withf(|_, total| *total == 2)
            .times(2)
            .returning(|_, _| Ok(true));
        let mut submissions = MockSubmissionRepositoryTrait::new();
        submissions.expect_list_entries().returning(|_| {
            Ok(vec![
                entry(1, "q1", true),
                entry(2, "q2", true),
                entry(3, "q1", true),
            ])
        });

        let recalculator = recalculator(shuffled, submissions);
        let first = recalculator.recompute("sqs-1").await.unwrap();
        let second = recalculator.recompute("sqs-1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.total_correctness, 2);
        assert_eq!(first.answered, 2);
        assert!(!first.is_complete);
    }

    #[tokio::test]
    async fn test_recompute_unknown_set() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled.expect_get_shuffled_set().returning(|_| Ok(None));
        shuffled.expect_update_total_correctness().never();

        let recalculator = recalculator(shuffled, MockSubmissionRepositoryTrait::new());
        assert!(matches!(
            recalculator.recompute("missing").await,
            Err(EngineError::ShuffledQuizSetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_recompute_partial_failure() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_shuffled_set()
            .returning(|id| Ok((id != "gone").then(|| create_test_set(id))));
        shuffled
            .expect_update_total_correctness()
            .returning(|_, _| Ok(true));
        let mut submissions = MockSubmissionRepositoryTrait::new();
        submissions
            .expect_list_entries()
            .returning(|_| Ok(vec![entry(1, "q3", false)]));

        let recalculator = recalculator(shuffled, submissions).with_batch_concurrency(2);
        let batch = recalculator
            .batch_recompute(vec!["a".to_string(), "gone".to_string(), "b".to_string()])
            .await;

        assert_eq!(batch.total, 3);
        assert_eq!(batch.success_count, 2);
        assert_eq!(batch.results[1].key, "gone");
        assert_eq!(
            batch.results[1].error_code.as_deref(),
            Some("SHUFFLED_QUIZ_SET_NOT_FOUND")
        );
        assert_eq!(batch.results[2].data.as_ref().unwrap().total_correctness, 0);
    }

    #[tokio::test]
    async fn test_progress_index() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_shuffled_set()
            .returning(|id| Ok(Some(create_test_set(id))));

        let recalculator = recalculator(shuffled, MockSubmissionRepositoryTrait::new());
        assert_eq!(recalculator.progress_index("sqs-1", "q3").await.unwrap(), 1);
        assert_eq!(recalculator.progress_index("sqs-1", "q2").await.unwrap(), 3);
        assert_eq!(recalculator.progress_index("sqs-1", "q9").await.unwrap(), 0);
    }
}
