//! 答题流水服务
//!
//! 流水只追加不修改，同一题目以最新一条记录为准。
//! 写入后使对应学习计划项的最高分缓存失效。

use std::sync::Arc;

use tracing::{info, instrument, warn};

use quiz_shared::cache::Cache;
use quiz_shared::observability::metrics;

use crate::error::{EngineError, Result};
use crate::ledger::{self, LatestEntries};
use crate::models::{AttemptState, NewSubmission, ShuffledQuizSet, SubmissionHistoryEntry};
use crate::repository::{
    GradingRepositoryTrait, ShuffledQuizSetRepositoryTrait, SubmissionRepositoryTrait,
};
use crate::service::dto::{SubmissionHistoryItem, SubmissionHistoryPage};

/// 最高分缓存键
pub fn highest_score_cache_key(study_plan_item_id: &str) -> String {
    format!("highest_score:{}", study_plan_item_id)
}

/// 作答集合变化后删除最高分缓存，失败只记录日志
pub(crate) async fn invalidate_highest_score(cache: Option<&Cache>, study_plan_item_id: &str) {
    let Some(cache) = cache else {
        return;
    };
    let key = highest_score_cache_key(study_plan_item_id);
    if let Err(e) = cache.invalidate(&key).await {
        warn!(cache_key = %key, error = %e, "最高分缓存失效失败");
    }
}

/// 答题流水服务
pub struct SubmissionLedger<SR, LR, GR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
    GR: GradingRepositoryTrait,
{
    shuffled_repo: Arc<SR>,
    submission_repo: Arc<LR>,
    grading_repo: Arc<GR>,
    cache: Option<Arc<Cache>>,
}

impl<SR, LR, GR> SubmissionLedger<SR, LR, GR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
    GR: GradingRepositoryTrait,
{
    pub fn new(shuffled_repo: Arc<SR>, submission_repo: Arc<LR>, grading_repo: Arc<GR>) -> Self {
        Self {
            shuffled_repo,
            submission_repo,
            grading_repo,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 追加一条答题记录
    ///
    /// 题目必须属于该乱序题集；重复提交相同答案只会多一条流水，不影响结果
    #[instrument(skip(self, submission), fields(question_id = %submission.question_id))]
    pub async fn append_answer(
        &self,
        shuffled_quiz_set_id: &str,
        submission: NewSubmission,
    ) -> Result<SubmissionHistoryEntry> {
        let set = self.load_set(shuffled_quiz_set_id).await?;
        if !set.contains(&submission.question_id) {
            return Err(EngineError::Validation(format!(
                "question {} does not belong to shuffled quiz set {}",
                submission.question_id, shuffled_quiz_set_id
            )));
        }

        // 写入时题集可能刚被删除
        let seq = self
            .submission_repo
            .append(shuffled_quiz_set_id, &submission)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(shuffled_quiz_set_id.to_string()))?;

        if let Some(study_plan_item_id) = set.study_plan_item_id.as_deref() {
            invalidate_highest_score(self.cache.as_deref(), study_plan_item_id).await;
        }

        metrics::record_ledger_append(submission.correct, submission.accepted);
        info!(seq, correct = submission.correct, "答题记录已追加");

        Ok(SubmissionHistoryEntry {
            seq,
            shuffled_quiz_set_id: shuffled_quiz_set_id.to_string(),
            question_id: submission.question_id,
            correct: submission.correct,
            accepted: submission.accepted,
            submitted_at: submission.submitted_at,
        })
    }

    /// 每道题的最新记录
    pub async fn latest_by_question(&self, shuffled_quiz_set_id: &str) -> Result<LatestEntries> {
        self.load_set(shuffled_quiz_set_id).await?;
        let entries = self.submission_repo.list_entries(shuffled_quiz_set_id).await?;
        Ok(ledger::latest_by_question(&entries))
    }

    /// 乱序顺序中的每道题都至少有一条记录
    pub async fn is_complete(&self, shuffled_quiz_set_id: &str) -> Result<bool> {
        let set = self.load_set(shuffled_quiz_set_id).await?;
        let entries = self.submission_repo.list_entries(shuffled_quiz_set_id).await?;
        Ok(ledger::is_complete(
            &set.question_ids,
            &ledger::latest_by_question(&entries),
        ))
    }

    /// 按乱序顺序分页的答题历史
    #[instrument(skip(self))]
    pub async fn submission_history(
        &self,
        shuffled_quiz_set_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SubmissionHistoryPage> {
        let set = self.load_set(shuffled_quiz_set_id).await?;
        let entries = self.submission_repo.list_entries(shuffled_quiz_set_id).await?;
        let mut latest = ledger::latest_by_question(&entries);

        let items = set
            .question_ids
            .iter()
            .enumerate()
            .skip(offset)
            .take(limit)
            .map(|(position, question_id)| SubmissionHistoryItem {
                position,
                question_id: question_id.clone(),
                latest: latest.remove(question_id),
            })
            .collect();

        Ok(SubmissionHistoryPage {
            shuffled_quiz_set_id: set.id.clone(),
            total_questions: set.len(),
            items,
        })
    }

    /// 当前作答状态
    #[instrument(skip(self))]
    pub async fn attempt_state(&self, shuffled_quiz_set_id: &str) -> Result<AttemptState> {
        let set = self.load_set(shuffled_quiz_set_id).await?;

        let records = self
            .grading_repo
            .list_grading_records(std::slice::from_ref(&set.id))
            .await?;
        if !records.is_empty() {
            return Ok(AttemptState::Graded);
        }

        let entries = self.submission_repo.list_entries(shuffled_quiz_set_id).await?;
        let latest = ledger::latest_by_question(&entries);
        let state = if ledger::is_complete(&set.question_ids, &latest) {
            AttemptState::Completed
        } else if ledger::answered_count(&set.question_ids, &latest) > 0 {
            AttemptState::InProgress
        } else {
            AttemptState::Created
        };
        Ok(state)
    }

    // ==================== 私有方法 ====================

    async fn load_set(&self, id: &str) -> Result<ShuffledQuizSet> {
        self.shuffled_repo
            .get_shuffled_set(id)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(id.to_string()))
    }
}
