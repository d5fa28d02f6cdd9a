//! 作答进度服务
//!
//! 记录学生在某个学习材料上的当前乱序题集和位置，用于断点续答。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{EngineError, Result};
use crate::models::{ProgressionKey, QuizProgression, ShuffledQuizSet};
use crate::repository::{ProgressionRepositoryTrait, ShuffledQuizSetRepositoryTrait};
use crate::service::batch::run_batch;
use crate::service::dto::{BatchResult, UpsertProgressionRequest, WindowRequest};
use crate::shuffle;

const DEFAULT_WINDOW_SIZE: u32 = 100;
const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// 作答进度服务
pub struct ProgressionService<SR, PR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    PR: ProgressionRepositoryTrait,
{
    shuffled_repo: Arc<SR>,
    progression_repo: Arc<PR>,
    default_window_size: u32,
    batch_concurrency: usize,
}

impl<SR, PR> ProgressionService<SR, PR>
where
    SR: ShuffledQuizSetRepositoryTrait,
    PR: ProgressionRepositoryTrait,
{
    pub fn new(shuffled_repo: Arc<SR>, progression_repo: Arc<PR>) -> Self {
        Self {
            shuffled_repo,
            progression_repo,
            default_window_size: DEFAULT_WINDOW_SIZE,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_default_window_size(mut self, size: u32) -> Self {
        self.default_window_size = size;
        self
    }

    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency;
        self
    }

    /// 写入进度，同一键的旧记录整体替换
    #[instrument(skip(self, request), fields(student_id = %request.key.student_id, shuffled_quiz_set_id = %request.shuffled_quiz_set_id))]
    pub async fn upsert_progression(
        &self,
        request: UpsertProgressionRequest,
    ) -> Result<QuizProgression> {
        let set = self
            .shuffled_repo
            .get_shuffled_set(&request.shuffled_quiz_set_id)
            .await?
            .ok_or_else(|| {
                EngineError::ShuffledQuizSetNotFound(request.shuffled_quiz_set_id.clone())
            })?;
        validate_owner(&set, &request.key)?;

        if request.last_index < 0 || request.last_index as usize >= set.len() {
            return Err(EngineError::InvalidRange {
                index: i64::from(request.last_index),
                len: set.len(),
            });
        }

        let (window_from, window_to, window_question_ids) = match request.window {
            Some(window) => self.resolve_window(&set, window)?,
            None => (None, None, Vec::new()),
        };

        let now = Utc::now();
        let progression = QuizProgression {
            student_id: request.key.student_id,
            study_plan_id: request.key.study_plan_id,
            learning_material_id: request.key.learning_material_id,
            shuffled_quiz_set_id: set.id.clone(),
            last_index: request.last_index,
            window_from,
            window_to,
            window_question_ids,
            created_at: now,
            updated_at: now,
        };
        let stored = self.progression_repo.upsert_progression(&progression).await?;

        info!(last_index = stored.last_index, "作答进度已更新");
        Ok(stored)
    }

    pub async fn get_progression(&self, key: &ProgressionKey) -> Result<QuizProgression> {
        self.progression_repo
            .get_progression(key)
            .await?
            .ok_or_else(|| EngineError::ProgressionNotFound {
                student_id: key.student_id.clone(),
                learning_material_id: key.learning_material_id.clone(),
            })
    }

    /// 批量写入进度
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn batch_upsert_progressions(
        &self,
        requests: Vec<UpsertProgressionRequest>,
    ) -> BatchResult<QuizProgression> {
        run_batch(
            "upsert_progression",
            requests,
            self.batch_concurrency,
            |r| {
                format!(
                    "{}:{}:{}",
                    r.key.student_id, r.key.study_plan_id, r.key.learning_material_id
                )
            },
            |r| async move { self.upsert_progression(r).await },
        )
        .await
    }

    fn resolve_window(
        &self,
        set: &ShuffledQuizSet,
        window: WindowRequest,
    ) -> Result<(Option<i32>, Option<i32>, Vec<String>)> {
        let to = window
            .to
            .unwrap_or_else(|| window.from.saturating_add(i64::from(self.default_window_size)));
        let range = shuffle::clamp_window(set.len(), window.from, to);
        let question_ids = set.question_ids[range.clone()].to_vec();

        let to_i32 = |v: usize| {
            i32::try_from(v).map_err(|_| EngineError::InvalidRange {
                index: v as i64,
                len: set.len(),
            })
        };
        Ok((
            Some(to_i32(range.start)?),
            Some(to_i32(range.end)?),
            question_ids,
        ))
    }
}

fn validate_owner(set: &ShuffledQuizSet, key: &ProgressionKey) -> Result<()> {
    if set.student_id != key.student_id
        || set.study_plan_id != key.study_plan_id
        || set.learning_material_id != key.learning_material_id
    {
        return Err(EngineError::Validation(format!(
            "shuffled quiz set {} does not belong to student {} on learning material {}",
            set.id, key.student_id, key.learning_material_id
        )));
    }
    Ok(())
}
