//! 成绩聚合服务
//!
//! 单次作答得分：有已发回的批改分数时以批改为准，否则由答题流水推导；
//! 分母始终是原始题集的总分。
//!
//! 学习计划项的最高分取所有有效作答中的最大值（不是平均值），
//! 结果使用 Cache-Aside 模式缓存。创建作答和追加答题记录时失效；
//! 外部写入的批改记录不触发失效，由 TTL 兜底。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use quiz_shared::cache::Cache;
use quiz_shared::observability::metrics;

use crate::error::{EngineError, Result};
use crate::ledger;
use crate::models::{GradingRecord, HighestScore, ScoreResult, ScoreSource, ShuffledQuizSet};
use crate::repository::{
    GradingRepositoryTrait, QuestionCatalogTrait, QuizSetRepositoryTrait,
    ShuffledQuizSetRepositoryTrait, SubmissionRepositoryTrait,
};
use crate::scoring::{self, AttemptGrading};
use crate::service::batch::run_batch;
use crate::service::dto::BatchResult;
use crate::service::quiz_set_store::QuizSetStore;
use crate::service::submission_ledger::highest_score_cache_key;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// 成绩聚合服务
pub struct ScoreAggregator<QR, CR, SR, LR, GR>
where
    QR: QuizSetRepositoryTrait,
    CR: QuestionCatalogTrait,
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
    GR: GradingRepositoryTrait,
{
    quiz_sets: Arc<QuizSetStore<QR, CR>>,
    shuffled_repo: Arc<SR>,
    submission_repo: Arc<LR>,
    grading_repo: Arc<GR>,
    cache: Option<Arc<Cache>>,
    cache_ttl: Duration,
    batch_concurrency: usize,
}

impl<QR, CR, SR, LR, GR> ScoreAggregator<QR, CR, SR, LR, GR>
where
    QR: QuizSetRepositoryTrait,
    CR: QuestionCatalogTrait,
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
    GR: GradingRepositoryTrait,
{
    pub fn new(
        quiz_sets: Arc<QuizSetStore<QR, CR>>,
        shuffled_repo: Arc<SR>,
        submission_repo: Arc<LR>,
        grading_repo: Arc<GR>,
    ) -> Self {
        Self {
            quiz_sets,
            shuffled_repo,
            submission_repo,
            grading_repo,
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency;
        self
    }

    /// 单次作答得分
    #[instrument(skip(self))]
    pub async fn attempt_score(&self, shuffled_quiz_set_id: &str) -> Result<ScoreResult> {
        let set = self
            .shuffled_repo
            .get_shuffled_set(shuffled_quiz_set_id)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(shuffled_quiz_set_id.to_string()))?;

        let records = self
            .grading_repo
            .list_grading_records(std::slice::from_ref(&set.id))
            .await?;
        self.score_with_records(&set, &records).await
    }

    /// 学习计划项的最高分，没有有效作答时为 `None`
    #[instrument(skip(self))]
    pub async fn highest_score(&self, study_plan_item_id: &str) -> Result<Option<HighestScore>> {
        let start = Instant::now();
        let cache_key = highest_score_cache_key(study_plan_item_id);

        // 1. 尝试从缓存获取
        if let Some(cache) = &self.cache {
            match cache.get::<Option<HighestScore>>(&cache_key).await {
                Ok(Some(cached)) => {
                    debug!(cache_key = %cache_key, "最高分缓存命中");
                    metrics::record_highest_score_duration(true, start.elapsed().as_secs_f64());
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => warn!(cache_key = %cache_key, error = %e, "读取最高分缓存失败"),
            }
        }

        // 2. 计算
        let highest = self.compute_highest(study_plan_item_id).await?;

        // 3. 回填缓存
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&cache_key, &highest, self.cache_ttl).await {
                warn!(cache_key = %cache_key, error = %e, "写入最高分缓存失败");
            }
        }

        metrics::record_highest_score_duration(false, start.elapsed().as_secs_f64());
        Ok(highest)
    }

    /// 批量查询最高分
    #[instrument(skip(self, study_plan_item_ids), fields(count = study_plan_item_ids.len()))]
    pub async fn highest_scores(
        &self,
        study_plan_item_ids: Vec<String>,
    ) -> BatchResult<Option<HighestScore>> {
        run_batch(
            "highest_score",
            study_plan_item_ids,
            self.batch_concurrency,
            |id| id.clone(),
            |id| async move { self.highest_score(&id).await },
        )
        .await
    }

    // ==================== 私有方法 ====================

    async fn compute_highest(&self, study_plan_item_id: &str) -> Result<Option<HighestScore>> {
        let attempts = self
            .shuffled_repo
            .list_by_study_plan_item(study_plan_item_id)
            .await?;
        if attempts.is_empty() {
            return Ok(None);
        }

        let ids: Vec<String> = attempts.iter().map(|a| a.id.clone()).collect();
        let mut records_by_set: HashMap<String, Vec<GradingRecord>> = HashMap::new();
        for record in self.grading_repo.list_grading_records(&ids).await? {
            records_by_set
                .entry(record.shuffled_quiz_set_id.clone())
                .or_default()
                .push(record);
        }

        let mut scores = Vec::with_capacity(attempts.len());
        for attempt in &attempts {
            let records = records_by_set.remove(&attempt.id).unwrap_or_default();
            scores.push(self.score_with_records(attempt, &records).await?);
        }

        let eligible = scores.iter().filter(|s| s.eligible).count();
        if eligible < scores.len() {
            debug!(
                skipped = scores.len() - eligible,
                "未提交的作答不参与最高分"
            );
        }
        Ok(scoring::highest(&scores).map(|best| HighestScore {
            study_plan_item_id: study_plan_item_id.to_string(),
            percentage: best.percentage,
            shuffled_quiz_set_id: best.shuffled_quiz_set_id.clone(),
            attempts: eligible,
        }))
    }

    async fn score_with_records(
        &self,
        set: &ShuffledQuizSet,
        records: &[GradingRecord],
    ) -> Result<ScoreResult> {
        // 已存在的乱序题集找不到原始题集属于数据一致性问题
        let original = self
            .quiz_sets
            .get_quiz_set(&set.original_quiz_set_id)
            .await
            .map_err(|e| match e {
                EngineError::QuizSetNotFound(id) => EngineError::DataIntegrity(format!(
                    "shuffled quiz set {} references missing quiz set {}",
                    set.id, id
                )),
                other => other,
            })?;
        let points = self.quiz_sets.point_values(&original.question_ids).await?;
        let denominator = scoring::sum_points(&original.question_ids, &points)?;

        let grading = scoring::resolve_grading(records);
        let (numerator, source) = match grading {
            AttemptGrading::Graded(point) => (i64::from(point), ScoreSource::Graded),
            AttemptGrading::Ledger | AttemptGrading::Excluded => {
                debug!(shuffled_quiz_set_id = %set.id, "无已发回的批改分数，按答题流水计分");
                let entries = self.submission_repo.list_entries(&set.id).await?;
                let latest = ledger::latest_by_question(&entries);
                // 重做题集的题目是原始题集的子集，分值表需覆盖
                let set_points = if set.question_ids.iter().all(|id| points.contains_key(id)) {
                    points
                } else {
                    self.quiz_sets.point_values(&set.question_ids).await?
                };
                (
                    scoring::ledger_points(&set.question_ids, &latest, &set_points)?,
                    ScoreSource::Ledger,
                )
            }
        };

        metrics::record_score_calculation(source.as_str());
        Ok(ScoreResult {
            shuffled_quiz_set_id: set.id.clone(),
            percentage: scoring::percentage(numerator, denominator),
            numerator,
            denominator,
            source,
            eligible: grading != AttemptGrading::Excluded,
        })
    }
}
