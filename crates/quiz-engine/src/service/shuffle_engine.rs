//! 乱序引擎
//!
//! 为每次作答生成学生专属的题目排列，并提供窗口分页、种子查询和选项排列。
//!
//! ## 创建流程
//!
//! 1. 会话幂等检查 -> 2. 定位原始题集 -> 3. 生成/采用种子 -> 4. 计算排列 -> 5. 写入

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use quiz_shared::cache::Cache;
use quiz_shared::observability::metrics;

use crate::error::{EngineError, Result};
use crate::ledger;
use crate::models::{QuizSet, RandomSeed, ShuffledQuizSet};
use crate::repository::{
    QuizSetRepositoryTrait, ShuffledQuizSetRepositoryTrait, SubmissionRepositoryTrait,
};
use crate::service::dto::CreateShuffledSetRequest;
use crate::service::submission_ledger::invalidate_highest_score;
use crate::shuffle;

/// 乱序引擎
pub struct ShuffleEngine<QR, SR, LR>
where
    QR: QuizSetRepositoryTrait,
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
{
    quiz_set_repo: Arc<QR>,
    shuffled_repo: Arc<SR>,
    submission_repo: Arc<LR>,
    cache: Option<Arc<Cache>>,
}

impl<QR, SR, LR> ShuffleEngine<QR, SR, LR>
where
    QR: QuizSetRepositoryTrait,
    SR: ShuffledQuizSetRepositoryTrait,
    LR: SubmissionRepositoryTrait,
{
    pub fn new(quiz_set_repo: Arc<QR>, shuffled_repo: Arc<SR>, submission_repo: Arc<LR>) -> Self {
        Self {
            quiz_set_repo,
            shuffled_repo,
            submission_repo,
            cache: None,
        }
    }

    /// 新作答会改变学习计划项的作答集合，创建后使其最高分缓存失效
    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 创建乱序题集
    ///
    /// 排列只由 (原始顺序, 种子) 决定；同一 session 重复进入时返回已有题集
    #[instrument(skip(self, request), fields(student_id = %request.student_id, learning_material_id = %request.learning_material_id))]
    pub async fn create_shuffled_set(
        &self,
        request: CreateShuffledSetRequest,
    ) -> Result<ShuffledQuizSet> {
        if let Some(session_id) = request.session_id.as_deref() {
            if let Some(existing) = self.shuffled_repo.get_by_session(session_id).await? {
                if existing.student_id != request.student_id
                    || existing.learning_material_id != request.learning_material_id
                {
                    return Err(EngineError::Validation(format!(
                        "session {} belongs to student {} on learning material {}",
                        session_id, existing.student_id, existing.learning_material_id
                    )));
                }
                debug!(shuffled_quiz_set_id = %existing.id, session_id, "会话已有乱序题集，直接返回");
                return Ok(existing);
            }
        }

        let original = self.resolve_original(&request).await?;
        if original.is_empty() {
            return Err(EngineError::Validation(format!(
                "quiz set {} has no questions",
                original.id
            )));
        }

        let seed = request
            .seed
            .map(RandomSeed::from)
            .unwrap_or_else(RandomSeed::generate);
        let question_ids = if request.keep_order {
            original.question_ids.clone()
        } else {
            shuffle::shuffle_questions(&original.question_ids, seed)
        };

        let now = Utc::now();
        let shuffled = ShuffledQuizSet {
            id: Uuid::now_v7().to_string(),
            original_quiz_set_id: original.id,
            original_shuffled_quiz_set_id: None,
            student_id: request.student_id,
            study_plan_id: request.study_plan_id,
            learning_material_id: request.learning_material_id,
            study_plan_item_id: request.study_plan_item_id,
            session_id: request.session_id,
            question_ids,
            random_seed: seed.to_string(),
            total_correctness: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.shuffled_repo.create_shuffled_set(&shuffled).await?;
        if let Some(study_plan_item_id) = shuffled.study_plan_item_id.as_deref() {
            invalidate_highest_score(self.cache.as_deref(), study_plan_item_id).await;
        }

        metrics::record_shuffled_set_created(false);
        info!(
            shuffled_quiz_set_id = %shuffled.id,
            question_count = shuffled.len(),
            keep_order = request.keep_order,
            "乱序题集已创建"
        );
        Ok(shuffled)
    }

    /// 创建重做题集
    ///
    /// 只包含上一次作答中最新记录未被认可的题目，用新种子重新打乱
    #[instrument(skip(self))]
    pub async fn create_retry_set(
        &self,
        previous_shuffled_set_id: &str,
        seed: Option<i64>,
    ) -> Result<ShuffledQuizSet> {
        let previous = self.get_shuffled_set(previous_shuffled_set_id).await?;
        let entries = self.submission_repo.list_entries(&previous.id).await?;
        let latest = ledger::latest_by_question(&entries);

        let remaining: Vec<String> = ledger::not_accepted(&previous.question_ids, &latest)
            .into_iter()
            .cloned()
            .collect();
        if remaining.is_empty() {
            return Err(EngineError::AllQuestionsAccepted(previous.id));
        }

        let seed = seed.map(RandomSeed::from).unwrap_or_else(RandomSeed::generate);
        let now = Utc::now();
        let retry = ShuffledQuizSet {
            id: Uuid::now_v7().to_string(),
            original_quiz_set_id: previous.original_quiz_set_id.clone(),
            original_shuffled_quiz_set_id: Some(previous.id.clone()),
            student_id: previous.student_id.clone(),
            study_plan_id: previous.study_plan_id.clone(),
            learning_material_id: previous.learning_material_id.clone(),
            study_plan_item_id: previous.study_plan_item_id.clone(),
            session_id: None,
            question_ids: shuffle::shuffle_questions(&remaining, seed),
            random_seed: seed.to_string(),
            total_correctness: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.shuffled_repo.create_shuffled_set(&retry).await?;
        if let Some(study_plan_item_id) = retry.study_plan_item_id.as_deref() {
            invalidate_highest_score(self.cache.as_deref(), study_plan_item_id).await;
        }

        metrics::record_shuffled_set_created(true);
        info!(
            shuffled_quiz_set_id = %retry.id,
            previous = %previous.id,
            question_count = retry.len(),
            "重做题集已创建"
        );
        Ok(retry)
    }

    pub async fn get_shuffled_set(&self, id: &str) -> Result<ShuffledQuizSet> {
        self.shuffled_repo
            .get_shuffled_set(id)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(id.to_string()))
    }

    /// 乱序顺序的 `[from, to)` 片段，越界时截断
    #[instrument(skip(self))]
    pub async fn get_window(&self, id: &str, from: i64, to: i64) -> Result<Vec<String>> {
        let clamp = |v: i64| v.clamp(0, i64::from(i32::MAX)) as i32;
        let (from, to) = (clamp(from), clamp(to));
        if to <= from {
            // 仍需确认题集存在
            self.get_shuffled_set(id).await?;
            return Ok(Vec::new());
        }

        self.shuffled_repo
            .get_window(id, from, to)
            .await?
            .ok_or_else(|| EngineError::ShuffledQuizSetNotFound(id.to_string()))
    }

    /// 创建时的种子，之后不再改变
    pub async fn get_seed(&self, id: &str) -> Result<RandomSeed> {
        self.get_shuffled_set(id).await?.seed()
    }

    /// 某道题的选项排列，由 `seed + 题目位置` 决定
    pub async fn option_order(
        &self,
        id: &str,
        question_id: &str,
        option_count: usize,
    ) -> Result<Vec<usize>> {
        let set = self.get_shuffled_set(id).await?;
        let position = set.position_of(question_id).ok_or_else(|| {
            EngineError::Validation(format!(
                "question {} does not belong to shuffled quiz set {}",
                question_id, id
            ))
        })?;
        Ok(shuffle::option_order(set.seed()?, position, option_count))
    }

    // ==================== 私有方法 ====================

    async fn resolve_original(&self, request: &CreateShuffledSetRequest) -> Result<QuizSet> {
        match request.original_quiz_set_id.as_deref() {
            Some(quiz_set_id) => {
                let quiz_set = self
                    .quiz_set_repo
                    .get_quiz_set(quiz_set_id)
                    .await?
                    .filter(QuizSet::is_live)
                    .ok_or_else(|| EngineError::QuizSetNotFound(quiz_set_id.to_string()))?;
                if quiz_set.learning_material_id != request.learning_material_id {
                    return Err(EngineError::Validation(format!(
                        "quiz set {} belongs to learning material {}, not {}",
                        quiz_set.id, quiz_set.learning_material_id, request.learning_material_id
                    )));
                }
                Ok(quiz_set)
            }
            None => self
                .quiz_set_repo
                .get_live_by_learning_material(&request.learning_material_id)
                .await?
                .ok_or_else(|| {
                    EngineError::LearningMaterialHasNoQuizSet(request.learning_material_id.clone())
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionHistoryEntry;
    use crate::repository::{
        MockQuizSetRepositoryTrait, MockShuffledQuizSetRepositoryTrait,
        MockSubmissionRepositoryTrait,
    };

    type TestEngine = ShuffleEngine<
        MockQuizSetRepositoryTrait,
        MockShuffledQuizSetRepositoryTrait,
        MockSubmissionRepositoryTrait,
    >;

    fn create_test_quiz_set() -> QuizSet {
        QuizSet::new(
            "qs-1".to_string(),
            "lm-1".to_string(),
            (1..=8).map(|i| format!("q{}", i)).collect(),
        )
    }

    fn create_test_shuffled(question_ids: Vec<String>) -> ShuffledQuizSet {
        let now = Utc::now();
        ShuffledQuizSet {
            id: "sqs-1".to_string(),
            original_quiz_set_id: "qs-1".to_string(),
            original_shuffled_quiz_set_id: None,
            student_id: "student-1".to_string(),
            study_plan_id: "sp-1".to_string(),
            learning_material_id: "lm-1".to_string(),
            study_plan_item_id: Some("spi-1".to_string()),
            session_id: None,
            question_ids,
            random_seed: "42".to_string(),
            total_correctness: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn engine(
        quiz_sets: MockQuizSetRepositoryTrait,
        shuffled: MockShuffledQuizSetRepositoryTrait,
        submissions: MockSubmissionRepositoryTrait,
    ) -> TestEngine {
        ShuffleEngine::new(Arc::new(quiz_sets), Arc::new(shuffled), Arc::new(submissions))
    }

    #[tokio::test]
    async fn test_create_uses_live_quiz_set_and_seed() {
        let mut quiz_sets = MockQuizSetRepositoryTrait::new();
        quiz_sets
            .expect_get_live_by_learning_material()
            .returning(|_| Ok(Some(create_test_quiz_set())));
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_create_shuffled_set()
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine(quiz_sets, shuffled, MockSubmissionRepositoryTrait::new());
        let request = CreateShuffledSetRequest::new("student-1", "sp-1", "lm-1").with_seed(99);
        let set = engine.create_shuffled_set(request).await.unwrap();

        let original = create_test_quiz_set();
        assert_eq!(set.random_seed, "99");
        assert_eq!(
            set.question_ids,
            shuffle::shuffle_questions(&original.question_ids, RandomSeed(99))
        );
        assert!(shuffle::is_permutation_of(&set.question_ids, &original.question_ids));
        assert_eq!(set.total_correctness, 0);
    }

    #[tokio::test]
    async fn test_create_keep_order_still_stores_seed() {
        let mut quiz_sets = MockQuizSetRepositoryTrait::new();
        quiz_sets
            .expect_get_quiz_set()
            .returning(|_| Ok(Some(create_test_quiz_set())));
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled.expect_create_shuffled_set().returning(|_| Ok(()));

        let engine = engine(quiz_sets, shuffled, MockSubmissionRepositoryTrait::new());
        let request = CreateShuffledSetRequest::new("student-1", "sp-1", "lm-1")
            .with_original("qs-1")
            .keep_order();
        let set = engine.create_shuffled_set(request).await.unwrap();

        assert_eq!(set.question_ids, create_test_quiz_set().question_ids);
        assert!(set.seed().is_ok());
    }

    #[tokio::test]
    async fn test_create_reuses_session_set() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_by_session()
            .returning(|_| Ok(Some(create_test_shuffled(vec!["q1".to_string()]))));
        shuffled.expect_create_shuffled_set().never();

        let engine = engine(
            MockQuizSetRepositoryTrait::new(),
            shuffled,
            MockSubmissionRepositoryTrait::new(),
        );
        let request = CreateShuffledSetRequest::new("student-1", "sp-1", "lm-1").with_session("s");
        assert_eq!(engine.create_shuffled_set(request).await.unwrap().id, "sqs-1");
    }

    #[tokio::test]
    async fn test_create_rejects_session_of_another_owner() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_by_session()
            .returning(|_| Ok(Some(create_test_shuffled(vec!["q1".to_string()]))));
        shuffled.expect_create_shuffled_set().never();

        let engine = engine(
            MockQuizSetRepositoryTrait::new(),
            shuffled,
            MockSubmissionRepositoryTrait::new(),
        );

        let other_student =
            CreateShuffledSetRequest::new("student-2", "sp-1", "lm-1").with_session("s");
        assert!(matches!(
            engine.create_shuffled_set(other_student).await,
            Err(EngineError::Validation(_))
        ));

        let other_material =
            CreateShuffledSetRequest::new("student-1", "sp-1", "lm-9").with_session("s");
        assert!(matches!(
            engine.create_shuffled_set(other_material).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_deleted_or_foreign_original() {
        let mut quiz_sets = MockQuizSetRepositoryTrait::new();
        quiz_sets.expect_get_quiz_set().returning(|id| {
            let mut qs = create_test_quiz_set();
            if id == "deleted" {
                qs.deleted_at = Some(Utc::now());
            }
            Ok(Some(qs))
        });
        let engine = engine(
            quiz_sets,
            MockShuffledQuizSetRepositoryTrait::new(),
            MockSubmissionRepositoryTrait::new(),
        );

        let deleted = CreateShuffledSetRequest::new("s", "sp", "lm-1").with_original("deleted");
        assert!(matches!(
            engine.create_shuffled_set(deleted).await,
            Err(EngineError::QuizSetNotFound(_))
        ));

        let foreign = CreateShuffledSetRequest::new("s", "sp", "lm-2").with_original("qs-1");
        assert!(matches!(
            engine.create_shuffled_set(foreign).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_without_quiz_set() {
        let mut quiz_sets = MockQuizSetRepositoryTrait::new();
        quiz_sets
            .expect_get_live_by_learning_material()
            .returning(|_| Ok(None));
        let engine = engine(
            quiz_sets,
            MockShuffledQuizSetRepositoryTrait::new(),
            MockSubmissionRepositoryTrait::new(),
        );

        let err = engine
            .create_shuffled_set(CreateShuffledSetRequest::new("s", "sp", "lm-9"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_retry_set_contains_only_unaccepted_questions() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled.expect_get_shuffled_set().returning(|_| {
            Ok(Some(create_test_shuffled(vec![
                "q3".to_string(),
                "q1".to_string(),
                "q2".to_string(),
            ])))
        });
        shuffled
            .expect_create_shuffled_set()
            .withf(|s| s.original_shuffled_quiz_set_id.as_deref() == Some("sqs-1"))
            .returning(|_| Ok(()));
        let mut submissions = MockSubmissionRepositoryTrait::new();
        submissions.expect_list_entries().returning(|_| {
            Ok(vec![SubmissionHistoryEntry {
                seq: 1,
                shuffled_quiz_set_id: "sqs-1".to_string(),
                question_id: "q1".to_string(),
                correct: true,
                accepted: true,
                submitted_at: Utc::now(),
            }])
        });

        let engine = engine(MockQuizSetRepositoryTrait::new(), shuffled, submissions);
        let retry = engine.create_retry_set("sqs-1", Some(5)).await.unwrap();

        let mut ids = retry.question_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["q2", "q3"]);
        assert_eq!(retry.original_quiz_set_id, "qs-1");
        assert_eq!(retry.study_plan_item_id.as_deref(), Some("spi-1"));
    }

    #[tokio::test]
    async fn test_retry_set_when_everything_accepted() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_shuffled_set()
            .returning(|_| Ok(Some(create_test_shuffled(vec!["q1".to_string()]))));
        shuffled.expect_create_shuffled_set().never();
        let mut submissions = MockSubmissionRepositoryTrait::new();
        submissions.expect_list_entries().returning(|_| {
            Ok(vec![SubmissionHistoryEntry {
                seq: 1,
                shuffled_quiz_set_id: "sqs-1".to_string(),
                question_id: "q1".to_string(),
                correct: false,
                accepted: true,
                submitted_at: Utc::now(),
            }])
        });

        let engine = engine(MockQuizSetRepositoryTrait::new(), shuffled, submissions);
        assert!(matches!(
            engine.create_retry_set("sqs-1", None).await,
            Err(EngineError::AllQuestionsAccepted(_))
        ));
    }

    #[tokio::test]
    async fn test_get_window_clamps_before_query() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled
            .expect_get_window()
            .withf(|_, from, to| *from == 0 && *to == 3)
            .returning(|_, _, _| Ok(Some(vec!["q2".to_string(), "q3".to_string()])));
        shuffled
            .expect_get_shuffled_set()
            .returning(|_| Ok(Some(create_test_shuffled(vec!["q1".to_string()]))));

        let engine = engine(
            MockQuizSetRepositoryTrait::new(),
            shuffled,
            MockSubmissionRepositoryTrait::new(),
        );
        assert_eq!(engine.get_window("sqs-1", -5, 3).await.unwrap().len(), 2);
        assert!(engine.get_window("sqs-1", 4, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_window_unknown_set() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled.expect_get_window().returning(|_, _, _| Ok(None));
        let engine = engine(
            MockQuizSetRepositoryTrait::new(),
            shuffled,
            MockSubmissionRepositoryTrait::new(),
        );
        assert!(matches!(
            engine.get_window("nope", 0, 10).await,
            Err(EngineError::ShuffledQuizSetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_and_option_order() {
        let mut shuffled = MockShuffledQuizSetRepositoryTrait::new();
        shuffled.expect_get_shuffled_set().returning(|_| {
            Ok(Some(create_test_shuffled(vec![
                "q1".to_string(),
                "q2".to_string(),
            ])))
        });
        let engine = engine(
            MockQuizSetRepositoryTrait::new(),
            shuffled,
            MockSubmissionRepositoryTrait::new(),
        );

        assert_eq!(engine.get_seed("sqs-1").await.unwrap(), RandomSeed(42));
        assert_eq!(
            engine.option_order("sqs-1", "q2", 4).await.unwrap(),
            shuffle::option_order(RandomSeed(42), 1, 4)
        );
        assert!(matches!(
            engine.option_order("sqs-1", "q9", 4).await,
            Err(EngineError::Validation(_))
        ));
    }
}
