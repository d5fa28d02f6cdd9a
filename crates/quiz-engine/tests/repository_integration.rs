//! PostgreSQL 仓储集成测试
//!
//! 需要运行中的数据库（TEST_DATABASE_URL），默认忽略：
//! `cargo test -p quiz-engine --test repository_integration -- --ignored`

use std::sync::Arc;

use quiz_engine::dto::{CreateShuffledSetRequest, UpsertProgressionRequest, WindowRequest};
use quiz_engine::{
    CorrectnessRecalculator, EngineError, ExamSubmissionStatus, GradingRepository, NewSubmission,
    ProgressionKey, ProgressionRepository, ProgressionService, QuestionCatalogRepository,
    QuizSetRepository, QuizSetStore, ScoreAggregator, ScoreSource, ShuffleEngine,
    ShuffledQuizSetRepository, SubmissionLedger, SubmissionRepository,
};
use quiz_shared::database::Database;
use quiz_shared::test_utils::{
    test_database_config, test_id, test_learning_material_id, test_question_ids, test_student_id,
};

struct Repos {
    db: Database,
    quiz_sets: Arc<QuizSetRepository>,
    catalog: Arc<QuestionCatalogRepository>,
    shuffled: Arc<ShuffledQuizSetRepository>,
    submissions: Arc<SubmissionRepository>,
    grading: Arc<GradingRepository>,
    progressions: Arc<ProgressionRepository>,
}

async fn setup() -> Repos {
    let db = Database::connect(&test_database_config())
        .await
        .expect("database should be reachable");
    db.run_migrations().await.expect("migrations should apply");
    let pool = db.pool().clone();

    Repos {
        quiz_sets: Arc::new(QuizSetRepository::new(pool.clone())),
        catalog: Arc::new(QuestionCatalogRepository::new(pool.clone())),
        shuffled: Arc::new(ShuffledQuizSetRepository::new(pool.clone())),
        submissions: Arc::new(SubmissionRepository::new(pool.clone())),
        grading: Arc::new(GradingRepository::new(pool.clone())),
        progressions: Arc::new(ProgressionRepository::new(pool)),
        db,
    }
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_attempt_roundtrip_against_postgres() {
    let repos = setup().await;
    let store = Arc::new(QuizSetStore::new(
        repos.quiz_sets.clone(),
        repos.catalog.clone(),
    ));

    let question_ids = test_question_ids(4);
    for id in &question_ids {
        repos.catalog.upsert_point(id, 1).await.unwrap();
    }
    let lm = test_learning_material_id();
    store.create_quiz_set(&lm, question_ids.clone()).await.unwrap();

    let spi = test_id("spi");
    let engine = ShuffleEngine::new(
        repos.quiz_sets.clone(),
        repos.shuffled.clone(),
        repos.submissions.clone(),
    );
    let set = engine
        .create_shuffled_set(
            CreateShuffledSetRequest::new(test_student_id(), "sp-it", lm.clone())
                .with_study_plan_item(spi.clone())
                .with_seed(12345),
        )
        .await
        .unwrap();

    // 窗口截断在数据库侧完成
    let window = engine.get_window(&set.id, 2, 100).await.unwrap();
    assert_eq!(window, set.question_ids[2..].to_vec());

    let ledger = SubmissionLedger::new(
        repos.shuffled.clone(),
        repos.submissions.clone(),
        repos.grading.clone(),
    );
    for (i, qid) in set.question_ids.iter().enumerate() {
        let correct = i < 3;
        ledger
            .append_answer(&set.id, NewSubmission::new(qid.clone(), correct, correct))
            .await
            .unwrap();
    }

    let recalculator = CorrectnessRecalculator::new(repos.shuffled.clone(), repos.submissions.clone());
    assert_eq!(recalculator.recompute(&set.id).await.unwrap().total_correctness, 3);

    let scores = ScoreAggregator::new(
        store.clone(),
        repos.shuffled.clone(),
        repos.submissions.clone(),
        repos.grading.clone(),
    );
    let score = scores.attempt_score(&set.id).await.unwrap();
    assert_eq!(score.percentage, 75.0);

    repos
        .grading
        .upsert_exam_grading(&set.id, ExamSubmissionStatus::Returned, Some(4))
        .await
        .unwrap();
    let graded = scores.attempt_score(&set.id).await.unwrap();
    assert_eq!(graded.source, ScoreSource::Graded);
    assert_eq!(graded.percentage, 100.0);

    let highest = scores.highest_score(&spi).await.unwrap().unwrap();
    assert_eq!(highest.shuffled_quiz_set_id, set.id);

    repos.db.close().await;
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_replacing_quiz_set_keeps_old_version_readable() {
    let repos = setup().await;
    let store = QuizSetStore::new(repos.quiz_sets.clone(), repos.catalog.clone());
    let lm = test_learning_material_id();

    let v1 = store.create_quiz_set(&lm, test_question_ids(2)).await.unwrap();
    let v2 = store.create_quiz_set(&lm, test_question_ids(3)).await.unwrap();

    let live = store.get_live_by_learning_material(&lm).await.unwrap();
    assert_eq!(live.id, v2.id);
    let old = store.get_quiz_set(&v1.id).await.unwrap();
    assert!(!old.is_live());

    repos.db.close().await;
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_progression_upsert_against_postgres() {
    let repos = setup().await;
    let store = QuizSetStore::new(repos.quiz_sets.clone(), repos.catalog.clone());
    let lm = test_learning_material_id();
    let student = test_student_id();
    store.create_quiz_set(&lm, test_question_ids(5)).await.unwrap();

    let engine = ShuffleEngine::new(
        repos.quiz_sets.clone(),
        repos.shuffled.clone(),
        repos.submissions.clone(),
    );
    let set = engine
        .create_shuffled_set(CreateShuffledSetRequest::new(student.clone(), "sp-it", lm.clone()))
        .await
        .unwrap();

    let service = ProgressionService::new(repos.shuffled.clone(), repos.progressions.clone());
    let key = ProgressionKey::new(student, "sp-it", lm);
    for last_index in [1, 3] {
        service
            .upsert_progression(UpsertProgressionRequest {
                key: key.clone(),
                shuffled_quiz_set_id: set.id.clone(),
                last_index,
                window: Some(WindowRequest { from: 1, to: None }),
            })
            .await
            .unwrap();
    }

    let stored = service.get_progression(&key).await.unwrap();
    assert_eq!(stored.last_index, 3);
    assert_eq!(stored.window_question_ids, set.question_ids[1..].to_vec());

    let missing = ProgressionKey::new("nobody", "sp-it", "lm-none");
    assert!(matches!(
        service.get_progression(&missing).await,
        Err(EngineError::ProgressionNotFound { .. })
    ));

    repos.db.close().await;
}
