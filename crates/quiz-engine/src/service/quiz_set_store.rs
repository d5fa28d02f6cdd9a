//! 原始题集服务
//!
//! 管理学习材料下的原始题集版本，并提供题目分值汇总

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::QuizSet;
use crate::repository::{QuestionCatalogTrait, QuizSetRepositoryTrait};
use crate::scoring;

/// 原始题集服务
pub struct QuizSetStore<QR, CR>
where
    QR: QuizSetRepositoryTrait,
    CR: QuestionCatalogTrait,
{
    quiz_set_repo: Arc<QR>,
    catalog: Arc<CR>,
}

impl<QR, CR> QuizSetStore<QR, CR>
where
    QR: QuizSetRepositoryTrait,
    CR: QuestionCatalogTrait,
{
    pub fn new(quiz_set_repo: Arc<QR>, catalog: Arc<CR>) -> Self {
        Self {
            quiz_set_repo,
            catalog,
        }
    }

    /// 为学习材料创建新版本题集，旧版本软删除
    #[instrument(skip(self, question_ids), fields(learning_material_id = %learning_material_id, count = question_ids.len()))]
    pub async fn create_quiz_set(
        &self,
        learning_material_id: &str,
        question_ids: Vec<String>,
    ) -> Result<QuizSet> {
        if learning_material_id.trim().is_empty() {
            return Err(EngineError::Validation(
                "learning_material_id must not be empty".to_string(),
            ));
        }
        if question_ids.is_empty() {
            return Err(EngineError::Validation(
                "quiz set must contain at least one question".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(question_ids.len());
        if let Some(dup) = question_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(EngineError::Validation(format!(
                "duplicate question id in quiz set: {}",
                dup
            )));
        }

        let quiz_set = QuizSet::new(
            Uuid::now_v7().to_string(),
            learning_material_id.to_string(),
            question_ids,
        );
        self.quiz_set_repo.replace_quiz_set(&quiz_set).await?;

        info!(quiz_set_id = %quiz_set.id, "题集已创建");
        Ok(quiz_set)
    }

    pub async fn get_quiz_set(&self, id: &str) -> Result<QuizSet> {
        self.quiz_set_repo
            .get_quiz_set(id)
            .await?
            .ok_or_else(|| EngineError::QuizSetNotFound(id.to_string()))
    }

    pub async fn get_live_by_learning_material(&self, learning_material_id: &str) -> Result<QuizSet> {
        self.quiz_set_repo
            .get_live_by_learning_material(learning_material_id)
            .await?
            .ok_or_else(|| EngineError::LearningMaterialHasNoQuizSet(learning_material_id.to_string()))
    }

    pub async fn point_values(&self, question_ids: &[String]) -> Result<HashMap<String, i32>> {
        self.catalog.point_values(question_ids).await
    }

    /// 题集总分，任何题目缺少分值都是数据一致性错误
    #[instrument(skip(self))]
    pub async fn total_points(&self, quiz_set_id: &str) -> Result<i64> {
        let quiz_set = self.get_quiz_set(quiz_set_id).await?;
        let points = self.point_values(&quiz_set.question_ids).await?;
        scoring::sum_points(&quiz_set.question_ids, &points)
    }
}
