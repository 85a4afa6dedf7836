//! 评估与成绩

use super::{SeaOrmStorage, db_error};
use crate::entity::assessments::{
    ActiveModel as AssessmentActiveModel, Column as AssessmentColumn, Entity as Assessments,
};
use crate::entity::grades::{ActiveModel as GradeActiveModel, Column as GradeColumn, Entity as Grades};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    grades::{
        entities::{Assessment, Grade},
        requests::{
            AssessmentListQuery, CreateAssessmentRequest, GradeEntry, UpdateAssessmentRequest,
        },
        responses::AssessmentListResponse,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    pub async fn create_assessment_impl(&self, req: CreateAssessmentRequest) -> Result<Assessment> {
        let now = chrono::Utc::now().timestamp();

        let model = AssessmentActiveModel {
            subject_id: Set(req.subject_id),
            title: Set(req.title),
            term: Set(req.term),
            max_score: Set(req.max_score),
            applied_on: Set(req.applied_on),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("创建评估失败", e))?;

        Ok(result.into_assessment())
    }

    pub async fn get_assessment_by_id_impl(&self, id: i64) -> Result<Option<Assessment>> {
        let result = Assessments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询评估失败", e))?;

        Ok(result.map(|m| m.into_assessment()))
    }

    pub async fn get_assessments_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<Assessment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = Assessments::find()
            .filter(AssessmentColumn::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(|e| db_error("批量查询评估失败", e))?;

        Ok(result.into_iter().map(|m| m.into_assessment()).collect())
    }

    pub async fn list_assessments_with_pagination_impl(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Assessments::find();
        if let Some(subject_id) = query.subject_id {
            select = select.filter(AssessmentColumn::SubjectId.eq(subject_id));
        }
        if let Some(ids) = query.subject_ids {
            select = select.filter(AssessmentColumn::SubjectId.is_in(ids));
        }
        if let Some(term) = query.term {
            select = select.filter(AssessmentColumn::Term.eq(term));
        }

        let paginator = select
            .order_by_asc(AssessmentColumn::Term)
            .order_by_desc(AssessmentColumn::CreatedAt)
            .order_by_desc(AssessmentColumn::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询评估总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询评估页数失败", e))?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询评估列表失败", e))?;

        Ok(AssessmentListResponse {
            items: items.into_iter().map(|m| m.into_assessment()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_assessment_impl(
        &self,
        id: i64,
        update: UpdateAssessmentRequest,
    ) -> Result<Option<Assessment>> {
        if self.get_assessment_by_id_impl(id).await?.is_none() {
            return Ok(None);
        }

        let mut model = AssessmentActiveModel {
            id: Set(id),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };
        if let Some(title) = update.title {
            model.title = Set(title);
        }
        if let Some(term) = update.term {
            model.term = Set(term);
        }
        if let Some(max_score) = update.max_score {
            model.max_score = Set(max_score);
        }
        if let Some(applied_on) = update.applied_on {
            model.applied_on = Set(Some(applied_on));
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| db_error("更新评估失败", e))?;

        Ok(Some(updated.into_assessment()))
    }

    /// 删除评估，成绩随外键级联删除
    pub async fn delete_assessment_impl(&self, id: i64) -> Result<bool> {
        let result = Assessments::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| db_error("删除评估失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_assessments_for_subjects_impl(&self, subject_ids: &[i64]) -> Result<u64> {
        if subject_ids.is_empty() {
            return Ok(0);
        }

        Assessments::find()
            .filter(AssessmentColumn::SubjectId.is_in(subject_ids.iter().copied()))
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计评估数量失败", e))
    }

    /// 批量写入成绩：已有 (评估, 学生) 记录则覆盖
    pub async fn upsert_grades_impl(
        &self,
        assessment_id: i64,
        entries: Vec<GradeEntry>,
        graded_by: i64,
    ) -> Result<Vec<Grade>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;
        let now = chrono::Utc::now().timestamp();
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let existing = Grades::find()
                .filter(GradeColumn::AssessmentId.eq(assessment_id))
                .filter(GradeColumn::StudentId.eq(entry.student_id))
                .one(&txn)
                .await
                .map_err(|e| db_error("查询成绩失败", e))?;

            let model = match existing {
                Some(current) => {
                    let mut active: GradeActiveModel = current.into();
                    active.score = Set(entry.score);
                    active.comment = Set(entry.comment);
                    active.graded_by = Set(Some(graded_by));
                    active.updated_at = Set(now);
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| db_error("更新成绩失败", e))?
                }
                None => GradeActiveModel {
                    assessment_id: Set(assessment_id),
                    student_id: Set(entry.student_id),
                    score: Set(entry.score),
                    comment: Set(entry.comment),
                    graded_by: Set(Some(graded_by)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| db_error("写入成绩失败", e))?,
            };
            saved.push(model.into_grade());
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(saved)
    }

    pub async fn list_grades_by_assessment_impl(&self, assessment_id: i64) -> Result<Vec<Grade>> {
        let result = Grades::find()
            .filter(GradeColumn::AssessmentId.eq(assessment_id))
            .order_by_asc(GradeColumn::StudentId)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询成绩失败", e))?;

        Ok(result.into_iter().map(|m| m.into_grade()).collect())
    }

    pub async fn list_grades_by_student_impl(&self, student_id: i64) -> Result<Vec<Grade>> {
        let result = Grades::find()
            .filter(GradeColumn::StudentId.eq(student_id))
            .order_by_asc(GradeColumn::AssessmentId)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询成绩失败", e))?;

        Ok(result.into_iter().map(|m| m.into_grade()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::students::tests::new_student;
    use crate::storage::sea_orm_storage::subjects::tests::new_subject;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    async fn seed(storage: &SeaOrmStorage) -> (i64, i64, i64) {
        let teacher = storage
            .create_user_impl(new_user("prof", UserRole::Teacher))
            .await
            .unwrap();
        let subject = storage
            .create_subject_impl(new_subject("Física", "1A", None))
            .await
            .unwrap();
        let assessment = storage
            .create_assessment_impl(CreateAssessmentRequest {
                subject_id: subject.id,
                title: "Prova 1".to_string(),
                term: 1,
                max_score: 10.0,
                applied_on: None,
            })
            .await
            .unwrap();
        let student = storage
            .create_student_impl(new_student("Bia", Some("1A")))
            .await
            .unwrap();
        (teacher.id, assessment.id, student.id)
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_grade() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let (teacher_id, assessment_id, student_id) = seed(&storage).await;

        let entry = |score: f64| GradeEntry {
            student_id,
            score,
            comment: None,
        };
        storage
            .upsert_grades_impl(assessment_id, vec![entry(6.0)], teacher_id)
            .await
            .unwrap();
        let saved = storage
            .upsert_grades_impl(assessment_id, vec![entry(8.5)], teacher_id)
            .await
            .unwrap();
        assert_eq!(saved[0].score, 8.5);

        let grades = storage.list_grades_by_assessment_impl(assessment_id).await.unwrap();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].score, 8.5);
        assert_eq!(storage.list_grades_by_student_impl(student_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_unknown_student_rolls_back() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let (teacher_id, assessment_id, student_id) = seed(&storage).await;

        let result = storage
            .upsert_grades_impl(
                assessment_id,
                vec![
                    GradeEntry {
                        student_id,
                        score: 7.0,
                        comment: None,
                    },
                    GradeEntry {
                        student_id: 9999,
                        score: 5.0,
                        comment: None,
                    },
                ],
                teacher_id,
            )
            .await;
        assert!(result.is_err());
        assert!(storage
            .list_grades_by_assessment_impl(assessment_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_deleting_assessment_removes_grades() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let (teacher_id, assessment_id, student_id) = seed(&storage).await;
        storage
            .upsert_grades_impl(
                assessment_id,
                vec![GradeEntry {
                    student_id,
                    score: 9.0,
                    comment: Some("Ótimo".to_string()),
                }],
                teacher_id,
            )
            .await
            .unwrap();

        assert!(storage.delete_assessment_impl(assessment_id).await.unwrap());
        assert!(storage.list_grades_by_student_impl(student_id).await.unwrap().is_empty());
    }
}
