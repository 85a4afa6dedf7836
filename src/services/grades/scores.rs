//! 成绩录入校验

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{PortalError, Result};
use crate::models::grades::entities::{Assessment, Grade};
use crate::models::grades::requests::{CreateAssessmentRequest, GradeEntry, UpdateAssessmentRequest};
use crate::storage::Storage;
use crate::utils::validate::validate_required_text;

pub const MAX_TERM: i32 = 4;

pub fn validate_term(term: i32) -> Result<()> {
    if !(1..=MAX_TERM).contains(&term) {
        return Err(PortalError::validation(format!(
            "term must be between 1 and {MAX_TERM}"
        )));
    }
    Ok(())
}

pub fn validate_max_score(max_score: f64) -> Result<()> {
    if !max_score.is_finite() || max_score <= 0.0 {
        return Err(PortalError::validation("max_score must be greater than zero"));
    }
    Ok(())
}

pub fn validate_new_assessment(request: &CreateAssessmentRequest) -> Result<()> {
    validate_required_text(&request.title, "title", 120).map_err(PortalError::validation)?;
    validate_term(request.term)?;
    validate_max_score(request.max_score)
}

/// 降低满分时不能低于已录入的最高分
pub fn validate_assessment_update(
    update: &UpdateAssessmentRequest,
    existing_grades: &[Grade],
) -> Result<()> {
    if let Some(title) = &update.title {
        validate_required_text(title, "title", 120).map_err(PortalError::validation)?;
    }
    if let Some(term) = update.term {
        validate_term(term)?;
    }
    if let Some(max_score) = update.max_score {
        validate_max_score(max_score)?;
        if let Some(top) = existing_grades
            .iter()
            .map(|g| g.score)
            .max_by(f64::total_cmp)
            && top > max_score
        {
            return Err(PortalError::validation(format!(
                "max_score {max_score} is below an existing score of {top}"
            )));
        }
    }
    Ok(())
}

/// 每个分数在 `0..=max_score` 内且同一批次内学生不重复
pub fn validate_scores(assessment: &Assessment, entries: &[GradeEntry]) -> Result<()> {
    if entries.is_empty() {
        return Err(PortalError::validation("grades must not be empty"));
    }
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.student_id) {
            return Err(PortalError::validation(format!(
                "student {} appears more than once",
                entry.student_id
            )));
        }
        if !entry.score.is_finite() || entry.score < 0.0 || entry.score > assessment.max_score {
            return Err(PortalError::validation(format!(
                "Score {} for student {} is outside 0..={}",
                entry.score, entry.student_id, assessment.max_score
            )));
        }
    }
    Ok(())
}

/// 校验后批量写入；未知学生整批拒绝
pub async fn record_grades(
    storage: &Arc<dyn Storage>,
    assessment: &Assessment,
    entries: Vec<GradeEntry>,
    graded_by: i64,
) -> Result<Vec<Grade>> {
    validate_scores(assessment, &entries)?;

    let ids: Vec<i64> = entries.iter().map(|e| e.student_id).collect();
    let known: HashSet<i64> = storage
        .get_students_by_ids(&ids)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if let Some(unknown) = ids.iter().find(|id| !known.contains(id)) {
        return Err(PortalError::not_found(format!("Student {unknown} not found")));
    }

    let grades = storage.upsert_grades(assessment.id, entries, graded_by).await?;
    tracing::info!(
        "{} grades recorded for assessment {} by user {}",
        grades.len(),
        assessment.id,
        graded_by
    );
    Ok(grades)
}
