//! 成绩单
//!
//! 每个科目每个学期的平均分按 `得分之和 / 满分之和 * 10` 计算，保留一位小数；
//! 科目平均用同一公式汇总全部学期，总平均为各科目平均的算术平均。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::grades::entities::{Assessment, Grade, ReportCard, SubjectReport, TermAverage};
use crate::models::students::entities::Student;
use crate::models::subjects::entities::Subject;
use crate::storage::Storage;

const SCALE: f64 = 10.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Default, Clone, Copy)]
struct Tally {
    score: f64,
    max: f64,
    count: usize,
}

impl Tally {
    fn add(&mut self, score: f64, max: f64) {
        self.score += score;
        self.max += max;
        self.count += 1;
    }

    fn average(&self) -> Option<f64> {
        (self.max > 0.0).then(|| round1(self.score / self.max * SCALE))
    }
}

/// 由学生的成绩及其评估、科目组装成绩单
///
/// 找不到评估或科目的成绩会被忽略；科目按名称排序，学期按序号排序。
pub fn build_report_card(
    student: &Student,
    subjects: &[Subject],
    assessments: &[Assessment],
    grades: &[Grade],
) -> ReportCard {
    let assessments: HashMap<i64, &Assessment> = assessments.iter().map(|a| (a.id, a)).collect();
    let subject_names: HashMap<i64, &str> =
        subjects.iter().map(|s| (s.id, s.name.as_str())).collect();

    let mut per_subject: HashMap<i64, BTreeMap<i32, Tally>> = HashMap::new();
    for grade in grades.iter().filter(|g| g.student_id == student.id) {
        let Some(assessment) = assessments.get(&grade.assessment_id) else {
            continue;
        };
        if !subject_names.contains_key(&assessment.subject_id) {
            continue;
        }
        per_subject
            .entry(assessment.subject_id)
            .or_default()
            .entry(assessment.term)
            .or_default()
            .add(grade.score, assessment.max_score);
    }

    let mut reports: Vec<SubjectReport> = per_subject
        .into_iter()
        .map(|(subject_id, terms)| {
            let mut total = Tally::default();
            let terms = terms
                .into_iter()
                .filter_map(|(term, tally)| {
                    total.score += tally.score;
                    total.max += tally.max;
                    total.count += tally.count;
                    tally.average().map(|average| TermAverage {
                        term,
                        average,
                        assessments: tally.count,
                    })
                })
                .collect();
            SubjectReport {
                subject_id,
                subject_name: subject_names[&subject_id].to_string(),
                terms,
                average: total.average(),
            }
        })
        .collect();
    reports.sort_by(|a, b| {
        a.subject_name
            .cmp(&b.subject_name)
            .then(a.subject_id.cmp(&b.subject_id))
    });

    let averages: Vec<f64> = reports.iter().filter_map(|r| r.average).collect();
    let overall_average = (!averages.is_empty())
        .then(|| round1(averages.iter().sum::<f64>() / averages.len() as f64));

    ReportCard {
        student_id: student.id,
        student_name: student.full_name.clone(),
        class_name: student.class_name.clone(),
        subjects: reports,
        overall_average,
    }
}

/// 从存储读取学生全部成绩并生成成绩单
pub async fn load_report_card(storage: &Arc<dyn Storage>, student: &Student) -> Result<ReportCard> {
    let grades = storage.list_grades_by_student(student.id).await?;

    let mut assessment_ids: Vec<i64> = grades.iter().map(|g| g.assessment_id).collect();
    assessment_ids.sort_unstable();
    assessment_ids.dedup();
    let assessments = storage.get_assessments_by_ids(&assessment_ids).await?;

    let mut subject_ids: Vec<i64> = assessments.iter().map(|a| a.subject_id).collect();
    subject_ids.sort_unstable();
    subject_ids.dedup();
    let subjects = storage.get_subjects_by_ids(&subject_ids).await?;

    Ok(build_report_card(student, &subjects, &assessments, &grades))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::students::entities::EnrollmentStatus;
    use chrono::Utc;

    fn student() -> Student {
        Student {
            id: 7,
            user_id: None,
            full_name: "Ana Costa".to_string(),
            email: "ana@familia.test".to_string(),
            phone: None,
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            class_name: Some("2B".to_string()),
            registration_number: "2025AAAAAA".to_string(),
            enrollment_status: EnrollmentStatus::Approved,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn subject(id: i64, name: &str) -> Subject {
        Subject {
            id,
            name: name.to_string(),
            class_name: "2B".to_string(),
            teacher_id: None,
            workload_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assessment(id: i64, subject_id: i64, term: i32, max_score: f64) -> Assessment {
        Assessment {
            id,
            subject_id,
            title: format!("Prova {id}"),
            term,
            max_score,
            applied_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn grade(assessment_id: i64, student_id: i64, score: f64) -> Grade {
        Grade {
            id: assessment_id * 100 + student_id,
            assessment_id,
            student_id,
            score,
            comment: None,
            graded_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_weighted_by_max_score() {
        let subjects = [subject(1, "Matemática"), subject(2, "História")];
        let assessments = [
            assessment(10, 1, 1, 10.0),
            assessment(11, 1, 1, 20.0),
            assessment(12, 1, 2, 100.0),
            assessment(20, 2, 1, 10.0),
        ];
        let grades = [
            grade(10, 7, 8.0),
            grade(11, 7, 10.0),
            grade(12, 7, 75.0),
            grade(20, 7, 9.0),
            // 其他学生的成绩不计入
            grade(20, 8, 1.0),
        ];

        let card = build_report_card(&student(), &subjects, &assessments, &grades);
        assert_eq!(card.subjects.len(), 2);

        let history = &card.subjects[0];
        assert_eq!(history.subject_name, "História");
        assert_eq!(history.average, Some(9.0));

        let math = &card.subjects[1];
        // 学期 1: 18 / 30 * 10 = 6.0；学期 2: 75 / 100 * 10 = 7.5
        assert_eq!(
            math.terms,
            vec![
                TermAverage { term: 1, average: 6.0, assessments: 2 },
                TermAverage { term: 2, average: 7.5, assessments: 1 },
            ]
        );
        // 93 / 130 * 10 = 7.15... 保留一位
        assert_eq!(math.average, Some(7.2));
        assert_eq!(card.overall_average, Some(8.1));
    }

    #[test]
    fn test_empty_report_card() {
        let card = build_report_card(&student(), &[], &[], &[]);
        assert!(card.subjects.is_empty());
        assert_eq!(card.overall_average, None);
        assert_eq!(card.class_name.as_deref(), Some("2B"));
    }

    #[test]
    fn test_ignores_orphan_grades() {
        let subjects = [subject(1, "Artes")];
        let assessments = [assessment(10, 1, 1, 10.0), assessment(30, 99, 1, 10.0)];
        let grades = [grade(10, 7, 10.0), grade(30, 7, 0.0), grade(404, 7, 0.0)];

        let card = build_report_card(&student(), &subjects, &assessments, &grades);
        assert_eq!(card.subjects.len(), 1);
        assert_eq!(card.overall_average, Some(10.0));
    }
}
