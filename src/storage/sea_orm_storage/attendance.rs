use super::{SeaOrmStorage, db_error};
use crate::entity::attendance::{ActiveModel, Column, Entity as Attendance};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    attendance::{
        entities::{AttendanceRecord, AttendanceStatus},
        requests::{AttendanceEntry, AttendanceFilter, AttendanceListQuery},
        responses::AttendanceListResponse,
    },
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
    Set, TransactionTrait,
};

fn apply_filter(mut select: Select<Attendance>, filter: &AttendanceFilter) -> Select<Attendance> {
    if let Some(ref class_name) = filter.class_name {
        select = select.filter(Column::ClassName.eq(class_name.as_str()));
    }
    if let Some(student_id) = filter.student_id {
        select = select.filter(Column::StudentId.eq(student_id));
    }
    if let Some(subject_id) = filter.subject_id {
        select = select.filter(Column::SubjectId.eq(subject_id));
    }
    if let Some(from) = filter.from {
        select = select.filter(Column::Date.gte(from));
    }
    if let Some(to) = filter.to {
        select = select.filter(Column::Date.lte(to));
    }
    select
}

impl SeaOrmStorage {
    /// 点名：每个 (学生, 日期, 科目) 只保留一条记录，由唯一索引兜底
    pub async fn upsert_attendance_impl(
        &self,
        class_name: &str,
        date: NaiveDate,
        subject_id: Option<i64>,
        entries: Vec<AttendanceEntry>,
        recorded_by: i64,
    ) -> Result<Vec<AttendanceRecord>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;
        let now = chrono::Utc::now().timestamp();
        let subject_key = subject_id.unwrap_or(0);
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let existing = Attendance::find()
                .filter(Column::StudentId.eq(entry.student_id))
                .filter(Column::Date.eq(date))
                .filter(Column::SubjectKey.eq(subject_key))
                .one(&txn)
                .await
                .map_err(|e| db_error("查询考勤失败", e))?;

            let model = match existing {
                Some(current) => {
                    let mut active: ActiveModel = current.into();
                    active.class_name = Set(class_name.to_string());
                    active.status = Set(entry.status.to_string());
                    active.note = Set(entry.note);
                    active.recorded_by = Set(Some(recorded_by));
                    active.updated_at = Set(now);
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| db_error("更新考勤失败", e))?
                }
                None => ActiveModel {
                    student_id: Set(entry.student_id),
                    class_name: Set(class_name.to_string()),
                    subject_id: Set(subject_id),
                    subject_key: Set(subject_key),
                    date: Set(date),
                    status: Set(entry.status.to_string()),
                    note: Set(entry.note),
                    recorded_by: Set(Some(recorded_by)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| db_error("写入考勤失败", e))?,
            };
            saved.push(model.into_record());
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(saved)
    }

    pub async fn list_attendance_with_pagination_impl(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let paginator = apply_filter(Attendance::find(), &query.filter)
            .order_by_desc(Column::Date)
            .order_by_asc(Column::StudentId)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询考勤总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询考勤页数失败", e))?;
        let records = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询考勤列表失败", e))?;

        Ok(AttendanceListResponse {
            items: records.into_iter().map(|m| m.into_record()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 汇总统计只需要状态
    pub async fn list_attendance_statuses_impl(
        &self,
        filter: AttendanceFilter,
    ) -> Result<Vec<AttendanceStatus>> {
        let records = apply_filter(Attendance::find(), &filter)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询考勤失败", e))?;

        Ok(records
            .into_iter()
            .filter_map(|m| m.status.parse().ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::students::tests::new_student;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    #[tokio::test]
    async fn test_resubmitting_roll_call_overwrites() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let teacher = storage
            .create_user_impl(new_user("prof", UserRole::Teacher))
            .await
            .unwrap();
        let ana = storage
            .create_student_impl(new_student("Ana", Some("1A")))
            .await
            .unwrap();
        let bia = storage
            .create_student_impl(new_student("Bia", Some("1A")))
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let entries = |ana_status| {
            vec![
                AttendanceEntry {
                    student_id: ana.id,
                    status: ana_status,
                    note: None,
                },
                AttendanceEntry {
                    student_id: bia.id,
                    status: AttendanceStatus::Present,
                    note: None,
                },
            ]
        };
        storage
            .upsert_attendance_impl("1A", date, None, entries(AttendanceStatus::Absent), teacher.id)
            .await
            .unwrap();
        storage
            .upsert_attendance_impl("1A", date, None, entries(AttendanceStatus::Late), teacher.id)
            .await
            .unwrap();

        let list = storage
            .list_attendance_with_pagination_impl(AttendanceListQuery {
                filter: AttendanceFilter {
                    class_name: Some("1A".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(list.pagination.total, 2);

        let statuses = storage
            .list_attendance_statuses_impl(AttendanceFilter {
                student_id: Some(ana.id),
                from: Some(date),
                to: Some(date),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(statuses, vec![AttendanceStatus::Late]);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_roll_call_rows() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let caio = storage
            .create_student_impl(new_student("Caio", Some("2B")))
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let row = || ActiveModel {
            student_id: Set(caio.id),
            class_name: Set("2B".to_string()),
            subject_id: Set(None),
            subject_key: Set(0),
            date: Set(date),
            status: Set(AttendanceStatus::Present.to_string()),
            note: Set(None),
            recorded_by: Set(None),
            created_at: Set(0),
            updated_at: Set(0),
            ..Default::default()
        };

        row().insert(&storage.db).await.unwrap();
        // 并发点名各自查不到旧记录时，第二次写入由索引拒绝
        assert!(row().insert(&storage.db).await.is_err());

        storage
            .upsert_attendance_impl(
                "2B",
                date,
                None,
                vec![AttendanceEntry {
                    student_id: caio.id,
                    status: AttendanceStatus::Absent,
                    note: None,
                }],
                1,
            )
            .await
            .unwrap();
        let statuses = storage
            .list_attendance_statuses_impl(AttendanceFilter {
                student_id: Some(caio.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(statuses, vec![AttendanceStatus::Absent]);
    }
}
