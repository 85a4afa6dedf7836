use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AttendanceService;
use crate::models::attendance::entities::AttendanceSummary;
use crate::models::attendance::requests::{
    AttendanceFilter, AttendanceListParams, AttendanceListQuery, AttendanceSummaryParams,
};
use crate::models::attendance::responses::AttendanceSummaryResponse;
use crate::models::{ApiResponse, internal_error_response};

pub async fn list_attendance(
    service: &AttendanceService,
    query: AttendanceListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage
        .list_attendance_with_pagination(AttendanceListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取考勤列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取考勤列表失败: {e}"))),
    }
}

pub async fn attendance_summary(
    service: &AttendanceService,
    query: AttendanceSummaryParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let filter = AttendanceFilter {
        class_name: query.class_name,
        student_id: query.student_id,
        subject_id: None,
        from: query.from,
        to: query.to,
    };

    match storage.list_attendance_statuses(filter).await {
        Ok(statuses) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AttendanceSummaryResponse {
                summary: AttendanceSummary::from_statuses(statuses),
            },
            "获取考勤统计成功",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取考勤统计失败: {e}"))),
    }
}
