use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use tracing::{info, warn};

use super::{DynamicConfig, SystemService};
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::PaymentProvider;
use crate::models::system::entities::{KnownSettingKey, SystemSetting};
use crate::models::system::requests::{SettingAuditQuery, UpdateSettingRequest};
use crate::models::system::responses::{
    AdminSettingsListResponse, HealthResponse, SettingResponse, SystemSettingsResponse,
};
use crate::models::{
    AppStartTime, ApiResponse, ErrorCode, internal_error_response, portal_error_response,
};
use crate::services::current_user;
use crate::storage::Storage;

/// 在类型校验之外，按键做业务范围校验
fn check_setting_value(key: KnownSettingKey, value: &str) -> Result<()> {
    key.value_type()
        .validate(value)
        .map_err(|e| PortalError::validation(format!("{}: {e}", key.as_str())))?;

    let out_of_range = || PortalError::validation(format!("{}: value out of range", key.as_str()));
    match key {
        KnownSettingKey::AccessTokenExpiry
        | KnownSettingKey::RefreshTokenExpiry
        | KnownSettingKey::RefreshTokenRememberMeExpiry
        | KnownSettingKey::UploadMaxSize => {
            if value.trim().parse::<i64>().unwrap_or(0) <= 0 {
                return Err(out_of_range());
            }
        }
        KnownSettingKey::EnrollmentFeeCents
        | KnownSettingKey::CorsMaxAge
        | KnownSettingKey::BroadcastMinDelayMs
        | KnownSettingKey::BroadcastMaxDelayMs => {
            if value.trim().parse::<i64>().unwrap_or(-1) < 0 {
                return Err(out_of_range());
            }
        }
        KnownSettingKey::DefaultPaymentProvider => {
            value.trim().parse::<PaymentProvider>().map_err(|_| {
                PortalError::validation(format!("Unknown payment provider: {value}"))
            })?;
        }
        KnownSettingKey::SystemName => {
            if value.trim().is_empty() {
                return Err(PortalError::validation("app.system_name cannot be empty"));
            }
        }
        _ => {}
    }
    Ok(())
}

/// 写入配置与审计日志，并刷新动态配置缓存
pub async fn apply_setting(
    storage: &Arc<dyn Storage>,
    key: &str,
    value: &str,
    user_id: i64,
    ip_address: Option<String>,
) -> Result<SystemSetting> {
    let known: KnownSettingKey = key
        .parse()
        .map_err(|_| PortalError::not_found(format!("Setting {key} not found")))?;
    check_setting_value(known, value)?;

    let setting = storage
        .update_setting(key, value, user_id, ip_address)
        .await?;
    DynamicConfig::update(key, value).await;

    if known.is_secret() {
        info!("Setting {} updated by user {}", key, user_id);
    } else {
        info!("Setting {} = {} (user {})", key, value, user_id);
    }
    Ok(setting.masked())
}

fn setting_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::NotFound(_) => ErrorCode::SettingNotFound,
        PortalError::Validation(_) => ErrorCode::SettingInvalidValue,
        _ => ErrorCode::InternalServerError,
    };
    portal_error_response(err, code)
}

/// 公开系统设置（只读）
pub async fn get_settings(
    service: &SystemService,
    _req: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let config = service.get_config();

    let response = SystemSettingsResponse {
        system_name: DynamicConfig::system_name().await,
        max_file_size: DynamicConfig::upload_max_size().await as i64,
        allowed_file_types: DynamicConfig::upload_allowed_types().await,
        enrollment_fee_cents: DynamicConfig::enrollment_fee_cents().await,
        environment: config.app.environment.clone(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        response,
        "Settings retrieved successfully",
    )))
}

pub async fn list_admin_settings(
    service: &SystemService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.list_all_settings().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AdminSettingsListResponse {
                settings: settings.into_iter().map(SystemSetting::masked).collect(),
            },
            "Admin settings retrieved successfully",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取配置列表失败: {e}"))),
    }
}

pub async fn update_setting(
    service: &SystemService,
    key: String,
    body: UpdateSettingRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);
    let ip_address = request
        .connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string());

    match apply_setting(&storage, &key, &body.value, user.id, ip_address).await {
        Ok(setting) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SettingResponse { setting },
            "Setting updated successfully",
        ))),
        Err(e) => Ok(setting_error(&e)),
    }
}

pub async fn list_setting_audits(
    service: &SystemService,
    query: SettingAuditQuery,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.list_setting_audits(query).await {
        Ok(audits) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            audits,
            "Setting audits retrieved successfully",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取审计日志失败: {e}"))),
    }
}

/// 健康检查；数据库不可用时返回 503
pub async fn health(service: &SystemService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let started_at = request
        .app_data::<web::Data<AppStartTime>>()
        .map(|t| t.start_datetime)
        .unwrap_or_else(chrono::Utc::now);

    let database = match storage.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check: database unavailable: {}", e);
            false
        }
    };
    let response = HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        database,
        started_at,
        uptime_seconds: chrono::Utc::now()
            .signed_duration_since(started_at)
            .num_seconds(),
    };

    if database {
        Ok(HttpResponse::Ok().json(ApiResponse::success(response, "ok")))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(ApiResponse::error(
            ErrorCode::InternalServerError,
            response,
            "database unavailable",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::testing::{json_body, memory_storage, request_as, seed_user};
    use actix_web::http::StatusCode;

    #[test]
    fn test_setting_value_ranges() {
        assert!(check_setting_value(KnownSettingKey::EnrollmentFeeCents, "0").is_ok());
        assert!(check_setting_value(KnownSettingKey::EnrollmentFeeCents, "-5").is_err());
        assert!(check_setting_value(KnownSettingKey::AccessTokenExpiry, "0").is_err());
        assert!(check_setting_value(KnownSettingKey::DefaultPaymentProvider, "asaas").is_ok());
        assert!(check_setting_value(KnownSettingKey::DefaultPaymentProvider, "paypal").is_err());
        assert!(check_setting_value(KnownSettingKey::UploadAllowedTypes, "[\".pdf\"]").is_ok());
        assert!(check_setting_value(KnownSettingKey::UploadAllowedTypes, ".pdf").is_err());
    }

    #[tokio::test]
    async fn test_apply_setting_writes_audit_and_masks_secret() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;

        let setting = apply_setting(&storage, "email.api_key", "re_live_123", admin.id, None)
            .await
            .unwrap();
        assert_eq!(setting.value, "********");

        let err = apply_setting(&storage, "nope.key", "1", admin.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));

        let audits = storage
            .list_setting_audits(SettingAuditQuery {
                key: Some("email.api_key".to_string()),
                page: None,
                size: None,
            })
            .await
            .unwrap();
        assert_eq!(audits.audits.len(), 1);
        assert_eq!(audits.audits[0].changed_by, admin.id);
    }

    #[actix_web::test]
    async fn test_health_reports_database() {
        let storage = memory_storage().await;
        let service = SystemService::new_lazy();
        let resp = service
            .health(&request_as(&storage, None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["database"], true);
    }
}
