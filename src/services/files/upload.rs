use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use futures_util::TryStreamExt;
use futures_util::stream::StreamExt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{error, info};
use uuid::Uuid;

use super::FileService;
use crate::config::AppConfig;
use crate::errors::PortalError;
use crate::models::files::requests::NewFile;
use crate::models::files::responses::FileUploadResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::current_user;
use crate::services::system::DynamicConfig;
use crate::utils::file_magic::content_type_for;
use crate::utils::validate_magic_bytes;

/// 取出带点号的小写扩展名，并检查是否在允许列表内
pub fn allowed_extension(file_name: &str, allowed_types: &[String]) -> Option<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))?;

    allowed_types
        .iter()
        .any(|t| t.to_lowercase() == extension)
        .then_some(extension)
}

fn upload_failed(message: &str) -> HttpResponse {
    HttpResponse::InternalServerError()
        .json(ApiResponse::error_empty(ErrorCode::FileUploadFailed, message))
}

fn bad_upload(code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(code, message))
}

pub async fn handle_upload(
    service: &FileService,
    req: &HttpRequest,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let user = match current_user(req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    // 目录来自静态配置，大小与类型限制来自动态配置
    let upload_dir = &AppConfig::get().upload.dir;
    let max_size = DynamicConfig::upload_max_size().await;
    let allowed_types = DynamicConfig::upload_allowed_types().await;

    if !Path::new(upload_dir).exists()
        && let Err(e) = fs::create_dir_all(upload_dir)
    {
        error!("{}", PortalError::file_operation(format!("{e}")));
        return Ok(upload_failed("创建上传目录失败"));
    }

    let mut received: Option<(String, String, i64)> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let content_disposition = field.content_disposition();
        let name = content_disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        if name != "file" {
            continue;
        }
        if received.is_some() {
            return Ok(bad_upload(
                ErrorCode::MultifileUploadNotAllowed,
                "Only one file can be uploaded at a time",
            ));
        }

        let original_name = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(|s| s.to_string())
            .unwrap_or_default();
        let Some(extension) = allowed_extension(&original_name, &allowed_types) else {
            return Ok(bad_upload(ErrorCode::FileTypeNotAllowed, "File type not allowed"));
        };

        let stored_name = format!(
            "{}-{}{}",
            chrono::Utc::now().timestamp(),
            Uuid::new_v4(),
            extension
        );
        let file_path = Path::new(upload_dir).join(&stored_name);
        let mut f = match fs::File::create(&file_path) {
            Ok(file) => file,
            Err(e) => {
                error!("{}", PortalError::file_operation(format!("{e}")));
                return Ok(upload_failed("文件创建失败"));
            }
        };

        let mut total_size: usize = 0;
        let mut first_chunk = true;
        while let Some(chunk) = field.next().await {
            let data = chunk?;

            // 第一个分块校验文件头
            if first_chunk {
                first_chunk = false;
                if !validate_magic_bytes(&data, &extension) {
                    let _ = fs::remove_file(&file_path);
                    return Ok(bad_upload(
                        ErrorCode::FileTypeNotAllowed,
                        "文件内容与扩展名不匹配",
                    ));
                }
            }

            total_size += data.len();
            if total_size > max_size {
                let _ = fs::remove_file(&file_path);
                return Ok(bad_upload(
                    ErrorCode::FileSizeExceeded,
                    "File size exceeds the limit",
                ));
            }
            f.write_all(&data)?;
        }

        if total_size == 0 {
            let _ = fs::remove_file(&file_path);
            return Ok(bad_upload(ErrorCode::FileUploadFailed, "Uploaded file is empty"));
        }
        received = Some((original_name, stored_name, total_size as i64));
    }

    let Some((original_name, stored_name, file_size)) = received else {
        return Ok(bad_upload(
            ErrorCode::FileNotFound,
            "No file found in upload payload",
        ));
    };

    let extension = Path::new(&stored_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let storage = service.get_storage(req);

    match storage
        .create_file(NewFile {
            original_name,
            stored_name,
            file_size,
            file_type: content_type_for(&extension).to_string(),
            user_id: user.id,
        })
        .await
    {
        Ok(file) => {
            info!(
                "File {} uploaded by user {} ({} bytes)",
                file.original_name, user.id, file.file_size
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                FileUploadResponse {
                    download_token: file.download_token,
                    file_name: file.original_name,
                    size: file.file_size,
                    content_type: file.file_type,
                    created_at: file.created_at,
                },
                "File uploaded successfully",
            )))
        }
        Err(e) => Ok(upload_failed(&format!("Failed to upload file: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extension() {
        let allowed = vec![".pdf".to_string(), ".PNG".to_string()];
        assert_eq!(allowed_extension("Prova.PDF", &allowed).as_deref(), Some(".pdf"));
        assert_eq!(allowed_extension("foto.png", &allowed).as_deref(), Some(".png"));
        assert_eq!(allowed_extension("script.exe", &allowed), None);
        assert_eq!(allowed_extension("sem-extensao", &allowed), None);
    }
}
