//! 前端静态资源路由
//!
//! SPA 构建产物通过 rust-embed 编入二进制。未命中的路径回退到 `index.html`，
//! 由前端路由处理；`./frontend-custom/` 下的同名文件优先，便于本地调试。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use rust_embed::Embed;
use std::path::Path;

use crate::services::system::DynamicConfig;

#[derive(Embed)]
#[folder = "frontend/dist/"]
struct FrontendAssets;

const INDEX: &str = "index.html";

/// 页面标题占位符，替换为学校名称
const SYSTEM_NAME_PLACEHOLDER: &str = "%SYSTEM_NAME%";

fn extension(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

fn content_type(path: &str) -> &'static str {
    match extension(path) {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "webmanifest" => "application/manifest+json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Vite 输出的资源文件名带 hash，可长期缓存；其余文件每次重新验证
fn cache_control(path: &str) -> &'static str {
    if path.starts_with("assets/") && extension(path) != "html" {
        "public, max-age=31536000, immutable"
    } else {
        "no-cache"
    }
}

fn read_asset(path: &str) -> Option<Vec<u8>> {
    if !path.contains("..")
        && let Ok(data) = std::fs::read(Path::new("./frontend-custom").join(path))
    {
        return Some(data);
    }
    FrontendAssets::get(path).map(|f| f.data.into_owned())
}

pub async fn serve_frontend(req: HttpRequest) -> ActixResult<HttpResponse> {
    let requested = req.match_info().query("tail").trim_start_matches('/');

    let (path, data) = match read_asset(requested).filter(|_| !requested.is_empty()) {
        Some(data) => (requested, Some(data)),
        // SPA 兜底
        None => (INDEX, read_asset(INDEX)),
    };

    let Some(mut data) = data else {
        return Ok(HttpResponse::NotFound()
            .content_type("text/plain; charset=utf-8")
            .body("Frontend assets are not embedded, build the SPA first"));
    };

    if path == INDEX {
        let html = String::from_utf8_lossy(&data)
            .replace(SYSTEM_NAME_PLACEHOLDER, &DynamicConfig::system_name().await);
        data = html.into_bytes();
    }

    Ok(HttpResponse::Ok()
        .content_type(content_type(path))
        .insert_header(("Cache-Control", cache_control(path)))
        .body(data))
}

/// 所有未被 API 匹配的 GET 请求交给前端，需最后注册
pub fn configure_frontend_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{tail:.*}", web::get().to(serve_frontend));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("assets/app.mjs"), "application/javascript; charset=utf-8");
        assert_eq!(content_type("manifest.webmanifest"), "application/manifest+json");
        assert_eq!(content_type("blob.xyz"), "application/octet-stream");
    }

    #[test]
    fn test_cache_control_only_for_hashed_assets() {
        assert_eq!(cache_control("assets/index-3f9a.js"), "public, max-age=31536000, immutable");
        assert_eq!(cache_control("index.html"), "no-cache");
        assert_eq!(cache_control("favicon.ico"), "no-cache");
    }

    #[actix_web::test]
    async fn test_unknown_route_falls_back_to_index() {
        use actix_web::{App, test};

        let app = test::init_service(App::new().configure(configure_frontend_routes)).await;
        let req = test::TestRequest::get().uri("/portal/boletim").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
