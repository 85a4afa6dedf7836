use crate::cache::{ObjectCache, register::get_object_cache_plugin};
use crate::config::AppConfig;
use crate::models::users::entities::{UserRole, UserStatus};
use crate::models::users::requests::NewUser;
use crate::services::integrations::Integrations;
use crate::services::system::DynamicConfig;
use crate::storage::Storage;
use crate::utils::password::{generate_password, hash_password};
use std::sync::Arc;
use tracing::{debug, info, warn};

const FALLBACK_CACHE: &str = "moka";

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<dyn ObjectCache>,
    pub integrations: Arc<Integrations>,
}

/// 按名称构造缓存插件
async fn build_cache(name: &str) -> Result<Arc<dyn ObjectCache>, String> {
    let constructor = get_object_cache_plugin(name)
        .ok_or_else(|| format!("Cache backend '{name}' not found in registry"))?;
    constructor()
        .await
        .map(Arc::from)
        .map_err(|e| format!("Failed to create {name} cache: {e}"))
}

/// 创建缓存实例，配置的后端不可用时回退到内存缓存
async fn create_cache() -> Result<Arc<dyn ObjectCache>, Box<dyn std::error::Error>> {
    let cache_type = &AppConfig::get().cache.cache_type;
    warn!("Attempting to create {} cache backend", cache_type);

    match build_cache(cache_type).await {
        Ok(cache) => {
            warn!("Successfully created {} cache backend", cache_type);
            Ok(cache)
        }
        Err(e) if cache_type != FALLBACK_CACHE => {
            warn!("{}, falling back to {} cache", e, FALLBACK_CACHE);
            Ok(build_cache(FALLBACK_CACHE).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// 从数据库加载动态配置；失败时使用空配置，读取回退到 AppConfig
async fn init_dynamic_config(storage: &Arc<dyn Storage>) {
    let settings = match storage.list_all_settings().await {
        Ok(settings) => settings.into_iter().map(|s| (s.key, s.value)).collect(),
        Err(e) => {
            warn!(
                "Failed to load dynamic config from database: {}, using defaults",
                e
            );
            vec![]
        }
    };
    DynamicConfig::init(settings).await;
}

/// 库中没有任何用户时创建默认管理员
async fn seed_admin(storage: &Arc<dyn Storage>) {
    match storage.count_users().await {
        Ok(count) if count > 0 => {
            debug!(
                "Database already has {} user(s), skipping admin seed",
                count
            );
            return;
        }
        Ok(_) => info!("No users found in database, creating default admin account..."),
        Err(e) => {
            warn!("Failed to count users: {}, skipping admin seed", e);
            return;
        }
    }

    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        let generated = generate_password(16);
        warn!("==========================================================");
        warn!("  ADMIN_PASSWORD not set, using a generated password");
        warn!("  Generated admin password: {}", generated);
        warn!("==========================================================");
        generated
    });

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Failed to hash admin password: {}, skipping admin seed", e);
            return;
        }
    };

    let admin = NewUser {
        username: "admin".to_string(),
        email: "admin@localhost".to_string(),
        password_hash,
        role: UserRole::Admin,
        status: UserStatus::Active,
        display_name: Some("Administrator".to_string()),
        phone: None,
    };

    match storage.create_user(admin).await {
        Ok(user) => info!(
            "Default admin account created (ID: {}, username: {})",
            user.id, user.username
        ),
        Err(e) => warn!("Failed to create admin account: {}", e),
    }
}

/// 上次进程退出时仍在发送的群发任务改为暂停，由管理员决定是否恢复
async fn recover_broadcasts(storage: &Arc<dyn Storage>) {
    match storage.pause_running_broadcasts().await {
        Ok(0) => {}
        Ok(count) => warn!(
            "{} broadcast(s) were interrupted by the last shutdown and are now paused",
            count
        ),
        Err(e) => warn!("Failed to recover interrupted broadcasts: {}", e),
    }
}

/// 准备服务器启动的上下文：存储、动态配置、缓存与外部服务客户端
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    if cfg!(debug_assertions) {
        crate::cache::register::debug_object_cache_registry();
        debug!("Debug mode: Cache registry is enabled");
    }

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    init_dynamic_config(&storage).await;
    seed_admin(&storage).await;

    let cache = create_cache().await.expect("Failed to create cache");
    warn!("Cache backend initialized");

    let integrations = Integrations::from_config(AppConfig::get())
        .expect("Failed to build HTTP clients for external services");
    recover_broadcasts(&storage).await;

    StartupContext {
        storage,
        cache,
        integrations: Arc::new(integrations),
    }
}
