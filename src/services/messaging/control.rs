//! 群发任务的创建与控制
//!
//! 数据库中的状态与后台任务的控制信号同时更新。进程重启后数据库里的
//! 任务没有对应的后台任务，恢复或重试时重新启动。

use std::sync::Arc;
use tracing::info;

use super::broadcast::{RunSignal, RunnerConfig, StorageProgress};
use super::recipients::resolve_audience;
use crate::errors::{PortalError, Result};
use crate::models::ErrorCode;
use crate::models::messaging::entities::{Broadcast, BroadcastStatus};
use crate::models::messaging::requests::{CreateBroadcastRequest, NewBroadcast};
use crate::models::messaging::responses::BroadcastResponse;
use crate::services::integrations::Integrations;
use crate::services::system::DynamicConfig;
use crate::storage::Storage;
use crate::utils::validate::validate_required_text;

pub(crate) const NO_RECIPIENTS: &str = "No valid recipients for this broadcast";
const MAX_MESSAGE_LEN: usize = 4096;

/// 群发相关领域错误对应的业务错误码
pub(crate) fn broadcast_error_code(err: &PortalError) -> ErrorCode {
    match err {
        PortalError::Validation(msg) if msg == NO_RECIPIENTS => ErrorCode::BroadcastNoRecipients,
        PortalError::Validation(_) => ErrorCode::BadRequest,
        PortalError::NotFound(_) => ErrorCode::BroadcastNotFound,
        PortalError::Conflict(_) => ErrorCode::BroadcastInvalidState,
        PortalError::Configuration(_) => ErrorCode::MessagingNotConfigured,
        PortalError::ExternalService(_) => ErrorCode::MessagingFailed,
        _ => ErrorCode::InternalServerError,
    }
}

/// 同一群发只允许一个后台任务；上一个任务尚未退出时返回冲突
fn start_runner(storage: &Arc<dyn Storage>, integrations: &Integrations, broadcast: &Broadcast) -> Result<()> {
    let sender = integrations.whatsapp()?;
    let config = RunnerConfig {
        broadcast_id: broadcast.id,
        message: broadcast.message.clone(),
        min_delay_ms: u64::try_from(broadcast.min_delay_ms).unwrap_or(0),
        max_delay_ms: u64::try_from(broadcast.max_delay_ms).unwrap_or(0),
    };
    let spawned = integrations
        .broadcasts()
        .spawn(config, sender, Arc::new(StorageProgress::new(storage.clone())));
    if !spawned {
        return Err(PortalError::conflict(format!(
            "Broadcast {} still has a runner shutting down, try again shortly",
            broadcast.id
        )));
    }
    Ok(())
}

/// 后台任务未能启动时把状态改回去
async fn start_or_restore(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    broadcast: &Broadcast,
    previous: BroadcastStatus,
) -> Result<()> {
    if let Err(e) = start_runner(storage, integrations, broadcast) {
        storage.set_broadcast_status(broadcast.id, previous).await?;
        return Err(e);
    }
    Ok(())
}

async fn load(storage: &Arc<dyn Storage>, id: i64) -> Result<Broadcast> {
    storage
        .get_broadcast_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Broadcast {id} not found")))
}

async fn set_status(storage: &Arc<dyn Storage>, id: i64, status: BroadcastStatus) -> Result<Broadcast> {
    storage.set_broadcast_status(id, status).await?;
    load(storage, id).await
}

pub async fn create_broadcast(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    created_by: i64,
    request: CreateBroadcastRequest,
) -> Result<BroadcastResponse> {
    validate_required_text(&request.message, "message", MAX_MESSAGE_LEN)
        .map_err(PortalError::validation)?;
    integrations.whatsapp()?;

    let resolved = resolve_audience(storage, &request).await?;
    if resolved.recipients.is_empty() {
        return Err(PortalError::validation(NO_RECIPIENTS));
    }

    let (default_min, default_max) = DynamicConfig::broadcast_delays().await;
    let min_delay_ms = request.min_delay_ms.unwrap_or(default_min);
    let max_delay_ms = request.max_delay_ms.unwrap_or(default_max).max(min_delay_ms);

    let broadcast = storage
        .create_broadcast(
            NewBroadcast {
                message: request.message.trim().to_string(),
                created_by,
                min_delay_ms: i64::try_from(min_delay_ms).unwrap_or(i64::MAX),
                max_delay_ms: i64::try_from(max_delay_ms).unwrap_or(i64::MAX),
            },
            resolved.recipients,
        )
        .await?;
    info!(
        "Broadcast {} created by user {} for {} recipients ({} skipped)",
        broadcast.id, created_by, broadcast.total, resolved.skipped
    );

    start_runner(storage, integrations, &broadcast)?;

    Ok(BroadcastResponse {
        broadcast,
        skipped: Some(resolved.skipped),
    })
}

pub async fn pause_broadcast(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    id: i64,
) -> Result<Broadcast> {
    let broadcast = load(storage, id).await?;
    if broadcast.status != BroadcastStatus::Running {
        return Err(PortalError::conflict(format!(
            "Only running broadcasts can be paused (current: {})",
            broadcast.status
        )));
    }
    let broadcast = set_status(storage, id, BroadcastStatus::Paused).await?;
    integrations.broadcasts().signal(id, RunSignal::Paused);
    info!("Broadcast {} paused", id);
    Ok(broadcast)
}

pub async fn resume_broadcast(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    id: i64,
) -> Result<Broadcast> {
    let broadcast = load(storage, id).await?;
    if broadcast.status != BroadcastStatus::Paused {
        return Err(PortalError::conflict(format!(
            "Only paused broadcasts can be resumed (current: {})",
            broadcast.status
        )));
    }
    integrations.whatsapp()?;

    let broadcast = set_status(storage, id, BroadcastStatus::Running).await?;
    if !integrations.broadcasts().signal(id, RunSignal::Running) {
        start_or_restore(storage, integrations, &broadcast, BroadcastStatus::Paused).await?;
        info!("Broadcast {} resumed with a new runner", id);
    } else {
        info!("Broadcast {} resumed", id);
    }
    Ok(broadcast)
}

pub async fn stop_broadcast(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    id: i64,
) -> Result<Broadcast> {
    let broadcast = load(storage, id).await?;
    if broadcast.status.is_finished() {
        return Err(PortalError::conflict(format!(
            "Broadcast is already {}",
            broadcast.status
        )));
    }
    let broadcast = set_status(storage, id, BroadcastStatus::Stopped).await?;
    integrations.broadcasts().signal(id, RunSignal::Stopped);
    info!("Broadcast {} stopped", id);
    Ok(broadcast)
}

/// 失败的接收人重新排队发送
pub async fn retry_failed(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    id: i64,
) -> Result<Broadcast> {
    let broadcast = load(storage, id).await?;
    if integrations.broadcasts().is_running(id) || !broadcast.status.is_finished() {
        return Err(PortalError::conflict(
            "Broadcast is still in progress, stop it or wait for it to finish",
        ));
    }
    if broadcast.failed == 0 {
        return Err(PortalError::validation("Broadcast has no failed recipients"));
    }
    integrations.whatsapp()?;

    let previous = broadcast.status;
    let reset = storage.reset_failed_recipients(id).await?;
    let broadcast = set_status(storage, id, BroadcastStatus::Running).await?;
    start_or_restore(storage, integrations, &broadcast, previous).await?;
    info!("Broadcast {} retrying {} failed recipients", id, reset);
    Ok(broadcast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::messaging::entities::{BroadcastAudience, RecipientStatus};
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::models::users::requests::NewUser;
    use crate::services::testing::{FakeEmail, FakeSender, fake_integrations, memory_storage};
    use std::time::Duration;

    async fn admin(storage: &Arc<dyn Storage>) -> i64 {
        storage
            .create_user(NewUser {
                username: "direcao".to_string(),
                email: "direcao@escola.test".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Admin,
                status: UserStatus::Active,
                display_name: None,
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    fn phones_request(phones: &[&str]) -> CreateBroadcastRequest {
        CreateBroadcastRequest {
            message: "Amanhã não haverá aula".to_string(),
            audience: BroadcastAudience::Phones,
            class_name: None,
            phones: Some(phones.iter().map(|p| p.to_string()).collect()),
            min_delay_ms: Some(0),
            max_delay_ms: Some(0),
        }
    }

    async fn wait_finished(storage: &Arc<dyn Storage>, integrations: &Integrations, id: i64) -> Broadcast {
        for _ in 0..200 {
            let broadcast = load(storage, id).await.unwrap();
            if broadcast.status.is_finished() && !integrations.broadcasts().is_running(id) {
                return broadcast;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("broadcast {id} did not finish");
    }

    #[tokio::test]
    async fn test_create_runs_to_completion_then_retry() {
        let storage = memory_storage().await;
        let created_by = admin(&storage).await;
        let mut sender = FakeSender::new();
        sender.fail_phones = vec!["5511933333333".to_string()];
        let sender = Arc::new(sender);
        let integrations = fake_integrations(Arc::new(FakeEmail::default()), sender.clone(), vec![]);

        let response = create_broadcast(
            &storage,
            &integrations,
            created_by,
            phones_request(&["11911111111", "11922222222", "11933333333", "invalid"]),
        )
        .await
        .unwrap();
        assert_eq!(response.skipped, Some(1));
        assert_eq!(response.broadcast.total, 3);

        let done = wait_finished(&storage, &integrations, response.broadcast.id).await;
        assert_eq!(done.status, BroadcastStatus::Completed);
        assert_eq!((done.sent, done.failed), (2, 1));

        let err = pause_broadcast(&storage, &integrations, done.id).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        retry_failed(&storage, &integrations, done.id).await.unwrap();
        let retried = wait_finished(&storage, &integrations, done.id).await;
        assert_eq!(retried.status, BroadcastStatus::Completed);
        assert_eq!(sender.phones().len(), 4);
        let failed = storage
            .list_broadcast_recipients(done.id, Some(RecipientStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test]
    async fn test_pause_resume_and_stop() {
        let storage = memory_storage().await;
        let created_by = admin(&storage).await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );
        let mut request = phones_request(&["11911111111", "11922222222", "11933333333"]);
        request.min_delay_ms = Some(60_000);
        request.max_delay_ms = Some(60_000);

        let id = create_broadcast(&storage, &integrations, created_by, request)
            .await
            .unwrap()
            .broadcast
            .id;

        let paused = pause_broadcast(&storage, &integrations, id).await.unwrap();
        assert_eq!(paused.status, BroadcastStatus::Paused);
        assert!(matches!(
            pause_broadcast(&storage, &integrations, id).await,
            Err(PortalError::Conflict(_))
        ));

        let resumed = resume_broadcast(&storage, &integrations, id).await.unwrap();
        assert_eq!(resumed.status, BroadcastStatus::Running);

        let stopped = stop_broadcast(&storage, &integrations, id).await.unwrap();
        assert_eq!(stopped.status, BroadcastStatus::Stopped);
        let finished = wait_finished(&storage, &integrations, id).await;
        assert_eq!(finished.status, BroadcastStatus::Stopped);
        assert!(finished.sent < 3);
    }

    #[tokio::test]
    async fn test_resume_after_restart_spawns_runner() {
        let storage = memory_storage().await;
        let created_by = admin(&storage).await;
        let first_process = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );
        // 第一个进程发出第一条后停在间隔里，恢复后的任务发出第二条后同样停在间隔里
        let mut request = phones_request(&["11911111111", "11922222222", "11933333333"]);
        request.min_delay_ms = Some(60_000);
        request.max_delay_ms = Some(60_000);
        let id = create_broadcast(&storage, &first_process, created_by, request)
            .await
            .unwrap()
            .broadcast
            .id;
        stop_broadcast(&storage, &first_process, id).await.unwrap();
        wait_finished(&storage, &first_process, id).await;

        // 模拟重启：数据库里是 paused，新进程没有后台任务
        storage.set_broadcast_status(id, BroadcastStatus::Paused).await.unwrap();
        let sender = Arc::new(FakeSender::new());
        let second_process = fake_integrations(Arc::new(FakeEmail::default()), sender.clone(), vec![]);

        resume_broadcast(&storage, &second_process, id).await.unwrap();
        assert!(second_process.broadcasts().is_running(id));
        for _ in 0..200 {
            if !sender.phones().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sender.phones().len(), 1);

        stop_broadcast(&storage, &second_process, id).await.unwrap();
        let finished = wait_finished(&storage, &second_process, id).await;
        assert_eq!(finished.status, BroadcastStatus::Stopped);
        assert_eq!(finished.sent, 2);
    }

    #[tokio::test]
    async fn test_second_runner_for_same_broadcast_is_rejected() {
        let storage = memory_storage().await;
        let created_by = admin(&storage).await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );
        let mut request = phones_request(&["11911111111", "11922222222"]);
        request.min_delay_ms = Some(60_000);
        request.max_delay_ms = Some(60_000);
        let broadcast = create_broadcast(&storage, &integrations, created_by, request)
            .await
            .unwrap()
            .broadcast;
        assert!(integrations.broadcasts().is_running(broadcast.id));

        let err = start_runner(&storage, &integrations, &broadcast).unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
        assert_eq!(broadcast_error_code(&err), ErrorCode::BroadcastInvalidState);

        // 状态改为 paused 而旧任务仍在注册表中，恢复时直接发信号，不重复启动
        storage
            .set_broadcast_status(broadcast.id, BroadcastStatus::Paused)
            .await
            .unwrap();
        let resumed = resume_broadcast(&storage, &integrations, broadcast.id).await.unwrap();
        assert_eq!(resumed.status, BroadcastStatus::Running);

        stop_broadcast(&storage, &integrations, broadcast.id).await.unwrap();
        wait_finished(&storage, &integrations, broadcast.id).await;
    }

    #[tokio::test]
    async fn test_no_recipients_and_unconfigured_whatsapp() {
        let storage = memory_storage().await;
        let created_by = admin(&storage).await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );

        let err = create_broadcast(&storage, &integrations, created_by, phones_request(&["0"]))
            .await
            .unwrap_err();
        assert_eq!(broadcast_error_code(&err), ErrorCode::BroadcastNoRecipients);

        let bare = Integrations::new(Arc::new(FakeEmail::default()));
        let err = create_broadcast(&storage, &bare, created_by, phones_request(&["11911111111"]))
            .await
            .unwrap_err();
        assert_eq!(broadcast_error_code(&err), ErrorCode::MessagingNotConfigured);
    }
}
