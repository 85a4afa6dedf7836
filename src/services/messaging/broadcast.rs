//! WhatsApp 群发执行器
//!
//! 每个群发任务一个后台任务，严格顺序发送：等待暂停解除、发送、记录结果、
//! 随机间隔后处理下一位。控制信号通过 `watch` 通道下发，间隔等待期间收到
//! 停止信号会立即结束。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::whatsapp::WhatsAppSender;
use crate::errors::Result;
use crate::models::messaging::entities::{BroadcastRecipient, BroadcastStatus, RecipientStatus};
use crate::storage::Storage;

/// 运行控制信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
}

/// 群发进度的读写接口
#[async_trait]
pub trait BroadcastProgress: Send + Sync {
    async fn pending_recipients(&self, broadcast_id: i64) -> Result<Vec<BroadcastRecipient>>;
    async fn record_sent(&self, broadcast_id: i64, recipient_id: i64) -> Result<()>;
    async fn record_failed(&self, broadcast_id: i64, recipient_id: i64, error: &str) -> Result<()>;
    async fn finish(&self, broadcast_id: i64, status: BroadcastStatus) -> Result<()>;
}

/// 以存储层记录进度
pub struct StorageProgress {
    storage: Arc<dyn Storage>,
}

impl StorageProgress {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl BroadcastProgress for StorageProgress {
    async fn pending_recipients(&self, broadcast_id: i64) -> Result<Vec<BroadcastRecipient>> {
        self.storage
            .list_broadcast_recipients(broadcast_id, Some(RecipientStatus::Pending))
            .await
    }

    async fn record_sent(&self, broadcast_id: i64, recipient_id: i64) -> Result<()> {
        self.storage
            .mark_recipient_sent(broadcast_id, recipient_id)
            .await
    }

    async fn record_failed(&self, broadcast_id: i64, recipient_id: i64, error: &str) -> Result<()> {
        self.storage
            .mark_recipient_failed(broadcast_id, recipient_id, error)
            .await
    }

    async fn finish(&self, broadcast_id: i64, status: BroadcastStatus) -> Result<()> {
        self.storage
            .set_broadcast_status(broadcast_id, status)
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub broadcast_id: i64,
    pub message: String,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// `[min, max]` 内的随机间隔
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

/// 暂停时阻塞；返回 false 表示应停止（收到停止信号或控制端已关闭）
async fn wait_until_runnable(signal: &mut watch::Receiver<RunSignal>) -> bool {
    loop {
        if signal.has_changed().is_err() {
            return false;
        }
        let current = *signal.borrow_and_update();
        match current {
            RunSignal::Running => return true,
            RunSignal::Stopped => return false,
            RunSignal::Paused => {
                if signal.changed().await.is_err() {
                    return false;
                }
            }
        }
    }
}

/// 直到收到停止信号（或控制端关闭）才返回
async fn wait_for_stop(signal: &mut watch::Receiver<RunSignal>) {
    loop {
        if *signal.borrow_and_update() == RunSignal::Stopped {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}

pub async fn run_broadcast(
    config: RunnerConfig,
    sender: Arc<dyn WhatsAppSender>,
    progress: Arc<dyn BroadcastProgress>,
    mut signal: watch::Receiver<RunSignal>,
) -> Result<RunOutcome> {
    let id = config.broadcast_id;
    let recipients = progress.pending_recipients(id).await?;
    let last = recipients.len().saturating_sub(1);

    for (index, recipient) in recipients.into_iter().enumerate() {
        if !wait_until_runnable(&mut signal).await {
            progress.finish(id, BroadcastStatus::Stopped).await?;
            info!("Broadcast {} stopped before recipient {}", id, recipient.id);
            return Ok(RunOutcome::Stopped);
        }

        match sender.send_text(&recipient.phone, &config.message).await {
            Ok(_) => progress.record_sent(id, recipient.id).await?,
            Err(e) => {
                warn!("Broadcast {} failed for {}: {}", id, recipient.phone, e);
                progress.record_failed(id, recipient.id, e.message()).await?;
            }
        }

        if index == last {
            break;
        }

        let delay = random_delay(config.min_delay_ms, config.max_delay_ms);
        let stopped = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = wait_for_stop(&mut signal) => true,
        };
        if stopped {
            progress.finish(id, BroadcastStatus::Stopped).await?;
            info!("Broadcast {} stopped during delay", id);
            return Ok(RunOutcome::Stopped);
        }
    }

    progress.finish(id, BroadcastStatus::Completed).await?;
    info!("Broadcast {} completed", id);
    Ok(RunOutcome::Completed)
}

/// 运行中的群发任务（按任务 ID 保存控制端）
#[derive(Default)]
pub struct BroadcastRegistry {
    runners: DashMap<i64, watch::Sender<RunSignal>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, broadcast_id: i64) -> bool {
        self.runners.contains_key(&broadcast_id)
    }

    /// 启动后台任务；已有同 ID 任务在运行时返回 false
    pub fn spawn(
        self: &Arc<Self>,
        config: RunnerConfig,
        sender: Arc<dyn WhatsAppSender>,
        progress: Arc<dyn BroadcastProgress>,
    ) -> bool {
        let id = config.broadcast_id;
        let receiver = match self.runners.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => return false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(RunSignal::Running);
                slot.insert(tx);
                rx
            }
        };

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            match run_broadcast(config, sender, progress, receiver).await {
                Ok(outcome) => info!("Broadcast {} runner finished: {:?}", id, outcome),
                Err(e) => error!("Broadcast {} runner aborted: {}", id, e),
            }
            registry.runners.remove(&id);
        });
        true
    }

    /// 向运行中的任务发送信号；没有运行中的任务时返回 false
    pub fn signal(&self, broadcast_id: i64, signal: RunSignal) -> bool {
        match self.runners.get(&broadcast_id) {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.runners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeSender;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProgress {
        recipients: Vec<BroadcastRecipient>,
        sent: Mutex<Vec<i64>>,
        failed: Mutex<Vec<(i64, String)>>,
        finished: Mutex<Option<BroadcastStatus>>,
    }

    #[async_trait]
    impl BroadcastProgress for FakeProgress {
        async fn pending_recipients(&self, _id: i64) -> Result<Vec<BroadcastRecipient>> {
            Ok(self.recipients.clone())
        }
        async fn record_sent(&self, _id: i64, recipient_id: i64) -> Result<()> {
            self.sent.lock().unwrap().push(recipient_id);
            Ok(())
        }
        async fn record_failed(&self, _id: i64, recipient_id: i64, error: &str) -> Result<()> {
            self.failed
                .lock()
                .unwrap()
                .push((recipient_id, error.to_string()));
            Ok(())
        }
        async fn finish(&self, _id: i64, status: BroadcastStatus) -> Result<()> {
            *self.finished.lock().unwrap() = Some(status);
            Ok(())
        }
    }

    fn progress_with(phones: &[&str]) -> Arc<FakeProgress> {
        let recipients = phones
            .iter()
            .enumerate()
            .map(|(i, phone)| BroadcastRecipient {
                id: i as i64 + 1,
                broadcast_id: 1,
                student_id: None,
                name: None,
                phone: phone.to_string(),
                status: RecipientStatus::Pending,
                error: None,
                sent_at: None,
            })
            .collect();
        Arc::new(FakeProgress {
            recipients,
            ..Default::default()
        })
    }

    fn config() -> RunnerConfig {
        RunnerConfig {
            broadcast_id: 1,
            message: "Reunião de pais sexta-feira".to_string(),
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    const PHONES: [&str; 4] = [
        "5511900000001",
        "5511900000002",
        "5511900000003",
        "5511900000004",
    ];

    #[tokio::test]
    async fn test_sends_sequentially_and_completes() {
        let progress = progress_with(&PHONES);
        let mut sender = FakeSender::new();
        sender.fail_phones = vec![PHONES[1].to_string()];
        let sender = Arc::new(sender);
        let (_tx, rx) = watch::channel(RunSignal::Running);

        let outcome = run_broadcast(config(), sender.clone(), progress.clone(), rx)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(sender.phones(), PHONES.to_vec());
        assert_eq!(*progress.sent.lock().unwrap(), vec![1, 3, 4]);
        let failed = progress.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, 2);
        assert!(failed[0].1.contains("not on WhatsApp"));
        assert_eq!(
            *progress.finished.lock().unwrap(),
            Some(BroadcastStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_stop_mid_loop_halts_sending() {
        let progress = progress_with(&PHONES);
        let (tx, rx) = watch::channel(RunSignal::Running);
        let tx = Arc::new(tx);
        let mut sender = FakeSender::new();
        sender.trigger = Some((2, RunSignal::Stopped, tx.clone()));
        let sender = Arc::new(sender);

        let outcome = run_broadcast(config(), sender.clone(), progress.clone(), rx)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Stopped);
        assert_eq!(sender.phones().len(), 2);
        assert_eq!(
            *progress.finished.lock().unwrap(),
            Some(BroadcastStatus::Stopped)
        );
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_delay() {
        let progress = progress_with(&PHONES);
        let (tx, rx) = watch::channel(RunSignal::Running);
        let sender = Arc::new(FakeSender::new());
        let mut slow = config();
        slow.min_delay_ms = 60_000;
        slow.max_delay_ms = 60_000;

        let handle = tokio::spawn(run_broadcast(slow, sender.clone(), progress.clone(), rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(RunSignal::Stopped).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Stopped);
        assert_eq!(sender.phones().len(), 1);
    }

    #[tokio::test]
    async fn test_pause_then_resume() {
        let progress = progress_with(&PHONES);
        let (tx, rx) = watch::channel(RunSignal::Running);
        let tx = Arc::new(tx);
        let mut sender = FakeSender::new();
        sender.trigger = Some((1, RunSignal::Paused, tx.clone()));
        let sender = Arc::new(sender);

        let handle = tokio::spawn(run_broadcast(config(), sender.clone(), progress.clone(), rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sender.phones().len(), 1);
        assert!(progress.finished.lock().unwrap().is_none());

        tx.send(RunSignal::Running).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(sender.phones().len(), 4);
    }

    #[tokio::test]
    async fn test_dropped_controller_stops_paused_runner() {
        let progress = progress_with(&PHONES);
        let (tx, rx) = watch::channel(RunSignal::Paused);
        let sender = Arc::new(FakeSender::new());

        let handle = tokio::spawn(run_broadcast(config(), sender.clone(), progress.clone(), rx));
        drop(tx);

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Stopped);
        assert!(sender.phones().is_empty());
    }

    #[tokio::test]
    async fn test_registry_rejects_duplicate_runner() {
        let registry = Arc::new(BroadcastRegistry::new());
        let progress = progress_with(&PHONES);
        let sender = Arc::new(FakeSender::new());
        let mut slow = config();
        slow.min_delay_ms = 60_000;
        slow.max_delay_ms = 60_000;

        assert!(registry.spawn(slow.clone(), sender.clone(), progress.clone()));
        assert!(registry.is_running(1));
        assert!(!registry.spawn(slow, sender.clone(), progress.clone()));

        assert!(registry.signal(1, RunSignal::Stopped));
        for _ in 0..100 {
            if !registry.is_running(1) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!registry.is_running(1));
        assert!(!registry.signal(1, RunSignal::Running));
        assert_eq!(
            *progress.finished.lock().unwrap(),
            Some(BroadcastStatus::Stopped)
        );
    }

    #[tokio::test]
    async fn test_storage_progress_updates_counters() {
        use crate::models::messaging::requests::{NewBroadcast, NewRecipient};
        use crate::models::users::entities::{UserRole, UserStatus};
        use crate::models::users::requests::NewUser;

        let storage = crate::services::testing::memory_storage().await;
        let admin = storage
            .create_user(NewUser {
                username: "secretaria".to_string(),
                email: "secretaria@escola.test".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Admin,
                status: UserStatus::Active,
                display_name: None,
                phone: None,
            })
            .await
            .unwrap();
        let broadcast = storage
            .create_broadcast(
                NewBroadcast {
                    message: "Aviso".to_string(),
                    created_by: admin.id,
                    min_delay_ms: 0,
                    max_delay_ms: 0,
                },
                PHONES[..3]
                    .iter()
                    .map(|p| NewRecipient {
                        student_id: None,
                        name: None,
                        phone: p.to_string(),
                    })
                    .collect(),
            )
            .await
            .unwrap();

        let mut sender = FakeSender::new();
        sender.fail_phones = vec![PHONES[2].to_string()];
        let (_tx, rx) = watch::channel(RunSignal::Running);
        let mut cfg = config();
        cfg.broadcast_id = broadcast.id;

        let outcome = run_broadcast(
            cfg,
            Arc::new(sender),
            Arc::new(StorageProgress::new(storage.clone())),
            rx,
        )
        .await
        .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let stored = storage.get_broadcast_by_id(broadcast.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BroadcastStatus::Completed);
        assert_eq!((stored.sent, stored.failed), (2, 1));
        assert!(stored.finished_at.is_some());
        let failed = storage
            .list_broadcast_recipients(broadcast.id, Some(RecipientStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed[0].phone, PHONES[2]);
    }

    #[test]
    fn test_random_delay_bounds() {
        for _ in 0..50 {
            let d = random_delay(100, 200).as_millis();
            assert!((100..=200).contains(&d));
        }
        assert_eq!(random_delay(300, 100), Duration::from_millis(300));
    }
}
