//! 应用启动器 - 负责依赖注入和服务启动

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flare_album_core::AlbumAppConfig;
use flare_album_core::metrics::{AlbumRelayMetrics, gather_text};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::{AlbumCommandHandler, AlbumQueryHandler};
use crate::config::AlbumRelayConfig;
use crate::domain::repository::{ActivityTrail, MediaGateway, UpdateSource};
use crate::domain::service::{
    BatchDispatcher, BufferManager, DebounceTimer, DispatchSettings, IdleReclaimer,
};
use crate::error::AlbumError;
use crate::infrastructure::{FileActivityTrail, HttpGateway, HttpGatewayConfig};
use crate::interface::{AdminConsole, DispatchRuntime, UpdatePoller};

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: Arc<AlbumRelayConfig>,
    pub buffers: Arc<BufferManager>,
    pub commands: Arc<AlbumCommandHandler>,
    pub queries: Arc<AlbumQueryHandler>,
    pub reclaimer: Arc<IdleReclaimer>,
    pub poller: UpdatePoller,
    pub dispatch_runtime: DispatchRuntime,
}

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(app_config: &'static AlbumAppConfig) -> Result<()> {
        let config = AlbumRelayConfig::from_app_config(app_config);

        // 构建网关客户端，启动时无法连通网关视为致命错误
        let gateway = Arc::new(Self::build_gateway(&config)?);
        let bot_name = gateway
            .get_me()
            .await
            .context("messaging gateway is unreachable")?;
        info!(bot = ?bot_name, "Connected to messaging gateway");

        let trail = Arc::new(FileActivityTrail::new(config.activity_log_path.clone()));
        info!(path = %trail.path().display(), "Activity trail ready");

        let context = Self::create_context(config, gateway.clone(), gateway, trail);
        Self::start(context).await
    }

    fn build_gateway(config: &AlbumRelayConfig) -> Result<HttpGateway> {
        let token = config
            .gateway_token
            .clone()
            .ok_or_else(|| {
                AlbumError::Configuration(
                    "gateway token is not configured (ALBUM_RELAY_BOT_TOKEN)".to_string(),
                )
            })?;

        let gateway = HttpGateway::new(HttpGatewayConfig {
            base_url: config.gateway_base_url.clone(),
            token,
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            media_group_timeout: Duration::from_secs(config.media_group_timeout_secs),
        })?;
        Ok(gateway)
    }

    /// 创建应用上下文
    pub fn create_context(
        config: AlbumRelayConfig,
        gateway: Arc<dyn MediaGateway>,
        source: Arc<dyn UpdateSource>,
        trail: Arc<dyn ActivityTrail>,
    ) -> ApplicationContext {
        let config = Arc::new(config);
        let metrics = Arc::new(AlbumRelayMetrics::new());

        // 构建缓冲管理器与防抖定时器
        let (timer, fired_rx) = DebounceTimer::new(config.debounce_window());
        let buffers = Arc::new(BufferManager::new(timer, metrics.clone()));

        // 构建领域服务
        let dispatcher = Arc::new(BatchDispatcher::new(
            buffers.clone(),
            gateway.clone(),
            trail.clone(),
            DispatchSettings {
                oversight_chat_id: config.oversight_chat_id,
                max_group_size: config.max_group_size,
                forward_pacing: config.forward_pacing(),
            },
            metrics,
        ));
        let reclaimer = Arc::new(IdleReclaimer::new(
            buffers.clone(),
            config.stale_after(),
            config.reclaim_interval(),
        ));

        // 构建应用服务
        let commands = Arc::new(AlbumCommandHandler::new(
            buffers.clone(),
            dispatcher,
            reclaimer.clone(),
        ));
        let queries = Arc::new(AlbumQueryHandler::new(buffers.clone(), trail));

        // 构建运行时
        let admin = AdminConsole::new(queries.clone(), config.activity_tail_lines);
        let poller = UpdatePoller::new(
            source,
            gateway,
            commands.clone(),
            admin,
            config.oversight_chat_id,
        );
        let dispatch_runtime =
            DispatchRuntime::new(fired_rx, commands.clone(), config.shutdown_grace());

        info!(
            service = %config.service_name,
            oversight = ?config.oversight_chat_id,
            debounce_ms = config.debounce_window_ms,
            max_group_size = config.max_group_size,
            "Album relay initialized"
        );

        ApplicationContext {
            config,
            buffers,
            commands,
            queries,
            reclaimer,
            poller,
            dispatch_runtime,
        }
    }

    /// 启动后台任务并运行直到收到停止信号
    pub async fn start(context: ApplicationContext) -> Result<()> {
        let ApplicationContext {
            buffers,
            reclaimer,
            poller,
            dispatch_runtime,
            ..
        } = context;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reclaimer_handle = reclaimer.start(shutdown_rx.clone());
        let dispatch_handle = tokio::spawn(dispatch_runtime.run(shutdown_rx.clone()));
        let poller_handle = tokio::spawn(async move { poller.run(shutdown_rx).await });

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        info!("Shutdown signal received");

        let _ = shutdown_tx.send(true);

        // 执行优雅停机：先停止拉取，再等待进行中的分发
        if let Err(e) = poller_handle.await {
            warn!(task = "poller", error = %e, "background task ended abnormally");
        }
        match dispatch_handle.await {
            Ok(drain) if drain.aborted > 0 => warn!(
                completed = drain.completed,
                aborted = drain.aborted,
                lost_items = drain.aborted_items,
                "In-flight dispatches were cut short"
            ),
            Ok(drain) => info!(completed = drain.completed, "In-flight dispatches finished"),
            Err(e) => warn!(task = "dispatch", error = %e, "background task ended abnormally"),
        }
        if let Err(e) = reclaimer_handle.await {
            warn!(task = "reclaimer", error = %e, "background task ended abnormally");
        }

        let stats = buffers.stats();
        if stats.buffered_items > 0 {
            warn!(
                active_senders = stats.active_senders,
                buffered_items = stats.buffered_items,
                "Stopping with undelivered buffers"
            );
        }

        match gather_text() {
            Ok(snapshot) => debug!(metrics = %snapshot, "Final metrics snapshot"),
            Err(e) => warn!(error = %e, "Failed to gather metrics"),
        }

        info!("Album relay stopped");
        Ok(())
    }
}
