//! Flare Album 配置模块
//!
//! 该模块提供了应用程序配置管理功能，包括：
//! - 配置文件加载和解析（单文件或目录分片合并）
//! - 日志配置
//! - 消息网关与相册中继服务配置

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::{Table, Value};
use tracing::warn;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<AlbumAppConfig> = OnceLock::new();

/// 目录模式下依次叠加的片段目录
const FRAGMENT_LAYERS: [&str; 2] = ["services", "overrides"];

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出 target
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// 是否输出线程 ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// 消息网关配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// 网关 API 基础地址
    #[serde(default)]
    pub base_url: Option<String>,
    /// 机器人令牌
    #[serde(default)]
    pub token: Option<String>,
    /// 长轮询超时（秒）
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
    /// 相册投递请求超时（秒）
    #[serde(default)]
    pub media_group_timeout_secs: Option<u64>,
}

/// 相册中继服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AlbumRelayServiceConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// 审核接收者（0 视为未配置）
    #[serde(default)]
    pub oversight_chat_id: Option<i64>,
    /// 防抖窗口（毫秒）
    #[serde(default)]
    pub debounce_window_ms: Option<u64>,
    /// 单个相册最大条目数
    #[serde(default)]
    pub max_group_size: Option<usize>,
    /// 逐条转发间隔（毫秒）
    #[serde(default)]
    pub forward_pacing_ms: Option<u64>,
    /// 缓冲过期时间（秒）
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
    /// 回收扫描间隔（秒）
    #[serde(default)]
    pub reclaim_interval_secs: Option<u64>,
    /// 活动日志文件路径
    #[serde(default)]
    pub activity_log_path: Option<String>,
    /// 管理查询返回的日志行数
    #[serde(default)]
    pub activity_tail_lines: Option<usize>,
    /// 停机时等待进行中分发的宽限期（秒）
    #[serde(default)]
    pub shutdown_grace_secs: Option<u64>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 相册中继服务配置
    #[serde(default)]
    pub album_relay: Option<AlbumRelayServiceConfig>,
}

/// Flare Album 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AlbumAppConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 消息网关配置
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl AlbumAppConfig {
    /// 获取相册中继服务配置
    pub fn album_relay_service(&self) -> AlbumRelayServiceConfig {
        self.services.album_relay.clone().unwrap_or_default()
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static AlbumAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> AlbumAppConfig {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    AlbumAppConfig::default()
}

/// 从源加载配置
pub fn load_config_from_source(path: &Path) -> Result<AlbumAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_config_from_file(path)
    }
}

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Result<AlbumAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config format: {}", path.display()))
}

/// 从目录加载配置
///
/// 先读 `base.toml`，再按文件名顺序叠加 `services/`、`overrides/` 下的片段。
fn load_config_from_directory(path: &Path) -> Result<AlbumAppConfig> {
    let base_file = path.join("base.toml");
    let mut merged = read_table(&base_file)
        .with_context(|| format!("missing base configuration: {}", base_file.display()))?;

    for layer in FRAGMENT_LAYERS {
        for fragment in toml_fragments(&path.join(layer))? {
            overlay_table(&mut merged, read_table(&fragment)?);
        }
    }

    Value::Table(merged)
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))
}

/// 目录中的 `.toml` 片段，按路径排序；目录不存在时为空
fn toml_fragments(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut fragments = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
    {
        let file = entry?.path();
        if file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
        {
            fragments.push(file);
        }
    }
    fragments.sort();
    Ok(fragments)
}

fn read_table(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// 同名表递归合并，其余值由片段覆盖
fn overlay_table(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(Value::Table(existing)) if value.is_table() => {
                if let Value::Table(incoming) = value {
                    overlay_table(existing, incoming);
                }
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}
