use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 后端日结接口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub store_id: String,
    #[serde(default)]
    pub current_shift_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 扫描枪防抖窗口 (毫秒)
    pub debounce_ms: u64,
    /// 票箱快照 (JSON 数组)
    pub bins_file: PathBuf,
    /// 日结报表输出目录, 不配置则不导出
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
}

impl ScanConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            backend: BackendConfig {
                base_url: "http://127.0.0.1:3000/api".to_string(),
                store_id: "default".to_string(),
                current_shift_id: None,
                timeout_secs: 30,
            },
            scan: ScanConfig {
                debounce_ms: 400,
                bins_file: PathBuf::from("bins.json"),
                report_dir: None,
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 < dayclose.toml (可选) < 环境变量 DAYCLOSE__SECTION__KEY
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            Environment::with_prefix("DAYCLOSE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn load_from(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("dayclose").required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}
