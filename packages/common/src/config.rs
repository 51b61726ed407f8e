use serde::Deserialize;

/// Upload storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Root directory for stored uploads. Default: "./uploads".
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Maximum accepted PDF size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Base URL used when building public file URLs. When unset the base is
    /// derived from the request `Host` header.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Age after which an unclaimed upload is swept. Default: 1800.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    /// Interval of the background sweeper. Default: 600.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_storage_dir() -> String {
    "./uploads".into()
}
fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}
fn default_pending_ttl_secs() -> u64 {
    30 * 60
}
fn default_sweep_interval_secs() -> u64 {
    10 * 60
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            max_file_size: default_max_file_size(),
            public_base_url: None,
            pending_ttl_secs: default_pending_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Rendering options for the PDF preview converter.
#[derive(Debug, Deserialize, Clone)]
pub struct ConverterConfig {
    /// Render resolution. Default: 150.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// JPEG quality (1-100). Default: 90.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// First page to render, 1-based. Default: 1.
    #[serde(default = "default_first_page")]
    pub first_page: u32,
    /// Last page to render, inclusive. Default: 10.
    #[serde(default = "default_last_page")]
    pub last_page: u32,
}

fn default_dpi() -> u32 {
    150
}
fn default_quality() -> u8 {
    90
}
fn default_first_page() -> u32 {
    1
}
fn default_last_page() -> u32 {
    10
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            quality: default_quality(),
            first_page: default_first_page(),
            last_page: default_last_page(),
        }
    }
}

/// Resume access throttling.
#[derive(Debug, Deserialize, Clone)]
pub struct AccessConfig {
    /// Whether limits are enforced. Default: true.
    #[serde(default = "default_access_enabled")]
    pub enabled: bool,
    /// Views per window for callers without a token. Default: 5.
    #[serde(default = "default_anonymous_view_limit")]
    pub anonymous_view_limit: u32,
    /// Views per window for signed-in users who have not uploaded. Default: 20.
    #[serde(default = "default_registered_view_limit")]
    pub registered_view_limit: u32,
    /// Window length in seconds. Default: one day.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_access_enabled() -> bool {
    true
}
fn default_anonymous_view_limit() -> u32 {
    5
}
fn default_registered_view_limit() -> u32 {
    20
}
fn default_window_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            enabled: default_access_enabled(),
            anonymous_view_limit: default_anonymous_view_limit(),
            registered_view_limit: default_registered_view_limit(),
            window_secs: default_window_secs(),
        }
    }
}
