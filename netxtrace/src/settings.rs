use config::{Config, ConfigError, Environment};
use netxtrace_common::NetxConfig;
use serde::Deserialize;

const DEFAULT_MAX_BODY_SNAPSHOT_SIZE: usize = 1 << 17;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ROUND_TRIP_TIMEOUT_SECS: u64 = 30;

/// Measurement knobs, read from `NETX__*` variables
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NetxSettings {
    pub max_body_snapshot_size: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
    pub round_trip_timeout_secs: Option<u64>,
    pub bogon_check: Option<bool>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// OTLP collector for metrics export, from `OTEL_EXPORTER_OTLP_ENDPOINT`
    pub otel_exporter_otlp_endpoint: Option<String>,
    #[serde(default)]
    pub netx: NetxSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let s = Config::builder()
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn to_netx_config(&self) -> NetxConfig {
        let netx = &self.netx;
        NetxConfig {
            max_body_snapshot_size: netx
                .max_body_snapshot_size
                .unwrap_or(DEFAULT_MAX_BODY_SNAPSHOT_SIZE),
            connect_timeout_secs: netx
                .connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            round_trip_timeout_secs: netx
                .round_trip_timeout_secs
                .unwrap_or(DEFAULT_ROUND_TRIP_TIMEOUT_SECS),
            bogon_check: netx.bogon_check.unwrap_or(false),
            user_agent: netx
                .user_agent
                .clone()
                .unwrap_or_else(|| format!("netxtrace/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}
