use super::schema::Config;
use std::sync::LazyLock;

const DEFAULT_CONFIG_JSON: &str = include_str!("../../../../presets/kpi-default.json");

// Every field is spelled out in the embedded file, so parsing it never
// reaches the serde default hooks that read back from here.
static DEFAULT_CONFIG: LazyLock<Config> = LazyLock::new(|| {
    serde_json::from_str(DEFAULT_CONFIG_JSON).expect("embedded kpi-default.json is valid")
});

/// The built-in configuration.
pub fn defaults() -> &'static Config {
    &DEFAULT_CONFIG
}
