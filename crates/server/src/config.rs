use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::Context;
use gateway::{GatewayConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use server_api::ChatContext;

pub const CONFIG_FILE: &str = "coderefine.toml";
pub const DEFAULT_PORT: u16 = 7860;
const BIND_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Remote,
    Placeholder,
}

impl GatewayMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" => Some(Self::Remote),
            "placeholder" | "offline" => Some(Self::Placeholder),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub gateway_mode: Option<GatewayMode>,
    pub chat_context: ChatContext,
    pub request_timeout_seconds: u64,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
            model: DEFAULT_MODEL.into(),
            api_base_url: DEFAULT_BASE_URL.into(),
            gateway_mode: None,
            chat_context: ChatContext::LatestMessage,
            request_timeout_seconds: 120,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(BIND_HOST, self.port)
    }

    /// Remote when a credential is present, unless the mode was set explicitly.
    pub fn effective_gateway_mode(&self) -> GatewayMode {
        self.gateway_mode.unwrap_or(match self.api_key {
            Some(_) => GatewayMode::Remote,
            None => GatewayMode::Placeholder,
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file_config(&mut settings, &raw)
            .with_context(|| format!("failed to parse {CONFIG_FILE}"))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    Ok(settings)
}

pub fn apply_file_config(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let table: toml::Table = toml::from_str(raw)?;
    let get = |key: &str| table.get(key).and_then(value_as_string);

    if let Some(v) = get("port") {
        set_parsed(&mut settings.port, &v);
    }
    if let Some(v) = get("api_key") {
        settings.api_key = non_blank(v);
    }
    if let Some(v) = get("model") {
        settings.model = v;
    }
    if let Some(v) = get("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = get("gateway_mode") {
        settings.gateway_mode = GatewayMode::parse(&v).or(settings.gateway_mode);
    }
    if let Some(v) = get("chat_context") {
        settings.chat_context = ChatContext::parse(&v).unwrap_or(settings.chat_context);
    }
    if let Some(v) = get("request_timeout_seconds") {
        set_parsed(&mut settings.request_timeout_seconds, &v);
    }
    if let Some(v) = get("max_upload_bytes") {
        set_parsed(&mut settings.max_upload_bytes, &v);
    }

    Ok(())
}

/// Plain names first, then `APP__` names, so the prefixed form wins.
pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["PORT", "APP__PORT"] {
        if let Some(v) = lookup(key) {
            set_parsed(&mut settings.port, &v);
        }
    }
    for key in ["LLM_API_KEY", "APP__LLM_API_KEY"] {
        if let Some(v) = lookup(key) {
            settings.api_key = non_blank(v).or(settings.api_key.take());
        }
    }
    for key in ["LLM_MODEL", "APP__LLM_MODEL"] {
        if let Some(v) = lookup(key) {
            settings.model = v;
        }
    }
    for key in ["LLM_BASE_URL", "APP__LLM_BASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_base_url = v;
        }
    }
    if let Some(v) = lookup("APP__GATEWAY_MODE") {
        settings.gateway_mode = GatewayMode::parse(&v).or(settings.gateway_mode);
    }
    if let Some(v) = lookup("APP__CHAT_CONTEXT") {
        settings.chat_context = ChatContext::parse(&v).unwrap_or(settings.chat_context);
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
        set_parsed(&mut settings.request_timeout_seconds, &v);
    }
    if let Some(v) = lookup("APP__MAX_UPLOAD_BYTES") {
        set_parsed(&mut settings.max_upload_bytes, &v);
    }
}

fn value_as_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(n) => Some(n.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<T>() {
        *slot = parsed;
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
