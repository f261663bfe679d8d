use super::*;

use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_listen_on_all_interfaces_port_7860() {
    let settings = Settings::default();
    assert_eq!(settings.bind_addr().to_string(), "0.0.0.0:7860");
    assert_eq!(settings.effective_gateway_mode(), GatewayMode::Placeholder);
}

#[test]
fn port_env_overrides_default() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env(&[("PORT", "8080")]));
    assert_eq!(settings.bind_addr().port(), 8080);
}

#[test]
fn prefixed_env_wins_over_plain_name() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env(&[("PORT", "8080"), ("APP__PORT", "9090"), ("LLM_MODEL", "a"), ("APP__LLM_MODEL", "b")]),
    );
    assert_eq!(settings.port, 9090);
    assert_eq!(settings.model, "b");
}

#[test]
fn unparseable_values_keep_previous_setting() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env(&[("PORT", "not-a-port"), ("APP__CHAT_CONTEXT", "everything")]),
    );
    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.chat_context, ChatContext::LatestMessage);
}

#[test]
fn credential_switches_to_remote_gateway() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env(&[("LLM_API_KEY", "sk-test")]));
    assert_eq!(settings.effective_gateway_mode(), GatewayMode::Remote);
    assert_eq!(settings.gateway_config().api_key.as_deref(), Some("sk-test"));

    apply_env(&mut settings, env(&[("APP__GATEWAY_MODE", "placeholder")]));
    assert_eq!(settings.effective_gateway_mode(), GatewayMode::Placeholder);
}

#[test]
fn blank_credential_is_ignored() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env(&[("LLM_API_KEY", "   ")]));
    assert!(settings.api_key.is_none());
}

#[test]
fn file_config_accepts_strings_and_integers() {
    let mut settings = Settings::default();
    apply_file_config(
        &mut settings,
        r#"
        port = 9000
        model = "gpt-4o"
        api_base_url = "https://llm.internal/v1"
        chat_context = "transcript"
        request_timeout_seconds = "30"
        max_upload_bytes = 2048
        "#,
    )
    .expect("config");

    assert_eq!(settings.port, 9000);
    assert_eq!(settings.model, "gpt-4o");
    assert_eq!(settings.api_base_url, "https://llm.internal/v1");
    assert_eq!(settings.chat_context, ChatContext::Transcript);
    assert_eq!(settings.gateway_config().timeout, Duration::from_secs(30));
    assert_eq!(settings.max_upload_bytes, 2048);
}

#[test]
fn malformed_file_config_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file_config(&mut settings, "port = [").is_err());
}
