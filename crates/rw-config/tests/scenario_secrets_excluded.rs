//! Secret literals in YAML abort the load; env var names are fine.

use rw_config::load_layered_yaml_from_strings;

fn rejected(yaml: &str) -> String {
    load_layered_yaml_from_strings(&[yaml])
        .expect_err("secret literal must be rejected")
        .to_string()
}

#[test]
fn jwt_api_key_literal_is_rejected() {
    let msg = rejected(
        r#"
store:
  rest:
    api_key_env: "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoiYW5vbiJ9.sig"
"#,
    );
    assert!(msg.contains("CONFIG_SECRET_DETECTED"));
    assert!(msg.contains("/store/rest/api_key_env"));
    assert!(!msg.contains("eyJ"), "the value itself must never be echoed");
}

#[test]
fn connection_string_with_password_is_rejected() {
    let msg = rejected("store:\n  database_url_env: \"postgres://club:pw12345@db:5432/club\"\n");
    assert!(msg.contains("/store/database_url_env"));
}

#[test]
fn webhook_url_literal_is_rejected() {
    let msg = rejected(
        "notify:\n  discord:\n    alerts_env: \"https://discord.com/api/webhooks/123/token\"\n",
    );
    assert!(msg.contains("/notify/discord/alerts_env"));
}

#[test]
fn env_var_names_are_accepted() {
    let yaml = r#"
store:
  database_url_env: RW_DATABASE_URL
  rest:
    url_env: RW_SUPABASE_URL
    api_key_env: RW_SUPABASE_KEY
notify:
  discord:
    alerts_env: RW_DISCORD_ALERTS_WEBHOOK
"#;
    assert!(load_layered_yaml_from_strings(&[yaml]).is_ok());
}
