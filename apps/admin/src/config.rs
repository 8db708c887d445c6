use std::{fs, path::Path, time::Duration};

use toml::{Table, Value};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub cart_database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/api".into(),
            api_token: None,
            page_size: 10,
            request_timeout_secs: 15,
            cart_database_url: "sqlite://./data/cart.db".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn load_settings(path: &Path) -> Settings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<Table>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(error) => warn!(path = %path.display(), %error, "ignoring unparsable config file"),
        }
    }

    if let Some(v) = env("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE").and_then(|v| parse_page_size(&v)) {
        settings.page_size = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("CART_DATABASE_URL") {
        settings.cart_database_url = v;
    }
    if let Some(v) = env("APP__CART_DATABASE_URL") {
        settings.cart_database_url = v;
    }

    settings.api_token = settings.api_token.filter(|token| !token.trim().is_empty());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &Table) {
    if let Some(v) = text(file_cfg, "api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = text(file_cfg, "api_token") {
        settings.api_token = Some(v);
    }
    if let Some(v) = number(file_cfg, "page_size")
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
    {
        settings.page_size = v;
    }
    if let Some(v) = number(file_cfg, "request_timeout_secs") {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = text(file_cfg, "cart_database_url") {
        settings.cart_database_url = v;
    }
}

fn text(table: &Table, key: &str) -> Option<String> {
    match table.get(key)? {
        Value::String(v) => Some(v.clone()),
        _ => None,
    }
}

fn number(table: &Table, key: &str) -> Option<u64> {
    match table.get(key)? {
        Value::Integer(v) => u64::try_from(*v).ok(),
        Value::String(v) => v.trim().parse().ok(),
        _ => None,
    }
}

fn parse_page_size(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_config(label: &str, contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("storefront_admin_{label}_{suffix}.toml"));
        fs::write(&path, contents).expect("write config");
        path
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings_with(Path::new("/nonexistent/admin.toml"), no_env);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let path = temp_config(
            "file_values",
            r#"
            api_base_url = "https://shop.example.com/api"
            page_size = 25
            request_timeout_secs = "30"
            api_token = "abc"
            "#,
        );

        let settings = load_settings_with(&path, no_env);
        fs::remove_file(&path).expect("cleanup");

        assert_eq!(settings.api_base_url, "https://shop.example.com/api");
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.api_token.as_deref(), Some("abc"));
    }

    #[test]
    fn env_overrides_file_and_ignores_bad_numbers() {
        let path = temp_config("env_overrides", "page_size = 25\n");
        let vars: HashMap<&str, &str> = HashMap::from([
            ("APP__API_BASE_URL", "http://localhost:8080"),
            ("APP__PAGE_SIZE", "zero"),
            ("APP__CART_DATABASE_URL", "sqlite::memory:"),
            ("APP__API_TOKEN", "  "),
        ]);

        let settings = load_settings_with(&path, |key| vars.get(key).map(|v| v.to_string()));
        fs::remove_file(&path).expect("cleanup");

        assert_eq!(settings.api_base_url, "http://localhost:8080");
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.cart_database_url, "sqlite::memory:");
        assert_eq!(settings.api_token, None);
    }

    #[test]
    fn zero_page_size_in_file_is_ignored() {
        let path = temp_config("zero_page_size", "page_size = 0\n");
        let settings = load_settings_with(&path, no_env);
        fs::remove_file(&path).expect("cleanup");
        assert_eq!(settings.page_size, 10);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let path = temp_config("unparsable", "page_size = [not toml");
        let settings = load_settings_with(&path, no_env);
        fs::remove_file(&path).expect("cleanup");
        assert_eq!(settings, Settings::default());
    }
}
