use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use sparky_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    env: Option<&'static str>,
    value: String,
}

impl Field {
    fn new(key: &'static str, env: Option<&'static str>, value: impl Into<String>) -> Self {
        Self { key, env, value: value.into() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = detect_config_path();
    let document = path.as_deref().and_then(load_config_file_doc);

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, document.as_ref(), path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let admin_token = match &config.admin.api_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Field::new("database.url", Some("SPARKY_DATABASE_URL"), &config.database.url),
        Field::new(
            "database.max_connections",
            Some("SPARKY_DATABASE_MAX_CONNECTIONS"),
            config.database.max_connections.to_string(),
        ),
        Field::new(
            "database.timeout_secs",
            Some("SPARKY_DATABASE_TIMEOUT_SECS"),
            config.database.timeout_secs.to_string(),
        ),
        Field::new("server.bind_address", Some("SPARKY_SERVER_BIND_ADDRESS"), &config.server.bind_address),
        Field::new("server.port", Some("SPARKY_SERVER_PORT"), config.server.port.to_string()),
        Field::new(
            "server.graceful_shutdown_secs",
            Some("SPARKY_SERVER_GRACEFUL_SHUTDOWN_SECS"),
            config.server.graceful_shutdown_secs.to_string(),
        ),
        Field::new(
            "server.cors_origins",
            Some("SPARKY_SERVER_CORS_ORIGINS"),
            config.server.cors_origins.join(","),
        ),
        Field::new("business.name", Some("SPARKY_BUSINESS_NAME"), &config.business.name),
        Field::new("business.phone", Some("SPARKY_BUSINESS_PHONE"), &config.business.phone),
        Field::new("business.hours", None, &config.business.hours),
        Field::new("business.service_area", None, &config.business.service_area),
        Field::new(
            "business.review_link",
            Some("SPARKY_BUSINESS_REVIEW_LINK"),
            &config.business.review_link,
        ),
        Field::new("admin.api_token", Some("SPARKY_ADMIN_API_TOKEN"), admin_token),
        Field::new("logging.level", Some("SPARKY_LOGGING_LEVEL"), &config.logging.level),
        Field::new(
            "logging.format",
            Some("SPARKY_LOGGING_FORMAT"),
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("sparky.toml"), PathBuf::from("config/sparky.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, document: Option<&Value>, path: Option<&Path>) -> String {
    if let Some(env_key) = field.env {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if document.is_some_and(|doc| contains_path(doc, field.key)) {
        let file = path.map(|path| path.display().to_string()).unwrap_or_else(|| "config file".to_string());
        return format!("file ({file})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the first four characters of long tokens so operators can tell them apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if trimmed.len() >= 12 => format!("{prefix}***"),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_are_never_printed_in_full() {
        assert_eq!(redact_token("  "), "<empty>");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("adm1n-0123456789"), "adm1***");
    }

    #[test]
    fn nested_keys_are_found_in_toml_documents() {
        let doc = "[server]\nport = 9000\n".parse::<toml::Value>().expect("toml");
        assert!(contains_path(&doc, "server.port"));
        assert!(!contains_path(&doc, "server.bind_address"));
        assert!(!contains_path(&doc, "database.url"));
    }
}
