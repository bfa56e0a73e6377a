//! Plugin configuration loading.
//!
//! The YAML file lists the services offered by `discover`. Values may use
//! `${VAR}` or `${VAR:-default}` environment substitution.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use layer_source::PluginConfig;
use tracing::{debug, info};

/// Load the plugin configuration, or the built-in defaults without a path.
pub fn load_plugin_config(path: Option<&Path>) -> Result<PluginConfig> {
    let Some(path) = path else {
        debug!("No config file, using default services");
        return Ok(PluginConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let expanded = expand_env_vars(&content)?;
    let config = PluginConfig::from_yaml(&expanded)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    info!(
        path = %path.display(),
        services = config.urls.len(),
        "Loaded plugin config"
    );
    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// `VAR` must be set; `VAR:-default` falls back when unset or empty.
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}
