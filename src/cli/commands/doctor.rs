//! Doctor command - verify credentials, ffmpeg and directories.

use crate::cli::Output;
use crate::config::{Credentials, GatewayConfig, Settings};
use crate::gateway::{ProviderId, TaskKind};
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, credentials: &Credentials, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Muse Doctor");
    println!();
    println!("Checking providers, tools and directories...\n");

    let mut checks = Vec::new();

    let sections = [
        ("Providers", check_providers(settings, credentials)),
        ("Text fallback", check_fallback(settings, credentials)),
        ("External Tools", vec![check_tool("ffmpeg", &settings.video.ffmpeg_path)]),
        ("Directories", vec![check_output_dir(&settings.output_dir())]),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    for (title, results) in sections {
        if results.is_empty() {
            continue;
        }
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Operations using those providers will fail.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Muse is ready to use.");
    }

    Ok(())
}

/// One check per task kind: is its provider usable?
fn check_providers(settings: &Settings, credentials: &Credentials) -> Vec<CheckResult> {
    let config = match GatewayConfig::from_settings(settings, credentials) {
        Ok(config) => config,
        Err(e) => {
            return vec![CheckResult::error(
                "Provider selection",
                &e.to_string(),
                "Fix the provider names in the config file",
            )]
        }
    };

    TaskKind::ALL
        .iter()
        .map(|kind| {
            let provider = config.for_kind(*kind);
            let name = format!("{} ({}, {})", kind, provider.provider, provider.model);
            credential_check(&name, provider.provider, credentials)
        })
        .collect()
}

/// Fallback providers only need a key; a missing one is a warning.
fn check_fallback(settings: &Settings, credentials: &Credentials) -> Vec<CheckResult> {
    settings
        .text
        .fallback
        .iter()
        .map(|provider| {
            let check = credential_check(&provider.to_string(), *provider, credentials);
            match check.status {
                CheckStatus::Error => CheckResult {
                    status: CheckStatus::Warning,
                    ..check
                },
                _ => check,
            }
        })
        .collect()
}

fn credential_check(name: &str, provider: ProviderId, credentials: &Credentials) -> CheckResult {
    let Some(var) = provider.credential_env() else {
        return CheckResult::ok(name, "no credential needed");
    };
    match credentials.key(provider) {
        Some(key) => CheckResult::ok(name, &format!("{} configured ({})", var, key.masked())),
        None => CheckResult::error(
            name,
            &format!("{} not set", var),
            &format!("Set with: export {}='...' (or add it to .env)", var),
        ),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, binary: &str) -> CheckResult {
    match Command::new(binary).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", install_hint_ffmpeg()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, &format!("'{}' not found", binary), install_hint_ffmpeg())
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), install_hint_ffmpeg()),
    }
}

fn check_output_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::ok("Output directory", &dir.display().to_string())
    } else if dir.exists() {
        CheckResult::error(
            "Output directory",
            &format!("{} is not a directory", dir.display()),
            "Point general.output_dir at a directory",
        )
    } else {
        CheckResult::warning(
            "Output directory",
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first use",
        )
    }
}

fn check_config_file(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::ok("Config file", &path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: muse config edit",
        )
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn credentials(vars: &[(&str, &str)]) -> Credentials {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Credentials::from_lookup(|name| {
            vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_providers_report_missing_keys() {
        let settings = Settings::default();
        let creds = credentials(&[("OPENAI_API_KEY", "sk-test-0123456789abcdef")]);
        let checks = check_providers(&settings, &creds);

        assert_eq!(checks.len(), 4);
        // deepseek text provider has no key
        assert_eq!(checks[0].status, CheckStatus::Error);
        assert!(checks[0].message.contains("DEEPSEEK_API_KEY"));
        assert_eq!(checks[1].status, CheckStatus::Ok);
        assert!(checks[1].message.contains("sk-te...cdef"));
        assert!(!checks[1].message.contains("0123456789"));
        // ffmpeg renderer
        assert_eq!(checks[3].message, "no credential needed");
    }

    #[test]
    fn test_fallback_missing_key_is_warning() {
        let mut settings = Settings::default();
        settings.text.fallback = vec![ProviderId::Anthropic];
        let checks = check_fallback(&settings, &credentials(&[]));
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Warning);
    }

    #[test]
    fn test_missing_tool() {
        let check = check_tool("ffmpeg", "/nonexistent/ffmpeg-binary");
        assert_eq!(check.status, CheckStatus::Error);
        assert!(check.message.contains("not found"));
    }

    #[test]
    fn test_output_dir_and_config_file() {
        let dir = tempdir().unwrap();
        assert_eq!(check_output_dir(dir.path()).status, CheckStatus::Ok);
        assert_eq!(check_output_dir(&dir.path().join("later")).status, CheckStatus::Warning);

        let config = dir.path().join("config.toml");
        assert_eq!(check_config_file(&config).status, CheckStatus::Warning);
        std::fs::write(&config, "").unwrap();
        assert_eq!(check_config_file(&config).status, CheckStatus::Ok);
    }
}
