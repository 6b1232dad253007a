//! TOML parser with line-annotated error messages.

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::JoypackConfig;

pub fn parse_joypack_toml(path: &Path) -> Result<JoypackConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_joypack_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_joypack_toml_str(content: &str) -> Result<JoypackConfig> {
    let config: JoypackConfig =
        toml::from_str(content).map_err(|e| annotate_toml_error(e, content))?;
    config.validate()?;
    Ok(config)
}

pub fn to_toml(config: &JoypackConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}

fn annotate_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    match error.span() {
        Some(span) => {
            let prefix = content.get(..span.start).unwrap_or(content);
            let line = prefix.matches('\n').count() + 1;
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line,
                line_context(content, line),
                message
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

fn line_context(content: &str, line: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line.saturating_sub(2);
    let end = (line + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let number = start + i + 1;
            let marker = if number == line { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, number, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_joypack_toml_str("").unwrap();
        assert_eq!(config, JoypackConfig::default());
        assert_eq!(config.package_installer, "brew");
    }

    #[test]
    fn parses_build_overrides() {
        let toml = r#"
env_dir = "~/mcp-env"

[[build_override]]
server = "bamboohr"

[[build_override.step]]
label = "Setup Repository"
program = "git"
args = ["-C", "~/setup", "pull"]

[[build_override.step]]
label = "Tool Install"
program = "uv"
args = ["tool", "install", "{server}"]
"#;
        let config = parse_joypack_toml_str(toml).unwrap();
        assert_eq!(config.env_dir, "~/mcp-env");
        assert_eq!(config.registry_path, crate::config::DEFAULT_REGISTRY_PATH);

        let entry = config.build_override("bamboohr").unwrap();
        assert_eq!(entry.steps.len(), 2);
        assert_eq!(entry.steps[1].args, ["tool", "install", "{server}"]);
        assert!(entry.steps[0].working_dir.is_none());
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = parse_joypack_toml_str("catalog = \"x\"\n[[build_override]\n").unwrap_err();
        assert!(err.to_string().contains("TOML parsing error"));
    }

    #[test]
    fn rejects_override_without_steps() {
        let err = parse_joypack_toml_str("[[build_override]]\nserver = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("declares no steps"));
    }

    #[test]
    fn rejects_empty_installer() {
        assert!(parse_joypack_toml_str("package_installer = \"\"").is_err());
    }

    #[test]
    fn serializes_back_to_toml() {
        let mut config = JoypackConfig::default();
        config.package_client = "windsurf".into();
        let text = to_toml(&config).unwrap();
        let parsed = parse_joypack_toml_str(&text).unwrap();
        assert_eq!(parsed.package_client, "windsurf");
    }
}
