//! Interactive collection of environment values.
//!
//! Prompts for every variable in a server's schema, pre-filled with the
//! saved or default value. Uses dialoguer for terminal UI prompts.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};

use joypack_core::types::{EnvSchema, EnvValues, EnvVarKind, EnvVarSpec};

/// Prompts for a server's environment variables.
pub struct EnvForm<'a, W: Write = io::Stdout> {
    title: &'a str,
    schema: &'a EnvSchema,
    current: EnvValues,
    writer: W,
    theme: ColorfulTheme,
}

impl<'a> EnvForm<'a, io::Stdout> {
    pub fn new(title: &'a str, schema: &'a EnvSchema, current: EnvValues) -> Self {
        Self::with_writer(title, schema, current, io::stdout())
    }
}

impl<'a, W: Write> EnvForm<'a, W> {
    /// Create a form with a custom writer (for testing).
    pub fn with_writer(
        title: &'a str,
        schema: &'a EnvSchema,
        current: EnvValues,
        writer: W,
    ) -> Self {
        Self {
            title,
            schema,
            current,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for each variable in schema order.
    pub fn collect(mut self) -> Result<EnvValues> {
        self.print_header()?;
        if self.schema.is_empty() {
            writeln!(self.writer, "  No environment variables required.")?;
            return Ok(self.current);
        }

        let mut values = EnvValues::new();
        for (name, spec) in self.schema.iter() {
            self.print_hint(spec)?;
            let current = self.current.get(name).unwrap_or_default().to_string();
            let value = match spec.kind {
                EnvVarKind::Password => self.prompt_password(name, &current)?,
                EnvVarKind::Boolean => self.prompt_boolean(name, &current)?,
                EnvVarKind::String => self.prompt_string(name, &current)?,
            };
            values.insert(name, value);
        }
        Ok(values)
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{}",
            style(format!("  Configure {}", self.title)).bold().cyan()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_hint(&mut self, spec: &EnvVarSpec) -> Result<()> {
        if let Some(description) = &spec.description {
            writeln!(self.writer, "  {}", style(description).dim())?;
        }
        if let Some(url) = &spec.docs_url {
            writeln!(self.writer, "  {}", style(url).underlined().dim())?;
        }
        Ok(())
    }

    fn prompt_password(&self, name: &str, current: &str) -> Result<String> {
        let prompt = if current.is_empty() {
            name.to_string()
        } else {
            format!("{name} (leave empty to keep {})", mask_value(current))
        };
        let entered = Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(if entered.is_empty() {
            current.to_string()
        } else {
            entered
        })
    }

    fn prompt_boolean(&self, name: &str, current: &str) -> Result<String> {
        let enabled = Confirm::with_theme(&self.theme)
            .with_prompt(name)
            .default(parse_bool(current))
            .interact()?;
        Ok(enabled.to_string())
    }

    fn prompt_string(&self, name: &str, current: &str) -> Result<String> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(name)
            .with_initial_text(current)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }
}

/// Hide all but the last four characters.
pub fn mask_value(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
