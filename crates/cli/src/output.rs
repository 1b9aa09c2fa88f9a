// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print console reply lines, or a JSON object carrying them.
pub fn print_lines(command: &str, lines: &[String], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for line in lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "command": command,
                "lines": lines,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}

/// Print a log tail in text or JSON format.
pub fn display_log(
    log_path: &std::path::Path,
    content: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if content.is_empty() {
                eprintln!("No log entries found in {}", log_path.display());
            } else {
                print!("{}", content);
                if !content.ends_with('\n') {
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "log_path": log_path.to_string_lossy(),
                "lines": content.lines().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}
