pub mod config;
pub mod load;

use anyhow::Result;
use comfy_table::{Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OutputContext {
    pub json: bool,
    pub verbose: bool,
}

/// Creates a spinner with the given message
pub fn create_spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Creates a progress bar with the given length
pub fn create_progress_bar(len: u64, message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▓▒░"),
    );
    pb.set_message(message.to_string());
    Ok(pb)
}

impl OutputContext {
    pub fn print_table(&self, title: &str, columns: &[&str], rows: Vec<Vec<String>>) {
        use colored::Colorize;

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(columns.to_vec());
        for row in rows {
            table.add_row(row);
        }
        println!("{}", title.bold());
        println!("{table}");
    }

    pub fn print_json<T: serde::Serialize>(&self, data: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(data)?);
        Ok(())
    }

    pub fn print_success(&self, message: &str) {
        use colored::Colorize;
        if !self.json {
            println!("{} {}", "✓".green(), message);
        }
    }

    pub fn print_error(&self, message: &str) {
        use colored::Colorize;
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn print_info(&self, message: &str) {
        use colored::Colorize;
        if self.verbose && !self.json {
            println!("{} {}", "ℹ".blue(), message);
        }
    }
}
