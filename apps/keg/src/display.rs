//! Output rendering and formatting

use crate::events::format_size;
use console::{Style, Term};
use keg_types::{ColorChoice, InstallReport, Reproducibility, SpecSummary};
use std::io;

/// Final result of a command
pub enum CommandOutput {
    Installed(InstallReport),
    Summary(SpecSummary),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result on stdout
    pub fn render_result(&self, result: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let json = match result {
                CommandOutput::Installed(report) => serde_json::to_string_pretty(report),
                CommandOutput::Summary(summary) => serde_json::to_string_pretty(summary),
            }
            .map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandOutput::Installed(report) => self.render_install_report(report),
            CommandOutput::Summary(summary) => self.render_summary(summary),
        }
    }

    fn render_install_report(&self, report: &InstallReport) -> io::Result<()> {
        println!(
            "Installed {} {}",
            self.style_package_name(&report.name),
            report.version
        );
        println!("  path:    {}", report.path.display());
        println!("  mode:    {:04o}", report.mode);
        println!("  size:    {}", format_size(report.size));
        println!("  {}:  {}", report.algorithm, report.digest);
        if let Reproducibility::Unpinned { reason } = &report.reproducibility {
            println!("  {}", self.style_warning(&format!("unpinned: {reason}")));
        }
        println!("Completed in {}ms", report.duration_ms);

        if self.term.is_term() {
            show_path_reminder_if_needed(report);
        }
        Ok(())
    }

    fn render_summary(&self, summary: &SpecSummary) -> io::Result<()> {
        println!(
            "{} {}",
            self.style_package_name(&summary.name),
            summary.version
        );
        if let Some(description) = &summary.description {
            println!("  {description}");
        }
        if let Some(homepage) = &summary.homepage {
            println!("  homepage:     {homepage}");
        }
        println!("  source:       {}", summary.source);
        println!("  digest:       {}", summary.expected_digest);
        if !summary.build_dependencies.is_empty() {
            println!("  needs:        {}", summary.build_dependencies.join(", "));
        }
        println!("  build:        {}", summary.build_command);
        println!(
            "  installs to:  {} ({:04o})",
            summary.target.display(),
            summary.mode
        );
        match &summary.reproducibility {
            Reproducibility::Pinned => println!("  reproducible: yes"),
            Reproducibility::Unpinned { reason } => {
                println!("  reproducible: {}", self.style_warning(&format!("no, {reason}")));
            }
        }
        Ok(())
    }

    fn style_package_name(&self, name: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(name).to_string()
        } else {
            name.to_string()
        }
    }

    fn style_warning(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().yellow().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

/// Show PATH reminder if the install directory is not on PATH
fn show_path_reminder_if_needed(report: &InstallReport) {
    let Some(bin_dir) = report.path.parent() else {
        return;
    };
    let path = std::env::var_os("PATH").unwrap_or_default();
    if std::env::split_paths(&path).any(|p| p == bin_dir) {
        return;
    }
    eprintln!();
    eprintln!(
        "Add {} to your PATH to use {}:",
        bin_dir.display(),
        report.name
    );
    eprintln!("   export PATH=\"{}:$PATH\"", bin_dir.display());
}
