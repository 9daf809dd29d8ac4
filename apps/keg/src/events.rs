//! Event handling and progress display

use console::{style, Term};
use keg_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent, StageEvent};

/// Renders install events on stderr as they arrive
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppresses everything except warnings (used with `--json`)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        crate::logging::log_event_with_tracing(&event);

        if let Some(line) = self.format_event(&event) {
            let _ = self.term.write_line(&line);
        }
    }

    /// Text shown for `event`, or `None` if it is not displayed
    fn format_event(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                let mut line = format!("{} {message}", self.paint_warning("warning:"));
                if let Some(context) = context {
                    line.push_str(&format!("\n  {context}"));
                }
                Some(line)
            }
            AppEvent::General(GeneralEvent::DebugLog { message }) => {
                (self.debug_enabled && !self.quiet).then(|| format!("debug: {message}"))
            }
            _ if self.quiet => None,

            AppEvent::Stage(StageEvent::Started { stage, package }) => {
                Some(format!("{} {stage} {package}", self.paint_arrow("==>")))
            }
            AppEvent::Stage(StageEvent::Completed {
                stage, duration_ms, ..
            }) => self
                .debug_enabled
                .then(|| format!("    {stage} finished in {duration_ms}ms")),
            // Details are printed once, by the final error report
            AppEvent::Stage(StageEvent::Failed { stage, .. }) => {
                Some(format!("{} {stage} failed", self.paint_error("error:")))
            }

            AppEvent::Download(DownloadEvent::Started { url, total_size }) => {
                let filename = url.rsplit('/').next().unwrap_or(url);
                Some(match total_size {
                    Some(total) => format!("    downloading {filename} ({})", format_size(*total)),
                    None => format!("    downloading {filename}"),
                })
            }
            AppEvent::Download(DownloadEvent::Completed { final_size, .. }) => {
                Some(format!("    downloaded {}", format_size(*final_size)))
            }
            AppEvent::Download(DownloadEvent::Retrying {
                attempt,
                max_attempts,
                reason,
                ..
            }) => Some(format!(
                "    retrying download ({attempt}/{max_attempts}): {reason}"
            )),
            AppEvent::Download(DownloadEvent::Progress { .. }) => None,

            AppEvent::Build(BuildEvent::CommandStarted { command, .. }) => {
                Some(format!("    $ {command}"))
            }
            AppEvent::Build(BuildEvent::CommandFinished {
                exit_code,
                duration_ms,
                ..
            }) => self.debug_enabled.then(|| match exit_code {
                Some(code) => format!("    toolchain exited with {code} after {duration_ms}ms"),
                None => format!("    toolchain killed after {duration_ms}ms"),
            }),
        }
    }

    fn paint_arrow(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).blue().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_warning(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_error(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).red().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Format byte size in human readable format
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0} {}", UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}
