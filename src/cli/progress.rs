//! Progress bar, affordance and summary reporting for the CLI.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Affordance, TaskRegistry, TaskStatus, format_duration, format_percent, format_speed,
};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Resolution of the total bar; one unit is a hundredth of a percent.
const BAR_LENGTH: u64 = 10_000;

/// Creates the bar that tracks the registry's total progress.
pub fn make_total_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(BAR_LENGTH);
    bar.set_style(
        ProgressStyle::with_template("Total [{bar:40.green/white}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━━╌"),
    );
    bar
}

/// Moves the total bar to the registry's current aggregates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn update_total_bar(bar: &ProgressBar, registry: &TaskRegistry) {
    let percent = registry.total_progress();
    bar.set_position(((percent * 100.0) as u64).min(BAR_LENGTH));
    bar.set_message(format!(
        "{} @ {} - {} file(s) left, {} active",
        format_percent(percent),
        format_speed(registry.total_speed()),
        registry.total_remaining(),
        registry.active_task_count(),
    ));
}

/// Prints the show/hide transitions of the "in progress" indicator above the
/// total bar.
pub struct TerminalAffordance {
    bar: ProgressBar,
}

impl TerminalAffordance {
    pub const fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Affordance for TerminalAffordance {
    fn set_visible(&self, visible: bool) {
        let line = if visible {
            style("▶ downloads in progress").cyan().to_string()
        } else {
            style("✔ all downloads finished").green().bold().to_string()
        };
        self.bar.println(line);
    }
}

/// Prints one line per task plus the registry totals.
pub fn print_summary(registry: &TaskRegistry) {
    if registry.is_empty() {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Task Summary");
    println!("{SEPARATOR}");

    for task in registry.tasks() {
        let status = match task.status() {
            TaskStatus::Completed => style(task.status().label()).green(),
            TaskStatus::Failed => style(task.status().label()).red(),
            TaskStatus::Running => style(task.status().label()).yellow(),
            TaskStatus::Pending => style(task.status().label()).dim(),
        };
        let elapsed = task
            .finished_at()
            .and_then(|finished| (finished - task.created_at()).to_std().ok())
            .map_or_else(|| "-".to_string(), format_duration);
        println!(
            "  #{:<3} {:<24} {:<10} {:>7}  {}",
            task.id(),
            task.name(),
            status,
            format_percent(task.progress() * 100.0),
            elapsed,
        );
    }

    println!("{SEPARATOR}");
    println!(
        "  Total progress:    {}",
        format_percent(registry.total_progress())
    );
    println!("  Files remaining:   {}", registry.total_remaining());
    println!("  Active tasks:      {}", registry.active_task_count());
    println!("{SEPARATOR}");
}
