use std::io::{self, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// The stages of a `recognize` run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadPage,
    Recognize,
    WriteOutput,
}

impl Stage {
    const ALL: [Stage; 3] = [Stage::ReadPage, Stage::Recognize, Stage::WriteOutput];

    fn label(self) -> &'static str {
        match self {
            Stage::ReadPage => "Reading page",
            Stage::Recognize => "Recognizing structures",
            Stage::WriteOutput => "Writing output",
        }
    }

    fn ordinal(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).map_or(0, |i| i + 1)
    }
}

/// Stage reporting on stderr. Prints nothing when not attached to a terminal.
pub struct Progress {
    interactive: bool,
    spinner: Option<ProgressBar>,
    started: Instant,
    stage_started: Instant,
}

impl Progress {
    pub fn new(interactive: bool) -> Self {
        let now = Instant::now();
        Self {
            interactive,
            spinner: None,
            started: now,
            stage_started: now,
        }
    }

    pub fn begin(&mut self, stage: Stage) {
        self.clear_spinner();
        self.stage_started = Instant::now();
        if !self.interactive {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .expect("invalid template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message(format!(
            "[{}/{}] {}...",
            stage.ordinal(),
            Stage::ALL.len(),
            stage.label()
        ));
        self.spinner = Some(spinner);
    }

    /// Replaces the spinner with a check line and one dimmed line per detail.
    pub fn done(&mut self, stage: Stage, details: &[String]) {
        self.clear_spinner();
        if !self.interactive {
            return;
        }

        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m {:<44} {:>5.1}s",
            stage.label(),
            self.stage_started.elapsed().as_secs_f64()
        );
        for detail in details {
            let _ = writeln!(stderr, "      \x1b[2m·\x1b[0m {detail}");
        }
    }

    pub fn finish(mut self) {
        self.clear_spinner();
        if self.interactive {
            print_footer(self.started.elapsed());
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn print_footer(elapsed: Duration) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[2m╺━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╸\x1b[0m"
    );
    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[32m✓\x1b[0m Recognition complete {:>29}",
        format!("Total: {:.2}s", elapsed.as_secs_f64())
    );
    let _ = writeln!(stderr);
}
