//! Console progress listener: the only place Keystone writes to a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use ks_core::{Command, ProgressListener};

pub struct ConsoleProgress {
    verbose: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, bar: None }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }

    fn clear_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressListener for ConsoleProgress {
    fn segment_starting(&mut self, _target: &str, persistent: usize) {
        self.clear_bar();
        if persistent == 0 {
            return;
        }
        let bar = ProgressBar::new(persistent as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.bar = Some(bar);
    }

    fn segment_finished(&mut self, target: &str) {
        self.clear_bar();
        println!("  \u{2713} {target}");
    }

    fn command_starting(&mut self, command: &Command, message: Option<&str>) {
        if let Some(message) = message {
            self.println(&format!("    {message}"));
        }
        if let Some(bar) = &self.bar {
            if self.verbose {
                let first_line = command.text.lines().next().unwrap_or("");
                bar.set_message(first_line.to_string());
            }
        }
    }

    fn command_finished(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn error(&mut self, message: &str) {
        self.clear_bar();
        eprintln!("  \u{2717} {message}");
    }

    fn status(&mut self, line: &str) {
        self.println(line);
    }
}
