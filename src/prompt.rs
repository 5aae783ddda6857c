//! Console front end: dialoguer prompts and an indicatif progress bar

use core_transfer::{Prompter, Reporter, SelectionError, TracingReporter, TransferEvent};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} {wide_msg}";

/// Prompts on the terminal
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for ConsolePrompter {
    fn show(&mut self, text: &str) {
        print!("{}", text);
    }

    fn ask(&mut self, prompt: &str) -> Result<String, SelectionError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| SelectionError::Input(e.to_string()))
    }

    fn reject(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Progress bar over the items of a run, logging through tracing as well
pub struct ProgressReporter {
    bar: ProgressBar,
    log: TracingReporter,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self {
            bar,
            log: TracingReporter,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ProgressReporter {
    fn report(&self, event: &TransferEvent) {
        match event {
            TransferEvent::ItemsDiscovered { count } => self.bar.set_length(*count as u64),
            TransferEvent::ItemStarted { name, .. } => self.bar.set_message(name.clone()),
            TransferEvent::ItemFinished { .. } => self.bar.inc(1),
            TransferEvent::RunFinished { .. } => self.bar.finish_and_clear(),
            _ => {}
        }

        self.bar.suspend(|| self.log.report(event));
    }
}
