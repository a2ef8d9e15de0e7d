use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} rows scored ({per_sec})";

/// Console feedback for a scoring run: a spinner counting rows and, unless
/// quiet, one block per classified row.
pub(crate) struct ProgressTracker {
    progress_bar: ProgressBar,
    quiet: bool,
}

impl ProgressTracker {
    pub(crate) fn new(quiet: bool) -> Self {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        Self {
            progress_bar,
            quiet,
        }
    }

    pub(crate) fn row(&self, text: &str, label: &str, confidence: &str) {
        if !self.quiet {
            // suspend() also prints when the bar is hidden (stdout is not a tty)
            self.progress_bar.suspend(|| {
                println!("Review: {text}");
                println!("Predicted Sentiment: {label} ({confidence})");
            });
        }
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }

    pub(crate) fn abandon(&self) {
        self.progress_bar.abandon();
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.progress_bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_advance_position() {
        let tracker = ProgressTracker::new(true);
        tracker.row("great product", "POSITIVE", "97.00%");
        tracker.row("terrible", "NEGATIVE", "88.00%");
        assert_eq!(tracker.position(), 2);
        tracker.finish();
    }
}
