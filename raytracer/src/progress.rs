//! Progress Reporting

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar template.
const TEMPLATE: &str = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}";

/// Returns a progress bar for `total` units of work, or a hidden one when not
/// `verbose`.
///
/// * `total`   - Total units of work.
/// * `verbose` - Show the bar.
pub fn create_progress_reporter(total: u64, verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total);
    match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => progress.set_style(style.progress_chars("=>-")),
        Err(e) => warn!("Unable to set progress bar style: {e}"),
    }
    progress
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_valid() {
        assert!(ProgressStyle::with_template(TEMPLATE).is_ok());
    }

    #[test]
    fn quiet_reporter_is_hidden() {
        assert!(create_progress_reporter(10, false).is_hidden());
    }
}
