//! Terminal progress bars.

use indicatif::{ProgressBar, ProgressStyle};

const ITEMS_TEMPLATE: &str =
    "{spinner:.green} [{prefix}] [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";
const BYTES_TEMPLATE: &str =
    "{spinner:.green} [{prefix}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";

/// Create a progress bar with the given length and label.
///
/// A hidden bar is returned when `visible` is false, so callers can advance
/// it unconditionally. The label goes through `{prefix}`, never into the
/// template itself.
pub fn create_progress_bar(len: u64, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    styled(ProgressBar::new(len), ITEMS_TEMPLATE, label)
}

/// Byte-count variant used for downloads.
pub fn create_bytes_bar(len: Option<u64>, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = match len {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    styled(pb, BYTES_TEMPLATE, label)
}

fn styled(pb: ProgressBar, template: &str, label: &str) -> ProgressBar {
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_prefix(label.to_string());
    pb
}
