use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a per-file pass, or a hidden one when progress output is off
pub fn file_progress(len: usize, message: &'static str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress_bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    progress_bar.set_style(style);
    progress_bar.set_message(message);
    progress_bar
}
