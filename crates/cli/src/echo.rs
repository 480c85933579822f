use owo_colors::OwoColorize;
use stash_core::ArticleRecord;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Stash".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Save web pages as readable articles\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print a labelled value, indented under the current step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print the record fields that are not part of the body
pub fn print_record_summary(record: &ArticleRecord) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Article".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    print_detail("Title", &record.title);
    if let Some(author) = &record.author {
        print_detail("Author", author);
    }
    if let Some(site) = &record.site_name {
        print_detail("Site", site);
    }
    if let Some(image) = &record.thumbnail_url {
        print_detail("Image", image);
    }
    print_detail("Words", &record.word_count.to_string());
    print_detail("Reading time", &format!("{} min", record.reading_time_minutes));
    eprintln!();
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
