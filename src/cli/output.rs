//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print course summary info.
    pub fn course_info(title: &str, instructor: Option<&str>, lessons: u32, chunks: u32) {
        let instructor_part = instructor
            .map(|i| format!(", {}", i))
            .unwrap_or_default();
        println!(
            "  {} {} ({} lessons, {} chunks{})",
            style("*").cyan(),
            style(title).bold(),
            lessons,
            chunks,
            instructor_part
        );
    }

    /// Print a search result.
    pub fn search_result(label: &str, score: f32, content: &str, link: Option<&str>) {
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(label).bold(),
            score
        );
        println!("   {}", content_preview(content, 200));
        if let Some(l) = link {
            println!("   {}", style(l).dim());
        }
    }

    /// Print a citation source line.
    pub fn source(label: &str, link: Option<&str>) {
        match link {
            Some(l) => println!("  {} {} ({})", style("*").cyan(), label, style(l).dim()),
            None => println!("  {} {}", style("*").cyan(), label),
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    if content.len() <= max_len {
        content
    } else {
        format!("{}...", &content[..max_len])
    }
}
