//! Shared CLI helpers — response printing, banner, status marks.

use colored::Colorize;

/// Print an assistant reply to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "🌾 AgriSight".green().bold());
    if response.trim().is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the banner shown at REPL start.
pub fn print_banner(user: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🌾 AgriSight".green().bold(), version.dimmed());
    println!(
        "{}",
        format!("Chatting as \"{user}\". Type a message, \"/image PATH [question]\" to send a photo, or \"exit\" to quit.")
            .dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// A green check or a dimmed "not configured" marker.
pub fn mark(configured: bool, detail: &str) -> String {
    if configured {
        format!("{} {}", "✓".green(), detail)
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_configured() {
        colored::control::set_override(false);
        assert_eq!(mark(true, "(key set)"), "✓ (key set)");
        assert_eq!(mark(false, "(key set)"), "· not configured");
    }
}
