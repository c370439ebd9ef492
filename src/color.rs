//! ANSI styling for the prompt and error messages.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const BLUE: &str = "\x1b[34m";

/// Wraps `text` in the given styles followed by a reset.
pub fn paint(text: &str, styles: &[&str]) -> String {
    let mut out = styles.concat();
    out.push_str(text);
    out.push_str(RESET);
    out
}

/// Paints only when `enabled`.
pub fn paint_if(enabled: bool, text: &str, styles: &[&str]) -> String {
    if enabled {
        paint(text, styles)
    } else {
        text.to_string()
    }
}
