//! Terminal display width helpers.
//!
//! Width is measured after stripping ANSI escapes so option labels that carry
//! styling still line up inside the listbox rectangle.

use unicode_width::UnicodeWidthChar;

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Fit plain `text` into exactly `width` cells: truncate wide content, pad
/// short content with spaces.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);

    let full = display_width(&clean_str);
    if full <= width {
        return format!("{}{}", clean_str, " ".repeat(width - full));
    }

    let mut fitted = String::new();
    let mut used = 0;
    for ch in clean_str.chars() {
        let cells = ch.width().unwrap_or(0);
        if used + cells > width {
            break;
        }
        fitted.push(ch);
        used += cells;
    }
    while used < width {
        fitted.push(' ');
        used += 1;
    }
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_ignores_ansi_styling() {
        assert_eq!(display_width("\x1b[1mBold\x1b[0m"), 4);
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit_to_width("ab", 4), "ab  ");
        assert_eq!(fit_to_width("abcdef", 3), "abc");
    }

    #[test]
    fn fit_never_splits_wide_characters() {
        let fitted = fit_to_width("日本語", 5);
        assert_eq!(fitted, "日本 ");
        assert_eq!(display_width(&fitted), 5);
    }
}
