//! Math keyboard input.
//!
//! On-screen keys carry display glyphs; the grader expects ASCII operators
//! and LaTeX commands. Mapping happens once, when a symbol enters a buffer.

/// Text a keyboard symbol inserts.
#[must_use]
pub fn map_symbol(symbol: &str) -> &str {
    match symbol {
        "×" => "*",
        "÷" => "/",
        "φ" | "varphi" => "\\varphi",
        other => other,
    }
}

/// Append a keyboard symbol to an input buffer.
pub fn insert_symbol(buffer: &mut String, symbol: &str) {
    buffer.push_str(map_symbol(symbol));
}

/// Map every keyboard glyph in pasted or typed text.
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let mut tmp = [0_u8; 4];
        insert_symbol(&mut out, ch.encode_utf8(&mut tmp));
    }
    out
}

#[cfg(test)]
#[path = "keyboard_test.rs"]
mod tests;
