//! Sanitization of scraped text before it reaches a terminal.
//!
//! Titles and error messages come straight from remote HTML and may carry
//! ANSI escape sequences or control characters. Anything echoed to the
//! console goes through here first.

use std::borrow::Cow;
use std::iter::Peekable;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Strip ANSI escape sequences and control characters except `\n`, `\t`, `\r`.
///
/// Returns `Cow::Borrowed` when the input is already clean.
#[must_use]
pub fn sanitize_terminal_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_unsafe) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESC {
            skip_escape_sequence(&mut chars);
        } else if c == '\u{009b}' {
            skip_csi_params(&mut chars);
        } else if !is_unsafe(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Sanitize a title for a one-line progress message, keeping at most
/// `max_chars` characters.
#[must_use]
pub fn display_title(title: &str, max_chars: usize) -> String {
    sanitize_terminal_text(title)
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(max_chars)
        .collect()
}

fn is_unsafe(c: char) -> bool {
    let c0 = c <= '\x1f' && !matches!(c, '\n' | '\t' | '\r');
    let c1 = ('\u{0080}'..='\u{009f}').contains(&c);
    c0 || c1 || c == '\x7f'
}

fn skip_escape_sequence<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    match chars.peek() {
        Some('[') => {
            chars.next();
            skip_csi_params(chars);
        }
        Some(']') => {
            chars.next();
            skip_string_sequence(chars, true);
        }
        Some('P' | '^' | '_') => {
            chars.next();
            skip_string_sequence(chars, false);
        }
        Some('(' | ')' | '*' | '+' | '#' | ' ') => {
            chars.next();
            chars.next();
        }
        Some('7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<') => {
            chars.next();
        }
        _ => {}
    }
}

/// CSI: parameter/intermediate bytes (0x20-0x3F) then one final byte (0x40-0x7E).
fn skip_csi_params<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(&c) = chars.peek() {
        if ('\x40'..='\x7e').contains(&c) {
            chars.next();
            return;
        }
        if !('\x20'..='\x3f').contains(&c) {
            return;
        }
        chars.next();
    }
}

/// OSC/DCS/PM/APC bodies end at ST (`ESC \`); OSC may also end at BEL.
fn skip_string_sequence<I: Iterator<Item = char>>(chars: &mut Peekable<I>, bel_ends: bool) {
    while let Some(c) = chars.next() {
        if bel_ends && c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}
