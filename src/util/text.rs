use std::borrow::Cow;

/// Marker appended to truncated summaries.
pub const ELLIPSIS: &str = "...";

/// Returns the first `max_chars` Unicode scalar values of `s`.
///
/// Counts `char`s rather than bytes so multi-byte text is never split
/// mid-codepoint. Borrows when the input already fits.
///
/// # Examples
///
/// ```
/// use feedboard::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Hello World", 5), "Hello");
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(s[..cut].to_owned()),
        None => Cow::Borrowed(s),
    }
}

/// Collapses every run of whitespace into a single space and trims both ends.
///
/// Text pulled out of HTML keeps the source's indentation and line breaks;
/// summaries are rendered on a single line.
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let already_clean = !s.starts_with(char::is_whitespace)
        && !s.ends_with(char::is_whitespace)
        && !s
            .chars()
            .zip(s.chars().skip(1))
            .any(|(a, b)| a.is_whitespace() && (b.is_whitespace() || a != ' '));

    if already_clean {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Strips terminal control characters and ANSI escape sequences.
///
/// Feed titles and summaries are attacker-controlled and end up printed to a
/// terminal by the CLI. Removes:
/// - C0 controls other than tab, newline and carriage return, plus DEL
/// - CSI sequences (`ESC [` ... final byte in `@`..=`~`)
/// - OSC sequences (`ESC ]` ... terminated by BEL or `ESC \`)
/// - any other bare ESC
///
/// Returns `Cow::Borrowed` when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            if !is_stripped_control(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

fn is_stripped_control(c: char) -> bool {
    c == '\x1b' || c == '\x7f' || (c < '\x20' && !matches!(c, '\t' | '\n' | '\r'))
}
