//! Pure formatting helpers for page variable values.
//!
//! Nothing here touches the variable store, so every function can be tested
//! in isolation.

/// Separator between segments of a multi-valued page variable
pub const SEGMENT_SEPARATOR: char = '|';

/// Join items with `|` after making each one safe to embed.
///
/// Absent items become empty segments. Inside a present item every `|` is
/// replaced by a space, so the separator never appears inside a segment, and
/// the result is escaped for a double-quoted JavaScript string literal.
///
/// ```
/// use salecycle::encoding::pipeline;
///
/// let joined = pipeline([Some("Harry"), None, Some("a|b")]);
/// assert_eq!(joined, "Harry||a b");
/// ```
pub fn pipeline<I, S>(items: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            out.push(SEGMENT_SEPARATOR);
        }
        if let Some(item) = item {
            let cleaned = item.as_ref().replace(SEGMENT_SEPARATOR, " ");
            out.push_str(&escape_js_string(&cleaned));
        }
    }
    out
}

/// Escape a string for use inside a JavaScript string literal.
///
/// Quotes, backslashes and control characters get their usual escapes.
/// `<`, `>` and `&` become unicode escapes so the value cannot close the
/// surrounding `<script>` element. U+0085, U+2028 and U+2029 are escaped too,
/// since older engines treat them as line terminators inside a literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '<' | '>' | '&' => push_unicode_escape(&mut out, ch),
            '\u{85}' | '\u{2028}' | '\u{2029}' => push_unicode_escape(&mut out, ch),
            c if c.is_control() && (c as u32) < 0x20 => push_unicode_escape(&mut out, c),
            _ => out.push(ch),
        }
    }
    out
}

fn push_unicode_escape(out: &mut String, ch: char) {
    out.push_str(&format!("\\u{:04x}", ch as u32));
}

/// Format an amount with exactly two decimals, rounding half away from zero.
///
/// Rounding works on the shortest decimal representation of `amount`, the
/// digits a caller wrote as a literal, so `0.285` becomes `0.29` even though
/// the nearest `f64` lies just below it.
///
/// Callers are expected to reject non-finite amounts first.
///
/// ```
/// use salecycle::encoding::format_amount;
///
/// assert_eq!(format_amount(1.005), "1.01");
/// assert_eq!(format_amount(-2.5), "-2.50");
/// ```
pub fn format_amount(amount: f64) -> String {
    // Display for f64 never uses exponent notation
    let repr = amount.abs().to_string();
    let (whole, fraction) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut cents: Vec<u8> = whole.bytes().collect();
    let mut fraction_digits = fraction.bytes();
    for _ in 0..2 {
        cents.push(fraction_digits.next().unwrap_or(b'0'));
    }
    if fraction_digits.next().is_some_and(|digit| digit >= b'5') {
        round_up_digits(&mut cents);
    }

    let (whole, fraction) = cents.split_at(cents.len() - 2);
    let is_zero = cents.iter().all(|&digit| digit == b'0');
    let sign = if amount.is_sign_negative() && !is_zero { "-" } else { "" };
    format!(
        "{sign}{}.{}",
        String::from_utf8_lossy(whole),
        String::from_utf8_lossy(fraction)
    )
}

/// Add one to a run of ASCII decimal digits
fn round_up_digits(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Append a segment to an accumulator value.
///
/// The first segment becomes the value itself; later ones are joined as
/// `existing|segment`.
pub fn append_segment(existing: Option<&str>, segment: &str) -> String {
    match existing {
        None => segment.to_string(),
        Some(existing) => format!("{existing}{SEGMENT_SEPARATOR}{segment}"),
    }
}
