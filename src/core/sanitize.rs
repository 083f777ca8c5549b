//! Input sanitization for user-authored text
//!
//! Transcript content is later rendered and exported as trusted text, so
//! anything capable of script execution is stripped before it enters the
//! log. The provider's responses are trusted and never pass through here;
//! only the user's input does.

/// Strip markup from raw user input.
///
/// Trims surrounding whitespace and removes HTML tag constructs. Stripping
/// repeats until a fixed point so reassembled tags (`<scr<script>ipt>`) do
/// not survive a single pass, which also makes the function idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    loop {
        let stripped = strip_tags(&text);
        if stripped == text {
            break;
        }
        text = stripped;
    }
    text.trim().to_string()
}

/// Remove one layer of tag constructs.
///
/// A `<` opens a tag only when followed by an ASCII letter, `/`, `!` or `?`
/// (the HTML5 tag-open rule), so comparisons like `a < b` survive. An
/// unterminated tag runs to the end of the input and is dropped.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((idx, ch)) = chars.next() {
        if ch != '<' {
            out.push(ch);
            continue;
        }
        let opens_tag = input[idx + 1..]
            .chars()
            .next()
            .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?'));
        if !opens_tag {
            out.push(ch);
            continue;
        }
        for (_, inner) in chars.by_ref() {
            if inner == '>' {
                break;
            }
        }
    }

    out
}
