//! `%s` substitution for OTP message templates.

/// Substitute `code` into `template`.
///
/// The first `%s` is replaced with the code and `%%` yields a literal `%`.
/// Later `%s` occurrences are kept verbatim. An empty template renders the
/// bare code; a template without a placeholder gets the code appended
/// after a space so it is never dropped.
pub fn render(template: &str, code: &str) -> String {
    if template.is_empty() {
        return code.to_owned();
    }

    let mut out = String::with_capacity(template.len().saturating_add(code.len()));
    let mut substituted = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') if !substituted => {
                chars.next();
                out.push_str(code);
                substituted = true;
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    if !substituted {
        out.push(' ');
        out.push_str(code);
    }
    out
}
