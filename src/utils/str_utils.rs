/*
 * String predicates, case-insensitive comparison and splitting helpers.
 * Case folding is Unicode lowercase, compared character by character.
 */

const DIACRITICS: &str = "ÀàÁáÂâÃãÄäÈèÉéÊêËëÌìÍíÎîÏïÒòÓóÔôÕõÖöÙùÚúÛûÜüÇçÅåÐðÑñØøÝý";
const REPLACEMENTS: &str = "AaAaAaAaAaEeEeEeEeIiIiIiIiOoOoOoOoOoUuUuUuUuCcAaDdNnOoYy";

fn chars_eqi(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

// Length in bytes of the prefix of `s` matching `what` case-insensitively.
fn prefix_len_i(s: &str, what: &str) -> Option<usize> {
    let mut len = 0;
    let mut chars = s.chars();
    for w in what.chars() {
        let c = chars.next()?;
        if !chars_eqi(c, w) {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Case sensitive. Empty strings never match.
pub fn begins_with(s: &str, what: &str) -> bool {
    !s.is_empty() && !what.is_empty() && s.starts_with(what)
}

pub fn begins_withi(s: &str, what: &str) -> bool {
    !s.is_empty() && !what.is_empty() && prefix_len_i(s, what).is_some()
}

/// Case sensitive. Empty strings never match.
pub fn ends_with(s: &str, what: &str) -> bool {
    !s.is_empty() && !what.is_empty() && s.ends_with(what)
}

pub fn ends_withi(s: &str, what: &str) -> bool {
    if s.is_empty() || what.is_empty() {
        return false;
    }
    let n = what.chars().count();
    let mut tail = s.chars().rev().take(n).collect::<Vec<_>>();
    if tail.len() < n {
        return false;
    }
    tail.reverse();
    tail.into_iter().zip(what.chars()).all(|(a, b)| chars_eqi(a, b))
}

pub fn eqi(s: &str, what: &str) -> bool {
    s.chars().count() == what.chars().count()
        && s.chars().zip(what.chars()).all(|(a, b)| chars_eqi(a, b))
}

/// Signed integer text: an optional leading minus, then digits; blanks allowed.
pub fn is_int(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit() || is_blank(ch))
}

pub fn is_uint(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|ch| ch.is_ascii_digit() || is_blank(ch))
}

pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|ch| ch.is_ascii_hexdigit() || is_blank(ch))
}

/// Decimal text with at most one dot and an optional leading minus.
pub fn is_float(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() {
        return false;
    }
    let mut has_dot = false;
    for ch in digits.chars() {
        if ch == '.' {
            if has_dot {
                return false;
            }
            has_dot = true;
        } else if !ch.is_ascii_digit() && !is_blank(ch) {
            return false;
        }
    }
    true
}

/// The first linebreak found in `s`: `"\n"`, `"\r"`, `"\r\n"` or `"\n\r"`.
pub fn guess_linebreak(s: &str) -> Option<&'static str> {
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        match (ch, next) {
            (_, None) => return None,
            ('\r', Some('\n')) => return Some("\r\n"),
            ('\r', _) => return Some("\r"),
            ('\n', Some('\r')) => return Some("\n\r"),
            ('\n', _) => return Some("\n"),
            _ => {}
        }
    }
    None
}

/// Splits at every `delimiter`, which is removed. An empty delimiter yields `s` whole.
pub fn split(s: &str, delimiter: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    if delimiter.is_empty() {
        return vec![s.to_string()];
    }
    s.split(delimiter).map(str::to_string).collect()
}

pub fn split_lines(s: &str) -> Vec<String> {
    split(s, guess_linebreak(s).unwrap_or(""))
}

/// Splits a NUL-delimited multi-string, `"one\0two\0\0"`, up to the first empty entry.
pub fn split_multi_zero(s: &str) -> Vec<String> {
    s.split('\0')
        .take_while(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/*
 * Splits on whitespace, keeping double-quoted runs together without their
 * quotes: `"First one" second "Third one"` gives three tokens. A quote
 * that is never closed drops the rest of the text.
 */
pub fn split_quoted(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch == '"' {
            let body = start + 1;
            match s[body..].find('"') {
                Some(len) => {
                    tokens.push(s[body..body + len].to_string());
                    while chars.next_if(|&(i, _)| i <= body + len).is_some() {}
                }
                None => break,
            }
        } else if !ch.is_whitespace() {
            let mut end = start + ch.len_utf8();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            tokens.push(s[start..end].to_string());
        }
    }
    tokens
}

/// Formats `number` with `separator` between groups of three digits.
pub fn to_string_with_separator(number: i64, separator: char) -> String {
    let digits = number.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if number < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// The text before the first NUL, for buffers filled by the OS.
pub fn trim_nulls(s: &str) -> &str {
    match s.find('\0') {
        Some(end) => &s[..end],
        None => s,
    }
}

pub fn remove_diacritics(s: &str) -> String {
    s.chars()
        .map(|ch| match DIACRITICS.chars().position(|d| d == ch) {
            Some(pos) => REPLACEMENTS.chars().nth(pos).unwrap_or(ch),
            None => ch,
        })
        .collect()
}

/// Replaces every case-insensitive occurrence of `needle`.
pub fn replacei(haystack: &str, needle: &str, replacement: &str) -> String {
    if haystack.is_empty() || needle.is_empty() {
        return haystack.to_string();
    }
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(ch) = rest.chars().next() {
        match prefix_len_i(rest, needle) {
            Some(len) => {
                out.push_str(replacement);
                rest = &rest[len..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}
