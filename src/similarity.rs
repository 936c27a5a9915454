//! similarity.rs
//! String similarity primitives used by every matching decision:
//! Levenshtein distance (bounded and unbounded), common-suffix separators,
//! and identifier tokenization.

/// Levenshtein distance capped at `threshold + 1`.
///
/// Once every cell of a row exceeds `threshold` the exact value can no longer
/// matter, so the search stops and reports `threshold + 1`.
pub fn bounded_edit_distance(a: &str, b: &str, threshold: usize) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let cap = threshold.saturating_add(1);

    if a.len().abs_diff(b.len()) > threshold {
        return cap;
    }
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len()).min(cap);
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > threshold {
            return cap;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()].min(cap)
}

/// Plain Levenshtein distance.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Edit distance divided by the longer length; `0.0` for two empty strings.
pub fn normalized_edit_distance(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    edit_distance(a, b) as f64 / longest as f64
}

/// Offset from the end of both strings of the last `separator` inside their
/// exactly matching trailing run.
///
/// `("a.b.Foo", "c.Foo")` with `'.'` gives `Some(3)`: stripping three
/// characters leaves the prefixes `a.b.` and `c.`.
pub fn separator_pos_of_common_suffix(separator: char, s1: &str, s2: &str) -> Option<usize> {
    let mut found = None;
    for (i, (c1, c2)) in s1.chars().rev().zip(s2.chars().rev()).enumerate() {
        if c1 != c2 {
            break;
        }
        if c1 == separator {
            found = Some(i);
        }
    }
    found
}

/// Splits `s` at the separator found by [`separator_pos_of_common_suffix`],
/// returning the two differing prefixes (separator kept), or the whole
/// strings when they share no separated suffix.
pub fn rename_pattern(separator: char, before: &str, after: &str) -> (String, String) {
    match separator_pos_of_common_suffix(separator, before, after) {
        Some(pos) => {
            let b: String = before.chars().take(before.chars().count() - pos).collect();
            let a: String = after.chars().take(after.chars().count() - pos).collect();
            (b, a)
        }
        None => (before.to_string(), after.to_string()),
    }
}

pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, c1), c2)| c1 == c2)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

pub fn common_suffix<'a>(a: &'a str, b: &str) -> &'a str {
    let len: usize = a
        .chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(c1, c2)| c1 == c2)
        .map(|(c, _)| c.len_utf8())
        .sum();
    &a[a.len() - len..]
}

/// Splits an identifier into camel-case words; digits, `_` and `$` also
/// break words and are dropped.
pub fn camel_case_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphabetic() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (current.chars().last().is_some_and(|p| p.is_lowercase())
                || chars.get(i + 1).is_some_and(|n| n.is_lowercase()));
        if boundary {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// True when `s` is a whole-identifier occurrence inside `haystack`.
pub fn contains_identifier(haystack: &str, ident: &str) -> bool {
    identifier_positions(haystack, ident).next().is_some()
}

/// Replaces whole-identifier occurrences of `from` with `to`, leaving
/// substrings of longer identifiers (`user` inside `username`) alone.
pub fn replace_identifier(haystack: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return haystack.to_string();
    }
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for start in identifier_positions(haystack, from) {
        out.push_str(&haystack[last..start]);
        out.push_str(to);
        last = start + from.len();
    }
    out.push_str(&haystack[last..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn identifier_positions<'a>(haystack: &'a str, ident: &'a str) -> impl Iterator<Item = usize> + 'a {
    let starts_word = ident.chars().next().is_some_and(is_word_char);
    let ends_word = ident.chars().last().is_some_and(is_word_char);
    let mut cursor = 0;
    std::iter::from_fn(move || {
        if ident.is_empty() {
            return None;
        }
        while let Some(found) = haystack[cursor..].find(ident) {
            let start = cursor + found;
            let end = start + ident.len();
            cursor = end;
            let left_ok = !starts_word || !haystack[..start].chars().last().is_some_and(is_word_char);
            let right_ok = !ends_word || !haystack[end..].chars().next().is_some_and(is_word_char);
            if left_ok && right_ok {
                return Some(start);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn bounded_distance_caps_at_threshold_plus_one() {
        assert_eq!(bounded_edit_distance("kitten", "sitting", 5), 3);
        assert_eq!(bounded_edit_distance("kitten", "sitting", 2), 3);
        assert_eq!(bounded_edit_distance("abc", "xyzuvw", 1), 2);
        assert_eq!(bounded_edit_distance("", "abcdef", 2), 3);
    }

    #[test]
    fn unlimited_threshold_gives_exact_distance() {
        assert_eq!(bounded_edit_distance("a", "b", usize::MAX), 1);
        assert_eq!(bounded_edit_distance("kitten", "sitting", usize::MAX), 3);
        assert_eq!(bounded_edit_distance("", "abc", usize::MAX), 3);
    }

    #[test]
    fn normalized_distance() {
        assert_eq!(normalized_edit_distance("", ""), 0.0);
        assert!((normalized_edit_distance("abcd", "abce") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn common_suffix_separator() {
        assert_eq!(separator_pos_of_common_suffix('.', "a.b.Foo", "c.Foo"), Some(3));
        assert_eq!(separator_pos_of_common_suffix('.', "a.Foo", "b.Bar"), None);
        assert_eq!(separator_pos_of_common_suffix('/', "src/a/X.kt", "lib/a/X.kt"), Some(6));
        assert_eq!(
            rename_pattern('.', "a.b.Foo", "c.Foo"),
            ("a.b.".to_string(), "c.".to_string())
        );
    }

    #[test]
    fn camel_tokens() {
        assert_eq!(camel_case_tokens("dataHeader"), vec!["data", "Header"]);
        assert_eq!(camel_case_tokens("HTTPClient"), vec!["HTTP", "Client"]);
        assert_eq!(camel_case_tokens("user_id2Name"), vec!["user", "id", "Name"]);
    }

    #[test]
    fn identifier_replacement_is_whole_word() {
        assert_eq!(replace_identifier("user + username", "user", "u"), "u + username");
        assert_eq!(replace_identifier("a.build()", "a.build()", "Builder(a)"), "Builder(a)");
        assert!(contains_identifier("foo(data)", "data"));
        assert!(!contains_identifier("foo(dataBody)", "data"));
    }

    #[test]
    fn prefixes_and_suffixes() {
        assert_eq!(common_prefix("foo(a, b)", "foo(a, c)"), "foo(a, ");
        assert_eq!(common_suffix("x.run()", "y.run()"), ".run()");
    }
}
