// linesift - core/engines.rs
//
// The registered pattern engines. Every variant is a front-end translation
// (basic, extended, fixed-string, perl) into one modern byte-regex, executed
// through a shared wrapper that confines candidates to a single line and
// enforces the word/line constraints.
//
// Newline separates alternatives in the concatenated pattern bytes, so the
// compiled regex itself never contains a raw terminator.

use memchr::{memchr, memrchr};
use regex::bytes::{Regex, RegexBuilder};

use crate::core::matcher::{MatchSpan, Matcher, MatcherOptions};
use crate::util::constants::REGEX_SIZE_LIMIT;
use crate::util::error::{PatternError, PatternResult};

// =============================================================================
// Engine constructors (registry entries)
// =============================================================================

/// Basic regular expressions (the `default` registration).
pub fn compile_basic(
    pattern: &[u8],
    options: &MatcherOptions,
) -> PatternResult<Box<dyn Matcher>> {
    build(translate_alternatives(pattern, bre_to_modern)?, options)
}

/// Extended regular expressions.
pub fn compile_extended(
    pattern: &[u8],
    options: &MatcherOptions,
) -> PatternResult<Box<dyn Matcher>> {
    build(translate_alternatives(pattern, |a| Ok(ere_to_modern(a)))?, options)
}

/// Fixed strings: every byte is literal.
pub fn compile_fixed(
    pattern: &[u8],
    options: &MatcherOptions,
) -> PatternResult<Box<dyn Matcher>> {
    build(translate_alternatives(pattern, |a| Ok(escape_literal(a)))?, options)
}

/// Perl-compatible patterns, realized on the same modern engine as
/// `extended`; PCRE-only constructs surface as compile diagnostics.
pub fn compile_perl(
    pattern: &[u8],
    options: &MatcherOptions,
) -> PatternResult<Box<dyn Matcher>> {
    compile_extended(pattern, options)
}

// =============================================================================
// Shared execution wrapper
// =============================================================================

struct PatternMatcher {
    /// Finds candidate spans anywhere in the window.
    search: Regex,
    /// Full-line acceptance check, present only under the line constraint.
    anchored: Option<Regex>,
    word_match: bool,
    eol: u8,
}

impl Matcher for PatternMatcher {
    fn execute(&self, haystack: &[u8]) -> Option<MatchSpan> {
        let mut pos = 0;
        loop {
            let m = self.search.find_at(haystack, pos)?;
            let (mut start, mut end) = (m.start(), m.end());
            if start >= haystack.len() {
                // Reserved sentinel signal; the scanner treats it as no-match.
                return Some(MatchSpan {
                    start: haystack.len(),
                    end: haystack.len(),
                });
            }

            let line_start = memrchr(self.eol, &haystack[..start]).map_or(0, |i| i + 1);
            let line_end =
                memchr(self.eol, &haystack[start..]).map_or(haystack.len(), |i| start + i);

            if end > line_end {
                // Candidate spans the terminator. Retry bounded to this line;
                // bounding by slice keeps `$` meaningful at the line end.
                match self.search.find_at(&haystack[..line_end], start) {
                    Some(m2) => {
                        start = m2.start();
                        end = m2.end();
                    }
                    None => {
                        pos = line_end + 1;
                        if pos > haystack.len() {
                            return None;
                        }
                        continue;
                    }
                }
            }

            if let Some(anchored) = &self.anchored {
                if anchored.is_match(&haystack[line_start..line_end]) {
                    return Some(MatchSpan {
                        start: line_start,
                        end: line_end,
                    });
                }
                pos = line_end + 1;
                if pos > haystack.len() {
                    return None;
                }
                continue;
            }

            if self.word_match && !word_bounded(haystack, start, end) {
                pos = start + 1;
                if pos > haystack.len() {
                    return None;
                }
                continue;
            }

            return Some(MatchSpan { start, end });
        }
    }
}

/// Word constituents follow the C locale: letters, digits, underscore.
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn word_bounded(haystack: &[u8], start: usize, end: usize) -> bool {
    (start == 0 || !is_word_byte(haystack[start - 1]))
        && (end == haystack.len() || !is_word_byte(haystack[end]))
}

// =============================================================================
// Assembly
// =============================================================================

fn translate_alternatives(
    pattern: &[u8],
    translate: impl Fn(&[u8]) -> PatternResult<String>,
) -> PatternResult<Vec<String>> {
    pattern.split(|&b| b == b'\n').map(|alt| translate(alt)).collect()
}

fn build(
    alternatives: Vec<String>,
    options: &MatcherOptions,
) -> PatternResult<Box<dyn Matcher>> {
    let joined = alternatives.join("|");
    let search = build_regex(&joined, options)?;
    let anchored = if options.line_match {
        Some(build_regex(&format!("\\A(?:{joined})\\z"), options)?)
    } else {
        None
    };
    Ok(Box::new(PatternMatcher {
        search,
        anchored,
        word_match: options.word_match,
        eol: options.eol_byte,
    }))
}

fn build_regex(pattern: &str, options: &MatcherOptions) -> PatternResult<Regex> {
    RegexBuilder::new(pattern)
        .unicode(false)
        .multi_line(true)
        .case_insensitive(options.case_insensitive)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|source| PatternError::Compile { source })
}

// =============================================================================
// Translators
// =============================================================================

/// Escape one fixed-string alternative so every byte is literal.
fn escape_literal(alt: &[u8]) -> String {
    let mut out = String::with_capacity(alt.len() * 2);
    for &b in alt {
        if b.is_ascii_alphanumeric() || b == b' ' || b == b'_' {
            out.push(b as char);
        } else if b.is_ascii_graphic() {
            out.push('\\');
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

/// Extended syntax is already modern; this pass only rewrites the classic
/// word anchors `\<` `\>` and keeps non-UTF-8 pattern bytes representable.
fn ere_to_modern(alt: &[u8]) -> String {
    let Ok(s) = std::str::from_utf8(alt) else {
        return hygienize(alt);
    };
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('<') | Some('>') => {
                chars.next();
                out.push_str("\\b");
            }
            Some(&next) => {
                chars.next();
                out.push('\\');
                out.push(next);
            }
            None => out.push_str("\\\\"),
        }
    }
    out
}

/// Translate one basic-regexp alternative to modern syntax.
///
/// The interesting inversions: `\(` `\)` `\{` `\}` `\|` `\+` `\?` become
/// operators, their bare forms become literals; `*` is literal at the start
/// of an expression; `^` anchors only at an expression start and `$` only at
/// an expression end; bracket expressions are copied verbatim.
fn bre_to_modern(alt: &[u8]) -> PatternResult<String> {
    let mut out = String::with_capacity(alt.len() * 2);
    let mut i = 0;
    // True at the start of the pattern and just after `\(` or `\|`, where
    // `^` anchors and `*` is literal.
    let mut at_start = true;
    while i < alt.len() {
        match alt[i] {
            b'\\' => {
                let Some(&c) = alt.get(i + 1) else {
                    out.push_str("\\\\");
                    break;
                };
                match c {
                    b'(' | b'|' => {
                        out.push(c as char);
                        i += 2;
                        at_start = true;
                        continue;
                    }
                    b')' | b'{' | b'}' | b'+' | b'?' => out.push(c as char),
                    b'<' | b'>' => out.push_str("\\b"),
                    b'1'..=b'9' => {
                        return Err(PatternError::BackReference {
                            reference: format!("\\{}", c as char),
                        })
                    }
                    b'w' | b'W' | b's' | b'S' | b'b' | b'B' => {
                        out.push('\\');
                        out.push(c as char);
                    }
                    _ => push_literal(&mut out, c),
                }
                i += 2;
                at_start = false;
            }
            b'[' => {
                let end = scan_bracket(alt, i)?;
                out.push_str(&class_to_modern(&alt[i..=end]));
                i = end + 1;
                at_start = false;
            }
            b'^' => {
                if at_start {
                    out.push('^');
                    // "^*" keeps the star literal, as after any anchor start.
                } else {
                    out.push_str("\\^");
                    at_start = false;
                }
                i += 1;
            }
            b'$' => {
                let at_end = i + 1 == alt.len()
                    || (alt.get(i + 1) == Some(&b'\\')
                        && matches!(alt.get(i + 2), Some(b')') | Some(b'|')));
                if at_end {
                    out.push('$');
                } else {
                    out.push_str("\\$");
                }
                i += 1;
                at_start = false;
            }
            b'*' => {
                if at_start {
                    out.push_str("\\*");
                } else {
                    out.push('*');
                }
                i += 1;
                at_start = false;
            }
            b'.' => {
                out.push('.');
                i += 1;
                at_start = false;
            }
            b @ (b'(' | b')' | b'{' | b'}' | b'|' | b'+' | b'?') => {
                out.push('\\');
                out.push(b as char);
                i += 1;
                at_start = false;
            }
            b => {
                push_literal(&mut out, b);
                i += 1;
                at_start = false;
            }
        }
    }
    Ok(out)
}

/// Locate the closing `]` of a bracket expression starting at `start`,
/// honoring the leading `^`/`]` rules and `[:class:]`-style sequences.
fn scan_bracket(alt: &[u8], start: usize) -> PatternResult<usize> {
    let mut j = start + 1;
    if alt.get(j) == Some(&b'^') {
        j += 1;
    }
    if alt.get(j) == Some(&b']') {
        j += 1;
    }
    while j < alt.len() {
        match alt[j] {
            b']' => return Ok(j),
            b'[' if matches!(alt.get(j + 1), Some(b':') | Some(b'=') | Some(b'.')) => {
                let kind = alt[j + 1];
                let mut k = j + 2;
                loop {
                    match alt.get(k) {
                        Some(&c) if c == kind && alt.get(k + 1) == Some(&b']') => {
                            j = k + 2;
                            break;
                        }
                        Some(_) => k += 1,
                        None => return Err(PatternError::UnterminatedBracket),
                    }
                }
            }
            _ => j += 1,
        }
    }
    Err(PatternError::UnterminatedBracket)
}

/// Re-render a bracket expression (delimiters included) under the modern
/// class rules: the leading literal `]` and any lone `\` need escaping, `&`
/// would otherwise form an intersection operator, and `[:name:]` sequences
/// pass through unchanged.
fn class_to_modern(class: &[u8]) -> String {
    let mut out = String::with_capacity(class.len() + 4);
    out.push('[');
    let mut j = 1;
    if class.get(j) == Some(&b'^') {
        out.push('^');
        j += 1;
    }
    if class.get(j) == Some(&b']') {
        out.push_str("\\]");
        j += 1;
    }
    let body_end = class.len() - 1;
    while j < body_end {
        match class[j] {
            b'[' if matches!(class.get(j + 1), Some(b':') | Some(b'=') | Some(b'.')) => {
                let kind = class[j + 1];
                let mut k = j + 2;
                while !(class[k] == kind && class.get(k + 1) == Some(&b']')) {
                    k += 1;
                }
                for &b in &class[j..k + 2] {
                    out.push(b as char);
                }
                j = k + 2;
            }
            b'\\' => {
                out.push_str("\\\\");
                j += 1;
            }
            b'&' => {
                out.push_str("\\&");
                j += 1;
            }
            b if b.is_ascii() => {
                out.push(b as char);
                j += 1;
            }
            b => {
                out.push_str(&format!("\\x{b:02X}"));
                j += 1;
            }
        }
    }
    out.push(']');
    out
}

/// Append one literal byte, escaping whatever the modern syntax would treat
/// as an operator.
fn push_literal(out: &mut String, b: u8) {
    match b {
        b'\\' | b'.' | b'+' | b'*' | b'?' | b'(' | b')' | b'|' | b'[' | b']' | b'{' | b'}'
        | b'^' | b'$' | b'#' | b'&' | b'-' | b'~' => {
            out.push('\\');
            out.push(b as char);
        }
        _ if b.is_ascii_graphic() || b == b' ' => out.push(b as char),
        _ => out.push_str(&format!("\\x{b:02X}")),
    }
}

/// Render raw pattern bytes as a pattern string: UTF-8 passes through, other
/// bytes become hex escapes (valid both inside and outside classes).
fn hygienize(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let mut out = String::with_capacity(bytes.len() * 2);
            for &b in bytes {
                if b.is_ascii() {
                    out.push(b as char);
                } else {
                    out.push_str(&format!("\\x{b:02X}"));
                }
            }
            out
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> MatcherOptions {
        MatcherOptions {
            case_insensitive: false,
            word_match: false,
            line_match: false,
            eol_byte: b'\n',
        }
    }

    fn span(start: usize, end: usize) -> Option<MatchSpan> {
        Some(MatchSpan { start, end })
    }

    #[test]
    fn fixed_is_fully_literal() {
        let m = compile_fixed(b"a.c", &opts()).unwrap();
        assert_eq!(m.execute(b"xa.cx\n"), span(1, 4));
        assert_eq!(m.execute(b"xabcx\n"), None);
    }

    #[test]
    fn fixed_alternatives_split_on_newline() {
        let m = compile_fixed(b"foo\nbar", &opts()).unwrap();
        assert_eq!(m.execute(b"a bar\n"), span(2, 5));
    }

    #[test]
    fn bre_groups_are_backslashed() {
        assert_eq!(bre_to_modern(b"\\(ab\\)\\+").unwrap(), "(ab)+");
        assert_eq!(bre_to_modern(b"a(b)").unwrap(), "a\\(b\\)");
        assert_eq!(bre_to_modern(b"a\\{2,3\\}").unwrap(), "a{2,3}");
        assert_eq!(bre_to_modern(b"a+b?").unwrap(), "a\\+b\\?");
    }

    #[test]
    fn bre_positional_anchors() {
        assert_eq!(bre_to_modern(b"^a$").unwrap(), "^a$");
        assert_eq!(bre_to_modern(b"a^b").unwrap(), "a\\^b");
        assert_eq!(bre_to_modern(b"a$b").unwrap(), "a\\$b");
        assert_eq!(bre_to_modern(b"*ab").unwrap(), "\\*ab");
        assert_eq!(bre_to_modern(b"\\(*a\\)").unwrap(), "(\\*a)");
    }

    #[test]
    fn bre_back_reference_is_rejected() {
        assert!(matches!(
            bre_to_modern(b"\\(a\\)\\1"),
            Err(PatternError::BackReference { .. })
        ));
    }

    #[test]
    fn bre_bracket_translates_class_rules() {
        assert_eq!(bre_to_modern(b"[]a-z^]+").unwrap(), "[\\]a-z^]\\+");
        assert_eq!(bre_to_modern(b"[[:digit:]]").unwrap(), "[[:digit:]]");
        assert!(matches!(
            bre_to_modern(b"[abc"),
            Err(PatternError::UnterminatedBracket)
        ));
    }

    #[test]
    fn ere_word_anchors_translate() {
        let m = compile_extended(b"\\<cat\\>", &opts()).unwrap();
        assert_eq!(m.execute(b"a cat.\n"), span(2, 5));
        assert_eq!(m.execute(b"scatter\n"), None);
    }

    #[test]
    fn dollar_matches_at_every_line_end() {
        let m = compile_extended(b"b$", &opts()).unwrap();
        assert_eq!(m.execute(b"ab\ncb\n"), span(1, 2));
    }

    #[test]
    fn case_insensitive_is_ascii() {
        let m = compile_fixed(
            b"HiT",
            &MatcherOptions {
                case_insensitive: true,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(m.execute(b"a hit\n"), span(2, 5));
    }

    #[test]
    fn word_constraint_rescans_forward() {
        let o = MatcherOptions {
            word_match: true,
            ..opts()
        };
        let m = compile_fixed(b"is", &o).unwrap();
        assert_eq!(m.execute(b"this is it\n"), span(5, 7));
        assert_eq!(m.execute(b"thistle\n"), None);
    }

    #[test]
    fn line_constraint_requires_whole_line() {
        let o = MatcherOptions {
            line_match: true,
            ..opts()
        };
        let m = compile_extended(b"ab+", &o).unwrap();
        assert_eq!(m.execute(b"xabb\nabb\n"), span(5, 8));
        assert_eq!(m.execute(b"xabb\nabbx\n"), None);
    }

    #[test]
    fn empty_pattern_matches_everywhere_but_not_the_sentinel() {
        let m = compile_basic(b"", &opts()).unwrap();
        assert_eq!(m.execute(b"a\n"), span(0, 0));
        // End-of-slice offset is the reserved sentinel signal.
        let s = m.execute(b"").unwrap();
        assert_eq!(s.start, 0);
    }

    #[test]
    fn null_data_terminator_confines_lines() {
        let o = MatcherOptions {
            eol_byte: 0,
            line_match: true,
            ..opts()
        };
        let m = compile_fixed(b"y", &o).unwrap();
        assert_eq!(m.execute(b"x\0y\0z\0"), span(2, 3));
    }
}
