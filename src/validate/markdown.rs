//! Markdown subset enforcement for `description` and `changelog`
//!
//! Catalog text is rendered by constrained clients, so only basic formatting
//! is allowed: headers of level 1-2, bold, italic, lists, plain links, and
//! scheme autolinks. Everything else is rejected with the construct name and
//! line number. Implemented as a block-state line scanner; rejection does
//! not need an AST.

/// One disallowed construct found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownIssue {
    pub construct: &'static str,
    pub line: usize,
}

/// Maximum allowed header depth
pub const MAX_HEADER_DEPTH: usize = 2;

/// Scan Markdown text and report every disallowed construct
pub fn check(text: &str) -> Vec<MarkdownIssue> {
    let mut issues = Vec::new();
    let mut in_fence: Option<char> = None;
    let mut prev_blank = true;
    let mut prev_paragraph = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim_start();
        let indent = indent_width(raw_line);

        // Fenced code: flag the opening fence once, skip the body
        if let Some(fence) = in_fence {
            if trimmed.starts_with(fence) && trimmed.chars().take_while(|c| *c == fence).count() >= 3
            {
                in_fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            issues.push(MarkdownIssue {
                construct: "code block",
                line,
            });
            in_fence = trimmed.chars().next();
            prev_blank = false;
            prev_paragraph = false;
            continue;
        }

        if trimmed.is_empty() {
            prev_blank = true;
            prev_paragraph = false;
            continue;
        }

        if indent >= 4 && prev_blank {
            issues.push(MarkdownIssue {
                construct: "code block",
                line,
            });
            prev_blank = false;
            prev_paragraph = false;
            continue;
        }
        prev_blank = false;

        if prev_paragraph && is_setext_underline(trimmed) {
            issues.push(MarkdownIssue {
                construct: "setext header",
                line,
            });
            prev_paragraph = false;
            continue;
        }

        if is_thematic_break(trimmed) {
            issues.push(MarkdownIssue {
                construct: "horizontal rule",
                line,
            });
            prev_paragraph = false;
            continue;
        }

        if trimmed.starts_with('>') {
            issues.push(MarkdownIssue {
                construct: "block quote",
                line,
            });
            prev_paragraph = false;
            continue;
        }

        if trimmed.starts_with('|') {
            issues.push(MarkdownIssue {
                construct: "table",
                line,
            });
            prev_paragraph = false;
            continue;
        }

        if is_reference_definition(trimmed) {
            issues.push(MarkdownIssue {
                construct: "reference definition",
                line,
            });
            prev_paragraph = false;
            continue;
        }

        let header_depth = atx_header_depth(trimmed);
        if let Some(depth) = header_depth {
            if depth > MAX_HEADER_DEPTH {
                issues.push(MarkdownIssue {
                    construct: "header depth",
                    line,
                });
            }
        }

        scan_inline(trimmed, line, &mut issues);

        prev_paragraph = header_depth.is_none() && !is_list_item(trimmed);
    }

    issues
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// `===` or `---` under a paragraph line
fn is_setext_underline(trimmed: &str) -> bool {
    let body = trimmed.trim_end();
    !body.is_empty()
        && (body.chars().all(|c| c == '=') || body.chars().all(|c| c == '-'))
}

/// Three or more `-`, `*`, or `_`, possibly space-separated, alone on a line
fn is_thematic_break(trimmed: &str) -> bool {
    let body = trimmed.trim_end();
    for marker in ['-', '*', '_'] {
        let count = body.chars().filter(|c| *c == marker).count();
        if count >= 3 && body.chars().all(|c| c == marker || c == ' ') {
            return true;
        }
    }
    false
}

fn is_reference_definition(trimmed: &str) -> bool {
    if !trimmed.starts_with('[') {
        return false;
    }
    match trimmed.find(']') {
        Some(pos) => trimmed[pos + 1..].starts_with(':'),
        None => false,
    }
}

/// Header depth of an ATX heading line, if it is one
fn atx_header_depth(trimmed: &str) -> Option<usize> {
    let depth = trimmed.chars().take_while(|c| *c == '#').count();
    if depth == 0 || depth > 6 {
        return None;
    }
    let rest = &trimmed[depth..];
    (rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')).then_some(depth)
}

fn is_list_item(trimmed: &str) -> bool {
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
    {
        return !rest.is_empty();
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let rest = &trimmed[digits..];
    rest.starts_with(". ") || rest.starts_with(") ")
}

/// Inline constructs: images, inline code, raw HTML, email autolinks,
/// entities. One report per construct per line.
fn scan_inline(line_text: &str, line: usize, issues: &mut Vec<MarkdownIssue>) {
    let mut found: Vec<&'static str> = Vec::new();
    let bytes = line_text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'!' if bytes.get(i + 1) == Some(&b'[') => {
                found.push("image");
                i += 2;
            }
            b'`' => {
                found.push("inline code");
                // Skip to closing backtick so one span reports once
                i += 1 + line_text[i + 1..].find('`').map_or(line_text.len() - i - 1, |p| p + 1);
            }
            b'<' => {
                i += 1 + classify_angle_bracket(&line_text[i..], &mut found);
            }
            b'&' => {
                if is_entity(&line_text[i..]) {
                    found.push("HTML entity");
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    found.sort_unstable();
    found.dedup();
    for construct in found {
        issues.push(MarkdownIssue { construct, line });
    }
}

/// Classify a `<...` occurrence: scheme autolinks are allowed, email
/// autolinks and anything tag-shaped are not. Returns extra bytes consumed.
fn classify_angle_bracket(rest: &str, found: &mut Vec<&'static str>) -> usize {
    let inner_end = rest.find('>');
    if let Some(end) = inner_end {
        let inner = &rest[1..end];
        if !inner.contains(' ') && inner.contains("://") {
            return end; // autolink, allowed
        }
        if !inner.contains(' ') && inner.contains('@') && !inner.starts_with('/') {
            found.push("email autolink");
            return end;
        }
    }

    let next = rest[1..].chars().next();
    if matches!(next, Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!') {
        found.push("raw HTML");
    }
    0
}

fn is_entity(rest: &str) -> bool {
    // &name; or &#123; with a short body
    let body: String = rest
        .chars()
        .skip(1)
        .take(10)
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '#')
        .collect();
    !body.is_empty() && rest[1 + body.len()..].starts_with(';')
}
