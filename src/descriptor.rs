//! Build descriptor (`application.fam`) parsing
//!
//! The application's own repository carries a build descriptor whose fields
//! (`appid`, `name`, `fap_version`, ...) serve as fallbacks for manifest
//! fields left empty. The descriptor uses Python call syntax:
//!
//! ```text
//! App(
//!     appid="example_app",
//!     name="Example App",
//!     apptype=FlipperAppType.EXTERNAL,
//!     fap_version=(1, 0),
//!     fap_category="Tools",
//!     targets=["f7"],
//! )
//! ```
//!
//! Only the declarative subset matters here: string literals, integer
//! tuples, string lists, and bare identifiers. Anything else (arithmetic,
//! nested `Lib(...)` calls) is captured raw and ignored. A descriptor may
//! declare several applications; selection by manifest `id` happens in
//! [`BuildDescriptor::select`].

/// One `App(...)` declaration from a build descriptor
#[derive(Debug, Clone, Default)]
pub struct DescriptorApp {
    pub appid: String,
    pub apptype: String,
    pub name: String,
    pub fap_author: String,
    pub fap_category: String,
    pub fap_description: String,
    pub fap_icon: String,
    /// (major, minor), from `fap_version=(1, 0)` or `fap_version="1.0"`
    pub fap_version: Option<(u32, u32)>,
    pub targets: Vec<String>,
}

impl DescriptorApp {
    /// Whether this declaration is an externally distributed application
    /// (the only kind the catalog accepts)
    pub fn is_external(&self) -> bool {
        self.apptype.ends_with("EXTERNAL")
    }

    /// `fap_version` rendered as the manifest's "major.minor" form
    pub fn version_string(&self) -> Option<String> {
        self.fap_version.map(|(maj, min)| format!("{maj}.{min}"))
    }
}

/// Why [`BuildDescriptor::select`] could not pick an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// Descriptor declares no external applications
    NoExternalApps,
    /// Several external applications and none matches the manifest `id`
    NoMatch { candidates: Vec<String> },
}

/// A parsed `application.fam`
#[derive(Debug, Clone, Default)]
pub struct BuildDescriptor {
    pub apps: Vec<DescriptorApp>,
}

impl BuildDescriptor {
    /// Parse descriptor text into its `App(...)` declarations
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut apps = Vec::new();
        let bytes = text.as_bytes();
        let mut i = 0;

        while let Some(start) = find_app_call(text, i) {
            let args_start = start + text[start..].find('(').ok_or("unbalanced App(")? + 1;
            let args_end = find_matching_paren(text, args_start)
                .ok_or_else(|| "unterminated App( declaration".to_string())?;
            let args = parse_arguments(&text[args_start..args_end])?;
            apps.push(app_from_args(&args));
            i = args_end + 1;
            if i >= bytes.len() {
                break;
            }
        }

        if apps.is_empty() {
            return Err("no App() declarations found".to_string());
        }

        Ok(Self { apps })
    }

    /// Pick the application this manifest describes.
    ///
    /// One external app: use it. Several: the manifest `id` disambiguates;
    /// an empty or unmatched `id` is an error listing the candidates.
    pub fn select(&self, id: &str) -> std::result::Result<&DescriptorApp, SelectError> {
        let externals: Vec<&DescriptorApp> =
            self.apps.iter().filter(|a| a.is_external()).collect();

        match externals.len() {
            0 => Err(SelectError::NoExternalApps),
            1 => Ok(externals[0]),
            _ => externals
                .iter()
                .find(|a| !id.is_empty() && a.appid == id)
                .copied()
                .ok_or_else(|| SelectError::NoMatch {
                    candidates: externals.iter().map(|a| a.appid.clone()).collect(),
                }),
        }
    }
}

/// Find the next top-level `App(` call at or after `from`.
/// Matches whole words only, so `ExtFile(` and `FlipperAppType` don't hit.
fn find_app_call(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut search = from;
    while let Some(rel) = text[search..].find("App") {
        let pos = search + rel;
        let prev_ok = pos == 0
            || !(bytes[pos - 1].is_ascii_alphanumeric() || bytes[pos - 1] == b'_');
        let after = pos + 3;
        let next_paren = text[after..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .count();
        let follows_paren = text[after..].chars().nth(next_paren) == Some('(');
        if prev_ok && follows_paren {
            return Some(pos);
        }
        search = pos + 3;
    }
    None
}

/// Index of the `)` matching the paren that opened just before `start`.
/// String literals and `#` comments are skipped.
fn find_matching_paren(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = text[start..].char_indices();

    while let Some((off, c)) = chars.next() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + off);
                }
            }
            '\'' | '"' => skip_string(&mut chars, c),
            '#' => {
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_string(chars: &mut std::str::CharIndices<'_>, quote: char) {
    let mut escaped = false;
    for (_, c) in chars.by_ref() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            break;
        }
    }
}

/// Split `key=value, key=value, ...` argument text into raw pairs
fn parse_arguments(src: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    let mut rest = src;

    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            break;
        }

        let key_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum::<usize>();
        if key_len == 0 {
            return Err(format!("expected keyword argument near '{}'", truncate(rest)));
        }
        let key = rest[..key_len].to_string();
        rest = skip_trivia(&rest[key_len..]);

        let Some(stripped) = rest.strip_prefix('=') else {
            return Err(format!("expected '=' after '{key}'"));
        };
        rest = skip_trivia(stripped);

        let value_len = raw_value_len(rest);
        pairs.push((key, rest[..value_len].trim().to_string()));
        rest = rest[value_len..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest);
    }

    Ok(pairs)
}

/// Length of the raw value text: everything up to the next comma at
/// bracket depth zero
fn raw_value_len(src: &str) -> usize {
    let mut depth = 0usize;
    let mut chars = src.char_indices();

    while let Some((off, c)) = chars.next() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return off,
            '\'' | '"' => skip_string(&mut chars, c),
            '#' => {
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    src.len()
}

fn skip_trivia(mut src: &str) -> &str {
    loop {
        src = src.trim_start();
        if let Some(stripped) = src.strip_prefix('#') {
            src = stripped.split_once('\n').map_or("", |(_, rest)| rest);
        } else {
            return src;
        }
    }
}

fn truncate(s: &str) -> &str {
    let end = s
        .char_indices()
        .nth(20)
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}

fn app_from_args(args: &[(String, String)]) -> DescriptorApp {
    let mut app = DescriptorApp::default();
    for (key, raw) in args {
        match key.as_str() {
            "appid" => app.appid = string_value(raw).unwrap_or_default(),
            "apptype" => app.apptype = raw.clone(),
            "name" => app.name = string_value(raw).unwrap_or_default(),
            "fap_author" => app.fap_author = string_value(raw).unwrap_or_default(),
            "fap_category" => app.fap_category = string_value(raw).unwrap_or_default(),
            "fap_description" => app.fap_description = string_value(raw).unwrap_or_default(),
            "fap_icon" => app.fap_icon = string_value(raw).unwrap_or_default(),
            "fap_version" => app.fap_version = version_value(raw),
            "targets" => app.targets = string_list_value(raw),
            _ => {}
        }
    }
    if app.targets.is_empty() {
        app.targets = vec!["all".to_string()];
    }
    app
}

/// Decode a Python string literal, or None if `raw` isn't one
fn string_value(raw: &str) -> Option<String> {
    let mut chars = raw.trim().chars();
    let quote = chars.next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }

    let mut out = String::new();
    let mut escaped = false;
    for c in chars {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(out);
        } else {
            out.push(c);
        }
    }
    None
}

/// Decode `(1, 0)` or `"1.0"` into a version pair
fn version_value(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();
    if let Some(s) = string_value(raw) {
        let v: crate::manifest::Version = s.parse().ok()?;
        return Some((v.major, v.minor));
    }

    let inner = raw.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim).filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

/// Decode `["a", "b"]` into its string items; non-string items are skipped
fn string_list_value(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    let mut rest = inner;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let len = raw_value_len(rest);
        if let Some(s) = string_value(rest[..len].trim()) {
            items.push(s);
        }
        rest = rest[len..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest);
    }
    items
}
