//! Scenario template expansion
//!
//! Supports the subset of Mako used by scenario templates:
//! - `${name}` substitution with strict undefined checking
//! - `<%page args="a, b='default'"/>` default declarations
//! - `##` comment lines

use crate::variables::TemplateVariables;
use regex::Regex;
use sahara_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PAGE_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<%page\s+args\s*=\s*(?:"([^"]*)"|'([^']*)')\s*/>"#).unwrap()
});

static EXPRESSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}").unwrap()
});

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

/// Expand `source`; `file` is only used in error messages
pub fn render(source: &str, file: &str, variables: &TemplateVariables) -> Result<String> {
    let mut defaults: BTreeMap<String, Option<String>> = BTreeMap::new();
    for captures in PAGE_TAG_REGEX.captures_iter(source) {
        let args = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        for (name, value) in parse_page_args(args).map_err(|message| Error::Template {
            file: file.to_string(),
            message,
        })? {
            defaults.insert(name, value);
        }
    }
    let without_tags = PAGE_TAG_REGEX.replace_all(source, "");

    let mut body = String::with_capacity(without_tags.len());
    for line in without_tags.lines() {
        if line.trim_start().starts_with("##") {
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut output = String::with_capacity(body.len());
    let mut last = 0;
    for captures in EXPRESSION_REGEX.captures_iter(&body) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let expression = captures[1].trim();

        if !IDENTIFIER_REGEX.is_match(expression) {
            return Err(Error::Template {
                file: file.to_string(),
                message: format!("unsupported expression '${{{}}}'", expression),
            });
        }

        let value = variables
            .get(expression)
            .or_else(|| defaults.get(expression).and_then(|v| v.as_ref()))
            .ok_or_else(|| Error::UndefinedVariable {
                name: expression.to_string(),
                file: file.to_string(),
            })?;

        output.push_str(&body[last..whole.start()]);
        output.push_str(value);
        last = whole.end();
    }
    output.push_str(&body[last..]);

    Ok(output)
}

/// Parse `a, b='x', c="y", d=3` into names and optional default values
fn parse_page_args(args: &str) -> std::result::Result<Vec<(String, Option<String>)>, String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ',' => items.push(std::mem::take(&mut current)),
            None => current.push(c),
        }
    }
    if quote.is_some() {
        return Err("unterminated string in page args".to_string());
    }
    items.push(current);

    let mut parsed = Vec::new();
    for item in items.iter().map(|i| i.trim()).filter(|i| !i.is_empty()) {
        let (name, value) = match item.split_once('=') {
            Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
            None => (item, None),
        };
        if !IDENTIFIER_REGEX.is_match(name) {
            return Err(format!("invalid page argument '{}'", name));
        }
        parsed.push((name.to_string(), value));
    }
    Ok(parsed)
}

fn unquote(literal: &str) -> String {
    for q in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(q) && literal.ends_with(q) {
            return literal[1..literal.len() - 1].to_string();
        }
    }
    literal.to_string()
}
