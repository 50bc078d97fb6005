use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::placeholders::Placeholders;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("static token pattern"));

pub const UNRESOLVED_TEXT: &str = "n/a";

/// Replaces each known `{token}`. Unknown tokens stay as literal `{token}`
/// so a misspelled rule template is visible in the output.
pub fn render(template: &str, values: &Placeholders) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(v) => v.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Like [`render`], but any token left unresolved becomes `n/a`.
pub fn render_narrative(template: &str, values: &Placeholders) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures<'_>| {
            values.get(&caps[1]).unwrap_or(UNRESOLVED_TEXT).to_string()
        })
        .into_owned()
}

/// Tokens referenced by `template`, in order of first appearance.
pub fn referenced_tokens(template: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in TOKEN.captures_iter(template) {
        let name = caps[1].to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
