//! Request body sanitization
//!
//! Every string leaf of an untrusted JSON document is reduced to plain text:
//! no tags, no attributes, inner text kept, surrounding whitespace trimmed.
//! Elements whose content is not readable text (`<script>`, `<style>`,
//! `<noscript>`, `<textarea>`, `<option>`, `<plaintext>`) are dropped whole.
//! Object keys, numbers, booleans and null pass through untouched.

use std::collections::HashSet;
use std::sync::LazyLock;

use ammonia::Builder;
use serde_json::Value;

static TEXT_ONLY: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::empty();
    builder
        .generic_attributes(HashSet::new())
        .clean_content_tags(HashSet::from([
            "script",
            "style",
            "noscript",
            "textarea",
            "option",
            "plaintext",
        ]));
    builder
});

/// Strip all markup from a single string
pub fn sanitize_text(input: &str) -> String {
    TEXT_ONLY.clean(input).to_string().trim().to_owned()
}

/// Recursively sanitize a JSON value, preserving its shape
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, sanitize_value(value)))
                .collect(),
        ),
        scalar @ (Value::Null | Value::Bool(_) | Value::Number(_)) => scalar,
    }
}

/// Sanitize a body, leaving the named top-level fields as sent
pub fn sanitize_value_except(value: Value, verbatim: &[&str]) -> Value {
    match value {
        Value::Object(map) if !verbatim.is_empty() => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = if verbatim.contains(&key.as_str()) {
                        value
                    } else {
                        sanitize_value(value)
                    };
                    (key, value)
                })
                .collect(),
        ),
        other => sanitize_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_content_removed() {
        assert_eq!(sanitize_text("<script>alert(1)</script>hello"), "hello");
        assert_eq!(
            sanitize_value(json!("<script>alert(1)</script>hello")),
            json!("hello")
        );
    }

    #[test]
    fn test_nested_structures() {
        let input = json!({ "a": "<b>x</b>", "b": [1, "<i>y</i>"] });
        assert_eq!(sanitize_value(input), json!({ "a": "x", "b": [1, "y"] }));
    }

    #[test]
    fn test_scalars_unchanged() {
        assert_eq!(sanitize_value(Value::Null), Value::Null);
        assert_eq!(sanitize_value(json!(42)), json!(42));
        assert_eq!(sanitize_value(json!(1.5)), json!(1.5));
        assert_eq!(sanitize_value(json!(false)), json!(false));
    }

    #[test]
    fn test_attributes_and_tags_stripped_text_kept() {
        assert_eq!(
            sanitize_text(r#"<a href="javascript:evil()" onclick="x()">click</a> me"#),
            "click me"
        );
        assert_eq!(sanitize_text("<img src=x onerror=alert(1)>"), "");
        assert_eq!(sanitize_text("<style>body{}</style><p>para</p>"), "para");
    }

    #[test]
    fn test_raw_text_elements_dropped() {
        assert_eq!(sanitize_text("<noscript><b>n</b></noscript>ok"), "ok");
        assert_eq!(sanitize_text("<textarea>t</textarea>x"), "x");
        assert_eq!(sanitize_text("<select><option>a</option></select>b"), "b");
        assert_eq!(sanitize_text("x<plaintext><b>p</b>"), "x");
    }

    #[test]
    fn test_verbatim_keys_skipped() {
        let input = json!({ "name": "<b>x</b>", "password": " <i>p</i> " });
        assert_eq!(
            sanitize_value_except(input.clone(), &["password"]),
            json!({ "name": "x", "password": " <i>p</i> " })
        );
        assert_eq!(
            sanitize_value_except(input, &[]),
            json!({ "name": "x", "password": "p" })
        );
        assert_eq!(sanitize_value_except(json!(["<b>a</b>"]), &["a"]), json!(["a"]));
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(sanitize_text("   <b> bold </b>  "), "bold");
        assert_eq!(sanitize_text("plain"), "plain");
        assert_eq!(sanitize_text(""), "");
    }

    #[test]
    fn test_keys_and_order_preserved() {
        let input = json!({
            "<b>key</b>": "v",
            "list": ["<i>1</i>", "2", "<u>3</u>"],
            "deep": { "deeper": { "s": "<em>z</em>", "n": null } }
        });
        let output = sanitize_value(input);

        assert_eq!(output["<b>key</b>"], json!("v"));
        assert_eq!(output["list"], json!(["1", "2", "3"]));
        assert_eq!(output["deep"]["deeper"], json!({ "s": "z", "n": null }));
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            json!("<script>alert(1)</script>hello"),
            json!("a & b < c"),
            json!("&lt;b&gt;escaped&lt;/b&gt;"),
            json!({ "a": "<b>x</b>", "b": [1, "<i>y</i>", { "c": "  <p>z</p>  " }] }),
            json!(["\u{a0}nbsp", "<<>>", "\"quoted\""]),
            Value::Null,
        ];

        for sample in samples {
            let once = sanitize_value(sample);
            let twice = sanitize_value(once.clone());
            assert_eq!(once, twice);
        }
    }
}
