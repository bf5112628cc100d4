//! `%%{init: {...}}%%` configuration directives.

use crate::lex::{TokenKind, Tokens};
use crate::{Config, Diagnostic, Limits};
use serde_json::Value;

/// Collects every `init`/`initialize` directive in `tokens` into one config overlay.
///
/// Directives are parsed as JSON5 objects. Malformed directives, unknown directive types and
/// attempts to change resource caps are reported as diagnostics and otherwise ignored.
pub fn collect_directives(tokens: &Tokens<'_>) -> (Config, Vec<Diagnostic>) {
    let mut merged = Config::empty_object();
    let mut diagnostics = Vec::new();
    let source = tokens.source();

    for tok in tokens.iter().filter(|t| t.kind == TokenKind::Comment) {
        let Some(body) = tok.text.strip_prefix("%%{") else {
            continue;
        };
        let line = source[..tok.offset].matches('\n').count() + 1;
        let mut report = |message: String| {
            tracing::debug!(line, %message, "ignoring directive");
            diagnostics.push(Diagnostic {
                line,
                offset: tok.offset,
                message,
            });
        };

        let Some(end) = body.rfind("}%%") else {
            report("unterminated directive".to_string());
            continue;
        };
        let body = body[..end].trim();
        let (ty, args) = match body.split_once(':') {
            Some((ty, args)) => (ty.trim(), args.trim()),
            None => (body, ""),
        };
        match ty {
            "init" | "initialize" => {}
            // Recognized but without effect on layout.
            "wrap" => continue,
            other => {
                report(format!("unknown directive type `{other}`"));
                continue;
            }
        }
        let mut value = match json5::from_str::<Value>(args) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => {
                report("directive arguments must be an object".to_string());
                continue;
            }
            Err(err) => {
                report(format!("invalid directive: {err}"));
                continue;
            }
        };
        if let Value::Object(map) = &mut value {
            for key in Limits::KEYS {
                if map.remove(key).is_some() {
                    report(format!("`{key}` cannot be set from a directive"));
                }
            }
        }
        sanitize_directive(&mut value);
        merged.deep_merge(&value);
    }

    (merged, diagnostics)
}

fn sanitize_directive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("secure");
            map.retain(|k, _| !k.starts_with("__"));
            for (_, v) in map.iter_mut() {
                sanitize_directive(v);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                sanitize_directive(v);
            }
        }
        Value::String(s) => {
            if s.contains('<') || s.contains('>') {
                s.clear();
            }
        }
        _ => {}
    }
}
