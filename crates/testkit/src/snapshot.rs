//! Golden JSON snapshots for deterministic tests.
//!
//! Values are serialized as canonical pretty JSON (object keys sorted, trailing
//! newline) and compared with a file on disk. Set `HPL_UPDATE_SNAPSHOTS=1` to
//! write the current value instead of comparing.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Environment variable that enables snapshot updates.
pub const UPDATE_SNAPSHOTS_ENV: &str = "HPL_UPDATE_SNAPSHOTS";

/// Assert that `value` matches the JSON snapshot stored at `path`.
///
/// With `HPL_UPDATE_SNAPSHOTS=1` the snapshot file is (re)written instead.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let actual = canonical_json(value)?;

    if should_update_snapshots() {
        return write_snapshot(path, &actual);
    }

    let expected = fs::read_to_string(path).with_context(|| {
        format!(
            "Snapshot missing at {} (run with {}=1 to create it)",
            path.display(),
            UPDATE_SNAPSHOTS_ENV
        )
    })?;

    if let Some((line, want, got)) = first_difference(&expected, &actual) {
        anyhow::bail!(
            "Snapshot mismatch at {} line {}: expected `{}`, got `{}` (run with {}=1 to update)",
            path.display(),
            line,
            want,
            got,
            UPDATE_SNAPSHOTS_ENV
        );
    }

    Ok(())
}

fn should_update_snapshots() -> bool {
    matches!(
        std::env::var(UPDATE_SNAPSHOTS_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn write_snapshot(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write snapshot {}", path.display()))
}

/// First differing line (1-based) between two snapshot texts.
/// Line endings are normalized so checkouts with CRLF still compare equal.
fn first_difference<'a>(expected: &'a str, actual: &'a str) -> Option<(usize, &'a str, &'a str)> {
    let mut want = expected.lines();
    let mut got = actual.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (want.next(), got.next()) {
            (None, None) => return None,
            (w, g) if w == g => continue,
            (w, g) => return Some((line, w.unwrap_or("<eof>"), g.unwrap_or("<eof>"))),
        }
    }
}

/// Serialize `value` as canonical pretty JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let value = canonicalize_value(value);
    let mut s = serde_json::to_string_pretty(&value).context("Failed to format snapshot JSON")?;
    s.push('\n');
    Ok(s)
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, canonicalize_value(v));
            }
            Value::Object(out)
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_recursively() {
        let text = canonical_json(&json!({"b": 1, "a": {"z": true, "y": [ {"d": 0, "c": 1} ]}})).unwrap();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        let d = text.find("\"d\"").unwrap();
        assert!(a < b);
        assert!(c < d);
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn difference_reports_line() {
        assert_eq!(first_difference("a\nb\n", "a\r\nb\r\n"), None);
        assert_eq!(first_difference("a\nb\n", "a\nc\n"), Some((2, "b", "c")));
        assert_eq!(first_difference("a\n", "a\nb\n"), Some((2, "<eof>", "b")));
    }
}
