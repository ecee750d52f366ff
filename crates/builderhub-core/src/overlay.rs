//! Config/secret overlay.
//!
//! Builder configuration is an opaque JSON document; secrets are stored as a
//! flat map from dotted paths to string values. [`merge`] writes each secret
//! into the document at its path and [`flatten`] turns a nested secrets
//! document into that flat form.
//!
//! Path syntax: segments are separated by `.`; a segment of the form `[i]`
//! addresses the i-th element of an array, any other segment is an object key.
//! For example `orderflow_proxy.tls_hosts.[1]`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Orders keys before indices; indices compare numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse_path(path: &str) -> Result<Vec<Segment<'_>>> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "empty path"));
    }
    path.split('.')
        .map(|raw| {
            if raw.is_empty() {
                return Err(Error::invalid_path(path, "empty segment"));
            }
            let index = raw
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .and_then(|s| s.parse::<usize>().ok());
            Ok(index.map_or(Segment::Key(raw), Segment::Index))
        })
        .collect()
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Placeholder for a node that does not exist yet, shaped for the segment
/// that will descend into it.
fn vacant(next: Option<&Segment<'_>>) -> Value {
    match next {
        Some(Segment::Index(_)) => Value::Array(Vec::new()),
        Some(Segment::Key(_)) => Value::Object(Map::new()),
        None => Value::Null,
    }
}

fn set_path(node: &mut Value, path: &str, segments: &[Segment<'_>], value: &str) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        *node = Value::String(value.to_string());
        return Ok(());
    };

    let child = match (node, head) {
        (Value::Object(map), Segment::Key(key)) => map
            .entry((*key).to_string())
            .or_insert_with(|| vacant(rest.first())),
        (Value::Array(items), Segment::Index(index)) => {
            if *index == items.len() {
                items.push(vacant(rest.first()));
            }
            let len = items.len();
            items.get_mut(*index).ok_or_else(|| {
                Error::invalid_path(path, format!("index {index} out of bounds (len {len})"))
            })?
        }
        (Value::Object(_), Segment::Index(index)) => {
            return Err(Error::invalid_path(
                path,
                format!("index [{index}] applied to an object"),
            ));
        }
        (other, Segment::Key(key)) => {
            return Err(Error::invalid_path(
                path,
                format!("cannot descend into {} with key '{key}'", kind(other)),
            ));
        }
        (other, Segment::Index(index)) => {
            return Err(Error::invalid_path(
                path,
                format!("cannot descend into {} with index [{index}]", kind(other)),
            ));
        }
    };

    set_path(child, path, rest, value)
}

/// Overlay `secrets` onto `config`, returning the merged document.
///
/// Each leaf is replaced by the secret string whatever its previous type;
/// missing intermediate objects are created. Entries are applied segment by
/// segment in path order with `[i]` indices compared numerically, so array
/// elements are created in sequence and aliasing paths resolve
/// deterministically (the later path wins). If any path runs through a
/// scalar, the whole merge fails and `config` is left untouched.
pub fn merge(config: &Value, secrets: &BTreeMap<String, String>) -> Result<Value> {
    let mut entries = secrets
        .iter()
        .map(|(path, value)| Ok((parse_path(path)?, path.as_str(), value.as_str())))
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by(|(a, a_path, _), (b, b_path, _)| {
        a.cmp(b).then_with(|| a_path.cmp(b_path))
    });

    let mut merged = config.clone();
    for (segments, path, value) in &entries {
        set_path(&mut merged, path, segments, value)?;
    }
    Ok(merged)
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn flatten_into(value: &Value, prefix: &str, out: &mut BTreeMap<String, String>) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, &join(prefix, key), out)?;
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, &join(prefix, &format!("[{index}]")), out)?;
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        _ => return Err(Error::NonStringSecret(prefix.to_string())),
    }
    Ok(())
}

/// Flatten a nested secrets document into dotted-path form.
///
/// The document must be a JSON object and every leaf must be a string.
pub fn flatten(document: &Value) -> Result<BTreeMap<String, String>> {
    if !document.is_object() {
        return Err(Error::InvalidDocument(format!(
            "secrets must be a JSON object, got {}",
            kind(document)
        )));
    }
    let mut out = BTreeMap::new();
    flatten_into(document, "", &mut out)?;
    Ok(out)
}

/// Parse raw bytes as JSON and [`flatten`] them.
pub fn flatten_slice(bytes: &[u8]) -> Result<BTreeMap<String, String>> {
    let document: Value = serde_json::from_slice(bytes)?;
    flatten(&document)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn secrets(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn merge_replaces_nested_leaf() {
        let merged = merge(&json!({"a": {"b": "X"}}), &secrets(&[("a.b", "Y")])).unwrap();
        assert_eq!(merged, json!({"a": {"b": "Y"}}));
    }

    #[test]
    fn merge_overwrites_non_string_leaf() {
        let config = json!({"rbuilder": {"always_seal": true, "priority": 3}});
        let merged = merge(
            &config,
            &secrets(&[("rbuilder.always_seal", "no"), ("rbuilder.priority", "7")]),
        )
        .unwrap();
        assert_eq!(merged, json!({"rbuilder": {"always_seal": "no", "priority": "7"}}));
    }

    #[test]
    fn merge_creates_missing_objects() {
        let merged = merge(&json!({}), &secrets(&[("a.b.c", "v")])).unwrap();
        assert_eq!(merged, json!({"a": {"b": {"c": "v"}}}));
    }

    #[test]
    fn merge_addresses_array_elements() {
        let config = json!({"proxy": {"tls_hosts": ["1.2.3.4", "old.example"]}});
        let merged = merge(&config, &secrets(&[("proxy.tls_hosts.[1]", "new.example")])).unwrap();
        assert_eq!(merged, json!({"proxy": {"tls_hosts": ["1.2.3.4", "new.example"]}}));
    }

    #[test]
    fn merge_reaches_objects_inside_arrays() {
        let config = json!({"relays": [{"name": "a", "url": ""}, {"name": "b", "url": ""}]});
        let merged = merge(&config, &secrets(&[("relays.[1].url", "https://b")])).unwrap();
        assert_eq!(merged["relays"][1]["url"], "https://b");
        assert_eq!(merged["relays"][0]["url"], "");
    }

    #[test]
    fn merge_appends_at_array_end() {
        let merged = merge(&json!({"hosts": ["a"]}), &secrets(&[("hosts.[1]", "b")])).unwrap();
        assert_eq!(merged, json!({"hosts": ["a", "b"]}));
    }

    #[test]
    fn merge_builds_long_arrays_in_index_order() {
        let hosts: Vec<String> = (0..12).map(|i| format!("h{i}")).collect();
        let flat = flatten(&json!({"hosts": &hosts})).unwrap();
        // "hosts.[10]" sorts before "hosts.[2]" as a string.
        let position = |path: &str| flat.keys().position(|k| k == path).unwrap();
        assert!(position("hosts.[10]") < position("hosts.[2]"));

        let merged = merge(&json!({}), &flat).unwrap();
        assert_eq!(merged, json!({"hosts": hosts}));
    }

    #[test]
    fn merge_rejects_index_past_end() {
        let err = merge(&json!({"hosts": ["a"]}), &secrets(&[("hosts.[5]", "b")])).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn merge_rejects_traversal_through_string() {
        let err = merge(&json!({"a": "X"}), &secrets(&[("a.b", "Y")])).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { ref path, .. } if path == "a.b"));
    }

    #[test]
    fn merge_failure_is_all_or_nothing() {
        let config = json!({"a": "X", "z": {"k": "old"}});
        // "a.b" sorts before "z.k", so the failing entry is applied first;
        // the error must still leave the caller's document untouched.
        let result = merge(&config, &secrets(&[("a.b", "Y"), ("z.k", "new")]));
        assert!(result.is_err());
        assert_eq!(config["z"]["k"], "old");
    }

    #[test]
    fn merge_rejects_key_on_array_and_index_on_object() {
        assert!(merge(&json!({"a": []}), &secrets(&[("a.key", "v")])).is_err());
        assert!(merge(&json!({"a": {}}), &secrets(&[("a.[0]", "v")])).is_err());
    }

    #[test]
    fn merge_rejects_empty_segments() {
        assert!(merge(&json!({}), &secrets(&[("a..b", "v")])).is_err());
        assert!(merge(&json!({}), &secrets(&[("", "v")])).is_err());
    }

    #[test]
    fn merge_with_empty_overlay_is_identity() {
        let config = json!({"a": [1, 2, {"b": null}]});
        assert_eq!(merge(&config, &BTreeMap::new()).unwrap(), config);
    }

    #[test]
    fn flatten_emits_dotted_paths() {
        let doc = json!({
            "proxy": {"key": "k1", "hosts": ["h0", "h1"]},
            "top": "t"
        });
        let flat = flatten(&doc).unwrap();
        assert_eq!(
            flat,
            secrets(&[
                ("proxy.hosts.[0]", "h0"),
                ("proxy.hosts.[1]", "h1"),
                ("proxy.key", "k1"),
                ("top", "t"),
            ])
        );
    }

    #[test]
    fn flatten_rejects_non_string_leaf() {
        let err = flatten(&json!({"a": {"b": "ok", "c": 1}})).unwrap_err();
        assert!(matches!(err, Error::NonStringSecret(ref p) if p == "a.c"));

        assert!(flatten(&json!({"a": [true]})).is_err());
        assert!(flatten(&json!({"a": null})).is_err());
    }

    #[test]
    fn flatten_requires_object_root() {
        assert!(matches!(
            flatten(&json!(["a"])).unwrap_err(),
            Error::InvalidDocument(_)
        ));
    }

    #[test]
    fn flatten_slice_reports_bad_json() {
        assert!(matches!(flatten_slice(b"{not json").unwrap_err(), Error::Json(_)));
    }

    #[test]
    fn flatten_then_merge_reproduces_string_leaves() {
        let original = json!({
            "proxy": {"signing_key": "0xabc", "hosts": ["a.example", "b.example"]},
            "relays": [{"url": "https://r1"}, {"url": "https://r2"}],
            "extra": "data"
        });
        let template = json!({
            "proxy": {"signing_key": "", "hosts": ["", ""]},
            "relays": [{"url": ""}, {"url": ""}],
            "extra": ""
        });

        let flat = flatten(&original).unwrap();
        let merged = merge(&template, &flat).unwrap();
        assert_eq!(merged, original);
    }
}
