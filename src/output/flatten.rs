use std::collections::BTreeMap;

use serde_json::Value;

/// Joins nested object keys
pub const SEPARATOR: &str = "__";

/// Flatten nested objects/arrays into a single level map
///
/// ```
/// use exabgpctl::output::flat;
/// use serde_json::json;
///
/// let data = json!({"key1": {"key11": "value11"}, "key2": ["one", "two"]});
/// let flat = flat(&data);
/// assert_eq!(flat["key1__key11"], "value11");
/// assert_eq!(flat["key2[1]"], "two");
/// ```
pub fn flat(value: &Value) -> BTreeMap<String, Value> {
    let mut items = BTreeMap::new();
    flat_into(value, None, &mut items);
    items
}

fn flat_into(value: &Value, prefix: Option<&str>, items: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let key = match prefix {
                    Some(prefix) => format!("{}{}{}", prefix, SEPARATOR, key),
                    None => key.clone(),
                };
                flat_into(value, Some(&key), items);
            }
        }
        Value::Array(values) => {
            for (i, value) in values.iter().enumerate() {
                let key = format!("{}[{}]", prefix.unwrap_or_default(), i);
                flat_into(value, Some(&key), items);
            }
        }
        leaf => {
            if let Some(key) = prefix {
                items.insert(key.to_string(), leaf.clone());
            }
        }
    }
}

/// Scalars print raw: strings without their quotes
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `key=value` lines, sorted by key
pub fn render(value: &Value) -> String {
    flat(value)
        .iter()
        .map(|(key, value)| format!("{}={}", key, scalar_to_string(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Value {
        json!({
            "key1": {
                "key11": {"key111": "value111"},
                "key12": {"key121": [{"key1211": "value1211"}]},
            },
            "key2": ["one", "two", "three"],
        })
    }

    #[test]
    fn test_flat() {
        let expected: BTreeMap<String, Value> = vec![
            ("key1__key11__key111", "value111"),
            ("key1__key12__key121[0]__key1211", "value1211"),
            ("key2[0]", "one"),
            ("key2[1]", "two"),
            ("key2[2]", "three"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
        assert_eq!(flat(&nested()), expected);
    }

    #[test]
    fn test_flat_keeps_every_leaf() {
        let data = json!({
            "a": [[1, 2], {"b": null, "c": true}],
            "d": {"e": {}, "f": []},
            "g": 1.5,
        });
        let items = flat(&data);
        assert_eq!(items.len(), 5);
        assert_eq!(items["a[0][0]"], json!(1));
        assert_eq!(items["a[0][1]"], json!(2));
        assert_eq!(items["a[1]__b"], Value::Null);
        assert_eq!(items["a[1]__c"], json!(true));
        assert_eq!(items["g"], json!(1.5));
        // Empty containers have no leaves
        assert!(!items.keys().any(|k| k.starts_with("d")));
    }

    #[test]
    fn test_flat_top_level_array() {
        let items = flat(&json!(["one", "two"]));
        assert_eq!(items["[0]"], "one");
        assert_eq!(items["[1]"], "two");
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(&nested()),
            "key1__key11__key111=value111\n\
             key1__key12__key121[0]__key1211=value1211\n\
             key2[0]=one\n\
             key2[1]=two\n\
             key2[2]=three"
        );
        assert_eq!(render(&json!({"up": true, "pid": null})), "pid=null\nup=true");
    }
}
