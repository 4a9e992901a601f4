use serde_json::Value;

/// Extract the text to send from one corpus record.
///
/// Records are JSON message exports; the first body's `action` wins over
/// its `msg`. Anything else (bad JSON, missing or empty fields) is `None`.
pub fn extract_action(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    let body = value.get("payload")?.get("bodies")?.as_array()?.first()?;

    ["action", "msg"]
        .into_iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
