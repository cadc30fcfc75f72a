//! Fallback HTTP/JSON tree provider.
//!
//! The secondary source serves its whole sensor hierarchy as one JSON
//! document: nested nodes with a `Children` array, where leaves carry
//! `SensorId`, `Type`, `Text` and a locale-decorated `Value` string
//! ("45.0 \u{b0}C", "1 234,5 MHz"). Every fetch pulls and flattens the
//! full tree; the endpoint offers no per-sensor addressing.

use serde_json::Value;
use statlink_common::consts::HTTP_TIMEOUT_S;
use std::time::Duration;
use tracing::debug;

use super::SourceError;

/// One leaf collected from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RestSensor {
    /// Slash-path id, e.g. `/amdcpu/0/temperature/2`.
    pub sensor_id: String,
    /// Display text of the node.
    pub label: String,
    /// Raw `Type` string ("Temperature", "Load", "SmallData"...).
    pub kind: String,
    pub value: f64,
    /// Unit as decorated onto the value string.
    pub unit: String,
}

/// Client for the tree endpoint.
pub struct RestProvider {
    client: reqwest::Client,
    url: String,
}

impl RestProvider {
    pub fn new(host: &str, port: u16) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_S))
            .build()?;
        Ok(Self {
            client,
            url: format!("http://{host}:{port}/data.json"),
        })
    }

    /// Fetch and flatten the full tree.
    ///
    /// A reachable endpoint with zero sensors errors with
    /// [`SourceError::Empty`]; it means the backing service is up but
    /// not actually monitoring anything.
    pub async fn probe(&self) -> Result<Vec<RestSensor>, SourceError> {
        let tree = self.fetch_tree().await?;
        let mut sensors = Vec::new();
        flatten_tree(&tree, &mut sensors);
        if sensors.is_empty() {
            return Err(SourceError::Empty {
                what: self.url.clone(),
            });
        }
        debug!(count = sensors.len(), "rest probe complete");
        Ok(sensors)
    }

    /// Current value of one sensor. Costs a full tree fetch.
    pub async fn read_value(&self, sensor_id: &str) -> Result<f64, SourceError> {
        let tree = self.fetch_tree().await?;
        let mut sensors = Vec::new();
        flatten_tree(&tree, &mut sensors);
        sensors
            .into_iter()
            .find(|s| s.sensor_id == sensor_id)
            .map(|s| s.value)
            .ok_or_else(|| SourceError::Missing {
                id: sensor_id.to_string(),
            })
    }

    async fn fetch_tree(&self) -> Result<Value, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let tree = response.error_for_status()?.json().await?;
        Ok(tree)
    }
}

/// Collect every node carrying a `SensorId` and a parseable value.
pub fn flatten_tree(node: &Value, out: &mut Vec<RestSensor>) {
    if let Some(obj) = node.as_object() {
        if let (Some(sensor_id), Some(raw_value)) = (
            obj.get("SensorId").and_then(Value::as_str),
            obj.get("Value").and_then(Value::as_str),
        ) {
            if let Some(value) = parse_decorated(raw_value) {
                out.push(RestSensor {
                    sensor_id: sensor_id.to_string(),
                    label: obj
                        .get("Text")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    kind: obj
                        .get("Type")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    value,
                    unit: decorated_unit(raw_value),
                });
            }
        }
        if let Some(children) = obj.get("Children").and_then(Value::as_array) {
            for child in children {
                flatten_tree(child, out);
            }
        }
    }
}

/// Parse the numeric head of a decorated value string.
///
/// Handles locale quirks: comma decimals and thin-space thousands
/// grouping ("1 234,5 MHz").
pub fn parse_decorated(text: &str) -> Option<f64> {
    let mut number = String::new();
    let mut chars = text.trim_start().chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' | '-' | '+' => {
                number.push(c);
                chars.next();
            }
            ',' | '.' => {
                number.push('.');
                chars.next();
            }
            // A space inside the digits is thousands grouping; a space
            // followed by anything else ends the number.
            ' ' | '\u{a0}' | '\u{202f}' if !number.is_empty() => {
                chars.next();
                if !chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                    break;
                }
            }
            _ => break,
        }
    }
    // Only the last separator is the decimal point.
    if number.matches('.').count() > 1 {
        let last = number.rfind('.').unwrap();
        let (head, tail) = number.split_at(last);
        number = format!("{}{}", head.replace('.', ""), tail);
    }
    number.parse().ok()
}

/// Unit text trailing the numeric head, if any.
fn decorated_unit(text: &str) -> String {
    text.trim()
        .rsplit(' ')
        .next()
        .filter(|tail| tail.chars().any(|c| c.is_alphabetic() || c == '%'))
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_decorated_values() {
        assert_eq!(parse_decorated("45.0 \u{b0}C"), Some(45.0));
        assert_eq!(parse_decorated("1450 RPM"), Some(1450.0));
        assert_eq!(parse_decorated("98 %"), Some(98.0));
        assert_eq!(parse_decorated("-12.5 W"), Some(-12.5));
    }

    #[test]
    fn parses_locale_decorated_values() {
        assert_eq!(parse_decorated("45,5 \u{b0}C"), Some(45.5));
        assert_eq!(parse_decorated("1 234,5 MHz"), Some(1234.5));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(parse_decorated(""), None);
        assert_eq!(parse_decorated("N/A"), None);
    }

    #[test]
    fn flatten_collects_all_leaves() {
        let tree = json!({
            "id": 0,
            "Text": "Sensor",
            "Children": [{
                "Text": "AMD Ryzen 9 5900X",
                "Children": [
                    {
                        "Text": "Core (Tctl/Tdie)",
                        "SensorId": "/amdcpu/0/temperature/2",
                        "Type": "Temperature",
                        "Value": "62.5 \u{b0}C",
                        "Children": []
                    },
                    {
                        "Text": "CPU Total",
                        "SensorId": "/amdcpu/0/load/0",
                        "Type": "Load",
                        "Value": "17.2 %",
                        "Children": []
                    }
                ]
            }]
        });

        let mut sensors = Vec::new();
        flatten_tree(&tree, &mut sensors);

        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].sensor_id, "/amdcpu/0/temperature/2");
        assert_eq!(sensors[0].value, 62.5);
        assert_eq!(sensors[0].unit, "\u{b0}C");
        assert_eq!(sensors[1].kind, "Load");
        assert_eq!(sensors[1].unit, "%");
    }

    #[test]
    fn flatten_skips_unparseable_leaves() {
        let tree = json!({
            "Children": [{
                "Text": "Broken",
                "SensorId": "/x/0/other/0",
                "Type": "Other",
                "Value": "N/A",
                "Children": []
            }]
        });
        let mut sensors = Vec::new();
        flatten_tree(&tree, &mut sensors);
        assert!(sensors.is_empty());
    }

    #[test]
    fn flatten_of_empty_tree_yields_nothing() {
        let tree = json!({"id": 0, "Text": "Sensor", "Children": []});
        let mut sensors = Vec::new();
        flatten_tree(&tree, &mut sensors);
        assert!(sensors.is_empty());
    }
}
