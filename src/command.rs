use serde_json::Value;

use crate::mapping;

/// Normalized command handed to the device layer. The dispatch step
/// matches on the variant instead of probing for fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Payload was already a structured device command; forwarded verbatim.
    PassThroughJson(Value),
    /// Boolean set, optionally aimed at one dps index.
    BooleanSet { set: bool, dps: Option<String> },
    /// Free-form set for indices whose values are device-native strings.
    RawSet { set: String, dps: String },
    /// Invert the device's current power state.
    Toggle,
}

/// Translate a decoded action into a [`Command`].
///
/// The effective token is the DPS command segment when a DPS index was
/// present, otherwise the plain command segment, otherwise the message
/// payload. "1" and "0" are always treated as boolean literals; anything
/// that parses as a JSON object or array is passed through verbatim.
pub fn translate(
    command_seg: Option<&str>,
    dps_index: Option<&str>,
    dps_command_seg: Option<&str>,
    payload: &str,
) -> Command {
    let token = if dps_index.is_some() && dps_command_seg.is_some_and(|s| !s.is_empty()) {
        dps_command_seg
    } else {
        command_seg
    };
    let token = match token.filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => payload,
    };

    // Numeric boolean literals never take the JSON path.
    if token != "1" && token != "0" {
        if let Some(json) = parse_structured(token) {
            return Command::PassThroughJson(json);
        }
        if token.eq_ignore_ascii_case("toggle") {
            return Command::Toggle;
        }
    }

    let set = token.eq_ignore_ascii_case("on") || token == "1";

    let Some(index) = dps_index else {
        return Command::BooleanSet { set, dps: None };
    };

    match index {
        "1" | "16" | "17" => Command::BooleanSet {
            set: mapping::map_set_bool(index, token, set),
            dps: Some(index.to_string()),
        },
        "4" | "6" => Command::RawSet {
            set: token.to_string(),
            dps: index.to_string(),
        },
        "5" | "8" => Command::RawSet {
            set: mapping::map_set_value(index, token),
            dps: index.to_string(),
        },
        _ => Command::BooleanSet {
            set,
            dps: Some(index.to_string()),
        },
    }
}

/// Strict JSON detection: only values that parse to an object or array
/// count as structured commands. Scalar-looking tokens ("77", "true")
/// stay on the shorthand path.
fn parse_structured(token: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(token) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}

impl Command {
    /// Render the command as the dps object the device expects,
    /// e.g. `{"8": "3"}`. `Toggle` has no set payload.
    pub fn dps_payload(&self) -> Option<Value> {
        match self {
            Command::Toggle => None,
            Command::BooleanSet { set, dps } => {
                let index = dps.as_deref().unwrap_or("1");
                Some(serde_json::json!({ index: set }))
            }
            Command::RawSet { set, dps } => {
                let index = dps.as_str();
                Some(serde_json::json!({ index: set }))
            }
            Command::PassThroughJson(value) => {
                let Value::Object(obj) = value else {
                    return None;
                };
                if let Some(set) = obj.get("set") {
                    let index = match obj.get("dps") {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Number(n)) => n.to_string(),
                        _ => "1".to_string(),
                    };
                    return Some(serde_json::json!({ index: set.clone() }));
                }
                if let Some(Value::Object(data)) = obj.get("data") {
                    return Some(Value::Object(data.clone()));
                }
                // Otherwise the object already is a dps map.
                Some(value.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn on_off_become_boolean_sets() {
        assert_eq!(
            translate(Some("on"), None, None, ""),
            Command::BooleanSet { set: true, dps: None }
        );
        assert_eq!(
            translate(Some("off"), None, None, ""),
            Command::BooleanSet { set: false, dps: None }
        );
        assert_eq!(
            translate(Some("ON"), None, None, ""),
            Command::BooleanSet { set: true, dps: None }
        );
    }

    #[test]
    fn numeric_literals_are_never_json_parsed() {
        assert_eq!(
            translate(Some("1"), None, None, ""),
            Command::BooleanSet { set: true, dps: None }
        );
        assert_eq!(
            translate(Some("0"), None, None, ""),
            Command::BooleanSet { set: false, dps: None }
        );
    }

    #[test]
    fn json_object_passes_through_verbatim() {
        let cmd = translate(
            Some(r#"{"set":true,"color":"ff0000"}"#),
            None,
            None,
            "",
        );
        assert_eq!(
            cmd,
            Command::PassThroughJson(json!({"set": true, "color": "ff0000"}))
        );
    }

    #[test]
    fn malformed_json_falls_back_to_shorthand() {
        assert_eq!(
            translate(Some(r#"{"set":tru"#), None, None, ""),
            Command::BooleanSet { set: false, dps: None }
        );
    }

    #[test]
    fn toggle_is_case_insensitive() {
        assert_eq!(translate(Some("toggle"), None, None, ""), Command::Toggle);
        assert_eq!(translate(Some("Toggle"), None, None, ""), Command::Toggle);
    }

    #[test]
    fn payload_stands_in_for_missing_token() {
        assert_eq!(
            translate(None, None, None, "on"),
            Command::BooleanSet { set: true, dps: None }
        );
        assert_eq!(
            translate(None, None, None, r#"{"set":false}"#),
            Command::PassThroughJson(json!({"set": false}))
        );
    }

    #[test]
    fn switch_index_maps_off_token() {
        assert_eq!(
            translate(Some("dps"), Some("1"), Some("off"), ""),
            Command::BooleanSet { set: false, dps: Some("1".into()) }
        );
    }

    #[test]
    fn fan_speed_index_maps_vocabulary() {
        assert_eq!(
            translate(Some("dps"), Some("8"), Some("high"), ""),
            Command::RawSet { set: "3".into(), dps: "8".into() }
        );
    }

    #[test]
    fn free_form_index_keeps_token_verbatim() {
        assert_eq!(
            translate(Some("dps"), Some("6"), Some("77"), ""),
            Command::RawSet { set: "77".into(), dps: "6".into() }
        );
    }

    #[test]
    fn mode_index_passes_unmapped_token_through() {
        assert_eq!(
            translate(Some("dps"), Some("5"), Some("heat"), ""),
            Command::RawSet { set: "heat".into(), dps: "5".into() }
        );
    }

    #[test]
    fn unknown_index_keeps_boolean_semantics() {
        assert_eq!(
            translate(Some("dps"), Some("20"), Some("on"), ""),
            Command::BooleanSet { set: true, dps: Some("20".into()) }
        );
    }

    #[test]
    fn empty_dps_token_falls_back_to_command_segment() {
        assert_eq!(
            translate(Some("on"), Some("16"), Some(""), ""),
            Command::BooleanSet { set: true, dps: Some("16".into()) }
        );
    }

    #[test]
    fn boolean_set_payload_targets_power_dps_by_default() {
        let cmd = Command::BooleanSet { set: true, dps: None };
        assert_eq!(cmd.dps_payload(), Some(json!({"1": true})));
    }

    #[test]
    fn raw_set_payload_targets_its_index() {
        let cmd = Command::RawSet { set: "3".into(), dps: "8".into() };
        assert_eq!(cmd.dps_payload(), Some(json!({"8": "3"})));
    }

    #[test]
    fn pass_through_set_shape_is_normalized() {
        let cmd = Command::PassThroughJson(json!({"set": true, "dps": 7}));
        assert_eq!(cmd.dps_payload(), Some(json!({"7": true})));
    }

    #[test]
    fn pass_through_dps_map_is_kept() {
        let cmd = Command::PassThroughJson(json!({"2": "colour", "5": "ff0000"}));
        assert_eq!(
            cmd.dps_payload(),
            Some(json!({"2": "colour", "5": "ff0000"}))
        );
    }

    #[test]
    fn toggle_has_no_set_payload() {
        assert_eq!(Command::Toggle.dps_payload(), None);
    }
}
