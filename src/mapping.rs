//! Per-dps vocabulary tables translating human tokens to device-native
//! codes. Unknown indices and unmapped tokens fall through unchanged.

/// Boolean vocabulary for the switch-like indices (1, 16, 17).
/// Returns `default` when the token is not in the table.
pub fn map_set_bool(dps_index: &str, token: &str, default: bool) -> bool {
    match dps_index {
        "1" | "16" | "17" => match token {
            "on" => true,
            "off" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Enum vocabulary for the mode (5) and fan-speed (8) indices.
/// Unmapped tokens pass through verbatim.
pub fn map_set_value(dps_index: &str, token: &str) -> String {
    let mapped = match dps_index {
        "5" => match token {
            "cool" => "3",
            "dry" => "2",
            "fan_only" => "4",
            other => other,
        },
        "8" => match token {
            "auto" => "0",
            "low" => "1",
            "medium" => "2",
            "high" => "3",
            other => other,
        },
        _ => token,
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_indices_map_on_off() {
        assert!(map_set_bool("1", "on", false));
        assert!(!map_set_bool("16", "off", true));
        assert!(!map_set_bool("17", "off", true));
    }

    #[test]
    fn switch_indices_keep_default_for_unknown_tokens() {
        assert!(map_set_bool("1", "dim", true));
        assert!(!map_set_bool("1", "ON", false)); // vocabulary is lowercase
    }

    #[test]
    fn mode_index_maps_vocabulary() {
        assert_eq!(map_set_value("5", "cool"), "3");
        assert_eq!(map_set_value("5", "dry"), "2");
        assert_eq!(map_set_value("5", "fan_only"), "4");
        assert_eq!(map_set_value("5", "heat"), "heat");
    }

    #[test]
    fn fan_speed_index_maps_vocabulary() {
        assert_eq!(map_set_value("8", "auto"), "0");
        assert_eq!(map_set_value("8", "low"), "1");
        assert_eq!(map_set_value("8", "medium"), "2");
        assert_eq!(map_set_value("8", "high"), "3");
        assert_eq!(map_set_value("8", "turbo"), "turbo");
    }

    #[test]
    fn unknown_index_passes_token_through() {
        assert_eq!(map_set_value("42", "high"), "high");
    }
}
