//! Domain metadata and constants
//!
//! Names of the entity domains the dashboard cares about, which of them are
//! read-only, and the small vocabulary of "on" states used when toggling.

pub const SENSOR: &str = "sensor";
pub const BINARY_SENSOR: &str = "binary_sensor";
pub const SWITCH: &str = "switch";
pub const LIGHT: &str = "light";
pub const FAN: &str = "fan";
pub const HUMIDIFIER: &str = "humidifier";
pub const CLIMATE: &str = "climate";
pub const CAMERA: &str = "camera";

/// Domains that only report state and cannot be switched.
pub static READONLY_DOMAINS: &[&str] = &[SENSOR, BINARY_SENSOR, CAMERA, "weather", "sun"];

/// States treated as "currently on" for toggling purposes.
pub static ON_STATES: &[&str] = &["on", "playing", "open"];

/// Check if a domain is read-only
pub fn is_readonly_domain(domain: &str) -> bool {
    READONLY_DOMAINS.contains(&domain)
}

/// Check if a state string means the device is on
pub fn is_on_state(state: &str) -> bool {
    ON_STATES.contains(&state)
}

/// Service a toggle should call given the actuator's current state
pub fn toggle_service(current_state: &str) -> &'static str {
    if is_on_state(current_state) {
        "turn_off"
    } else {
        "turn_on"
    }
}

/// Service used to set a speed/level on a controllable domain.
///
/// Returns `None` for domains with no speed control.
pub fn speed_service(domain: &str) -> Option<&'static str> {
    match domain {
        FAN => Some("set_percentage"),
        HUMIDIFIER => Some("set_humidity"),
        CLIMATE => Some("set_temperature"),
        LIGHT => Some("turn_on"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readonly_domains() {
        assert!(is_readonly_domain("sensor"));
        assert!(is_readonly_domain("binary_sensor"));
        assert!(is_readonly_domain("camera"));
        assert!(!is_readonly_domain("switch"));
        assert!(!is_readonly_domain("fan"));
    }

    #[test]
    fn test_toggle_service() {
        assert_eq!(toggle_service("on"), "turn_off");
        assert_eq!(toggle_service("playing"), "turn_off");
        assert_eq!(toggle_service("open"), "turn_off");
        assert_eq!(toggle_service("off"), "turn_on");
        assert_eq!(toggle_service("unavailable"), "turn_on");
    }

    #[test]
    fn test_speed_service() {
        assert_eq!(speed_service("fan"), Some("set_percentage"));
        assert_eq!(speed_service("switch"), None);
    }
}
