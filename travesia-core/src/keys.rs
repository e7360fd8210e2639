//! Key naming shared by every cache backend.

/// Set of session ids currently connected.
pub const CONNECTED_USERS: &str = "usuarios_conectados";

pub const TEMP_RESERVATION_PREFIX: &str = "temp_reserva:";
pub const RECENT_SEARCH_PREFIX: &str = "recent_search:";

/// Default length of the per-user recent search window.
pub const DEFAULT_RECENT_SEARCHES: usize = 5;

pub fn temp_reservation(reservation_id: &str) -> String {
    format!("{}{}", TEMP_RESERVATION_PREFIX, reservation_id)
}

pub fn recent_search(user_id: &str) -> String {
    format!("{}{}", RECENT_SEARCH_PREFIX, user_id)
}

/// Glob pattern matching every temporary reservation key.
pub fn temp_reservation_pattern() -> String {
    format!("{}*", TEMP_RESERVATION_PREFIX)
}

/// Extracts the reservation id back out of a `temp_reserva:<id>` key.
pub fn reservation_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(TEMP_RESERVATION_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(temp_reservation("R-17"), "temp_reserva:R-17");
        assert_eq!(recent_search("u1"), "recent_search:u1");
        assert_eq!(temp_reservation_pattern(), "temp_reserva:*");
    }

    #[test]
    fn test_reservation_id_from_key() {
        assert_eq!(reservation_id_from_key("temp_reserva:R-17"), Some("R-17"));
        assert_eq!(reservation_id_from_key("recent_search:u1"), None);
    }
}
