//! MQTT-style topic filter matching.

use crate::TransportError;

/// Returns `true` if `topic` matches the subscription `filter`.
///
/// Levels are separated by `/`. In the filter, `+` matches exactly one
/// level and `#` (only valid as the last level) matches the remaining
/// levels, including none.
///
/// ```
/// use parley_transport::topic_matches;
///
/// assert!(topic_matches("room/+/discovery", "room/lobby/discovery"));
/// assert!(!topic_matches("room/+/discovery", "room/lobby"));
/// assert!(topic_matches("room/#", "room/lobby/discovery"));
/// ```
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Checks that `filter` is a well-formed subscription filter.
pub fn validate_filter(filter: &str) -> Result<(), TransportError> {
    if filter.is_empty() {
        return Err(TransportError::InvalidFilter("empty filter".into()));
    }
    let levels: Vec<&str> = filter.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        let is_last = i + 1 == levels.len();
        if level.contains('#') && (*level != "#" || !is_last) {
            return Err(TransportError::InvalidFilter(format!(
                "'#' must be the whole last level in {filter:?}"
            )));
        }
        if level.contains('+') && *level != "+" {
            return Err(TransportError::InvalidFilter(format!(
                "'+' must occupy a whole level in {filter:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_matches_exact() {
        assert!(topic_matches("room/lobby", "room/lobby"));
        assert!(!topic_matches("room/lobby", "room/global"));
    }

    #[test]
    fn test_topic_matches_single_level_wildcard() {
        assert!(topic_matches("room/+/discovery", "room/global/discovery"));
        assert!(!topic_matches("room/+/discovery", "room/a/b/discovery"));
        assert!(!topic_matches("room/+", "room"));
    }

    #[test]
    fn test_topic_matches_multi_level_wildcard() {
        assert!(topic_matches("room/#", "room/lobby"));
        assert!(topic_matches("room/#", "room/lobby/discovery"));
        assert!(topic_matches("#", "anything/at/all"));
        assert!(!topic_matches("room/#", "other/lobby"));
    }

    #[test]
    fn test_topic_matches_length_mismatch() {
        assert!(!topic_matches("room/lobby", "room/lobby/discovery"));
        assert!(!topic_matches("room/lobby/discovery", "room/lobby"));
    }

    #[test]
    fn test_validate_filter_accepts_wildcards_in_place() {
        assert!(validate_filter("room/+/discovery").is_ok());
        assert!(validate_filter("room/#").is_ok());
        assert!(validate_filter("room/lobby").is_ok());
    }

    #[test]
    fn test_validate_filter_rejects_misplaced_wildcards() {
        assert!(validate_filter("").is_err());
        assert!(validate_filter("room/#/discovery").is_err());
        assert!(validate_filter("room/lob+by").is_err());
        assert!(validate_filter("room/a#").is_err());
    }
}
