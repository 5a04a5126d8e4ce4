//! Metric names recorded by the relay.

/// Events handled (counter, labels: route, status).
pub const RELAY_EVENTS_TOTAL: &str = "relay_events_total";
/// Successful deliveries (counter).
pub const RELAY_DELIVERIES_TOTAL: &str = "relay_deliveries_total";
/// Transient delivery failures (counter).
pub const RELAY_DELIVERY_FAILURES_TOTAL: &str = "relay_delivery_failures_total";
/// Participants evicted after a permanent delivery failure (counter).
pub const RELAY_EVICTIONS_TOTAL: &str = "relay_evictions_total";
/// Current participant count (gauge).
pub const RELAY_PARTICIPANTS: &str = "relay_participants";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_snake_case() {
        for name in [
            RELAY_EVENTS_TOTAL,
            RELAY_DELIVERIES_TOTAL,
            RELAY_DELIVERY_FAILURES_TOTAL,
            RELAY_EVICTIONS_TOTAL,
            RELAY_PARTICIPANTS,
        ] {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
