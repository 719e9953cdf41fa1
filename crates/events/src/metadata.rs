//! Session correlation for events and log lines.
//!
//! A host may adopt the correlation id of an outer session (for example an IDE
//! session id) before anything is published; otherwise one is generated on
//! first use. It never changes afterwards.

use std::sync::OnceLock;
use uuid::Uuid;

static SESSION: OnceLock<Uuid> = OnceLock::new();

/// Correlation id stamped on every [`MfEvent`](crate::MfEvent) of this process.
#[must_use]
pub fn correlation_id() -> Uuid {
    *SESSION.get_or_init(Uuid::new_v4)
}

/// Adopt `id` as the session correlation id.
///
/// Returns `false`, leaving the current id in place, once an id was already
/// adopted or generated.
pub fn set_correlation_id(id: Uuid) -> bool {
    let adopted = SESSION.set(id).is_ok();
    if !adopted {
        tracing::debug!(%id, current = %correlation_id(), "Correlation id already fixed");
    }
    adopted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_fixed_after_first_use() {
        let first = correlation_id();
        assert!(!first.is_nil());
        assert!(!set_correlation_id(Uuid::nil()));
        assert_eq!(correlation_id(), first);
    }
}
