// src/ids.rs
// Two-tier identity scheme: random v4 IDs for append-only messages,
// deterministic v5 (namespace, external id) IDs for mutable aggregates.

use uuid::Uuid;

lazy_static::lazy_static! {
    /// Namespace for room aggregates. Fixed so ids are stable across process
    /// restarts and across deployments of this service.
    pub static ref ROOM_NAMESPACE: Uuid =
        Uuid::parse_str("2f6a9c2e-2f1a-4b3e-9b4a-9c1a6b2e7f10").unwrap();

    /// Namespace for user aggregates. Distinct from ROOM_NAMESPACE so that
    /// `deterministic_id(ROOM_NS, x) != deterministic_id(USER_NS, x)` for any x.
    pub static ref USER_NAMESPACE: Uuid =
        Uuid::parse_str("7b1d4e6a-8c2f-4a9d-b3e6-1f2a9d4c6e80").unwrap();
}

/// Fresh random id for an append-only record (messages, AI-chat records).
pub fn random_id() -> Uuid {
    Uuid::new_v4()
}

/// Stable id for a mutable aggregate, derived purely from `(namespace, external_id)`.
/// Calling this twice with the same inputs always yields the same uuid, which is
/// what lets `upsert` behave as a true replace instead of delete-then-insert.
pub fn deterministic_id(namespace: &Uuid, external_id: &str) -> Uuid {
    Uuid::new_v5(namespace, external_id.as_bytes())
}

pub fn room_id(external_room_id: &str) -> Uuid {
    deterministic_id(&ROOM_NAMESPACE, external_room_id)
}

pub fn user_id(external_user_id: &str) -> Uuid {
    deterministic_id(&USER_NAMESPACE, external_user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_ids_are_stable() {
        assert_eq!(room_id("r1"), room_id("r1"));
        assert_eq!(user_id("u1"), user_id("u1"));
    }

    #[test]
    fn room_and_user_namespaces_never_collide() {
        for external in ["r1", "shared-id", "", "unicode-غرفة"] {
            assert_ne!(room_id(external), user_id(external));
        }
    }

    #[test]
    fn random_ids_are_distinct() {
        assert_ne!(random_id(), random_id());
    }
}
