//! Partition key assembly (§4.A).

use conduit_core::error::Result;
use conduit_core::types::PartitionKey;

/// Builds a [`PartitionKey`] from the `endpoint_id` path segment and an
/// optional `X-Part-Id` header value, validating both against
/// `[A-Za-z0-9_-]+`.
pub fn assemble(endpoint_id: &str, part_id: Option<&str>) -> Result<PartitionKey> {
    PartitionKey::new(endpoint_id, part_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_endpoint_only() {
        let pk = assemble("acme", None).unwrap();
        assert_eq!(pk.to_string(), "acme");
    }

    #[test]
    fn assembles_endpoint_and_part() {
        let pk = assemble("acme", Some("team1")).unwrap();
        assert_eq!(pk.to_string(), "acme#team1");
    }

    #[test]
    fn rejects_invalid_part_id() {
        assert!(assemble("acme", Some("team/1")).is_err());
    }
}
