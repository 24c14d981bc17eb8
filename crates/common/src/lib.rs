//! Cross-crate plumbing: logging setup and small shared response types.

pub mod types;
pub mod utils;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn success_ack_is_true() {
        assert!(types::Success::ok().success);
    }
}
