//! Exit codes for `bunq`.
//!
//! Client failures map through [`BunqError::exit_code`]; anything else
//! (bad arguments, unreadable `--data`) is a usage error.

use bunq_client::BunqError;

pub const SUCCESS: i32 = 0;
pub const USAGE_ERROR: i32 = 1;

pub fn from_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BunqError>())
        .map_or(USAGE_ERROR, BunqError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn transport() -> BunqError {
        BunqError::Transport {
            message: "connection refused".into(),
        }
    }

    #[test]
    fn test_client_error_keeps_its_code() {
        let err = anyhow::Error::new(transport());
        assert_eq!(from_error(&err), 5);
    }

    #[test]
    fn test_context_does_not_hide_client_error() {
        let err = Err::<(), _>(transport())
            .context("request failed")
            .unwrap_err();
        assert_eq!(from_error(&err), 5);
    }

    #[test]
    fn test_other_errors_are_usage_errors() {
        let err = anyhow::anyhow!("--data is not valid JSON");
        assert_eq!(from_error(&err), USAGE_ERROR);
    }
}
