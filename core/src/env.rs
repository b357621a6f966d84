//! Environment configuration.
//!
//! Values are read from the process environment after an optional `.env`
//! file in the working directory has been merged in. Variables already set in
//! the environment win over the file.

use std::env;

/// Load `.env` from the working directory (or a parent), if there is one.
///
/// Returns the path that was loaded so callers can log it.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(err) if err.not_found() => None,
        Err(err) => {
            log::warn!("Ignoring unreadable .env file: {err}");
            None
        }
    }
}

/// Read `name`, trimming surrounding whitespace. Empty values count as unset.
pub fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read `name` or report it missing.
///
/// The error carries only the variable name so that callers can wrap it in
/// their own error type.
pub fn required_var(name: &str) -> Result<String, String> {
    optional_var(name).ok_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns a distinct variable name; tests run on parallel threads.

    #[test]
    fn optional_var_trims_whitespace() {
        unsafe { env::set_var("HFE_CORE_TEST_TRIM", "  /usr/bin/redis-cli \n") };
        assert_eq!(
            optional_var("HFE_CORE_TEST_TRIM").as_deref(),
            Some("/usr/bin/redis-cli")
        );
    }

    #[test]
    fn blank_value_counts_as_missing() {
        unsafe { env::set_var("HFE_CORE_TEST_BLANK", "   ") };
        assert_eq!(optional_var("HFE_CORE_TEST_BLANK"), None);
        assert_eq!(
            required_var("HFE_CORE_TEST_BLANK"),
            Err("HFE_CORE_TEST_BLANK".to_string())
        );
    }

    #[test]
    fn required_var_returns_value() {
        unsafe { env::set_var("HFE_CORE_TEST_SET", "keydb-cli") };
        assert_eq!(required_var("HFE_CORE_TEST_SET").as_deref(), Ok("keydb-cli"));
    }
}
