//! Wall-clock lookup for a runtime-supplied timezone. Out of scope for the
//! user-memory store proper; the host owns the actual timezone database.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub trait TimeHost {
    fn now_for_timezone(&self, timezone: &str) -> (String, String);
    fn create_request_id(&self) -> String;
}

pub trait TimeRuntime {
    fn timezone(&self) -> &str;
}

#[derive(Debug, Default, Deserialize)]
pub struct SystemTimeArgs {}

#[derive(Debug, Serialize)]
pub struct SystemTimeResult {
    pub local_time: String,
    pub timezone: String,
    pub request_id: String,
}

pub fn handle(_args: SystemTimeArgs, runtime: &dyn TimeRuntime, host: &dyn TimeHost) -> Result<SystemTimeResult> {
    let timezone = runtime.timezone().trim();
    let timezone = if timezone.is_empty() { "UTC" } else { timezone };
    let (local_time, resolved_timezone) = host.now_for_timezone(timezone);
    Ok(SystemTimeResult {
        local_time,
        timezone: resolved_timezone,
        request_id: host.create_request_id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRuntime(&'static str);
    impl TimeRuntime for StubRuntime {
        fn timezone(&self) -> &str {
            self.0
        }
    }

    struct StubHost;
    impl TimeHost for StubHost {
        fn now_for_timezone(&self, timezone: &str) -> (String, String) {
            ("2026-07-30T12:00:00+00:00".to_string(), timezone.to_string())
        }
        fn create_request_id(&self) -> String {
            "req-test".to_string()
        }
    }

    #[test]
    fn empty_runtime_timezone_falls_back_to_utc() {
        let result = handle(SystemTimeArgs {}, &StubRuntime(""), &StubHost).unwrap();
        assert_eq!(result.timezone, "UTC");
    }

    #[test]
    fn explicit_timezone_is_passed_through() {
        let result = handle(SystemTimeArgs {}, &StubRuntime("Europe/Moscow"), &StubHost).unwrap();
        assert_eq!(result.timezone, "Europe/Moscow");
    }
}
