//! Verification session state machine.
//!
//! Pure functions: the caller loads a session, plans the transition here,
//! and applies it with a conditional [`RecordAttempt`] write.

use chrono::{DateTime, Utc};
use sicora_core::models::mfa_session::{MfaSession, MfaSessionState, RecordAttempt};

use crate::error::AuthError;

/// Result of an attempt that was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Verified,
    Rejected { remaining_attempts: u32 },
    Exhausted,
}

impl AttemptOutcome {
    /// Map the outcome to the caller-facing result.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Self::Verified => Ok(()),
            Self::Rejected { remaining_attempts } => {
                Err(AuthError::InvalidCode { remaining_attempts })
            }
            Self::Exhausted => Err(AuthError::AttemptsExceeded),
        }
    }
}

/// Fail unless the session is `Active` at `now`. Refusals consume no attempt.
pub fn ensure_active(session: &MfaSession, now: DateTime<Utc>) -> Result<(), AuthError> {
    match session.state_at(now) {
        MfaSessionState::Active => Ok(()),
        MfaSessionState::Verified => Err(AuthError::SessionAlreadyVerified),
        MfaSessionState::Exhausted => Err(AuthError::AttemptsExceeded),
        MfaSessionState::Expired => Err(AuthError::SessionExpired),
    }
}

/// Plan one verification attempt against the session as loaded.
pub fn plan_attempt(
    session: &MfaSession,
    code_matches: bool,
    now: DateTime<Utc>,
) -> Result<(RecordAttempt, AttemptOutcome), AuthError> {
    ensure_active(session, now)?;

    let attempts = session.attempts + 1;
    let outcome = if code_matches {
        AttemptOutcome::Verified
    } else if attempts >= session.max_attempts {
        AttemptOutcome::Exhausted
    } else {
        AttemptOutcome::Rejected {
            remaining_attempts: session.max_attempts - attempts,
        }
    };
    let update = RecordAttempt {
        expected_attempts: session.attempts,
        verified_at: code_matches.then_some(now),
    };
    Ok((update, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sicora_core::models::mfa_method::MfaMethodType;
    use uuid::Uuid;

    fn session(attempts: u32, expires_in: Duration) -> MfaSession {
        let now = Utc::now();
        MfaSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            method_type: MfaMethodType::Sms,
            method_id: None,
            code_hash: None,
            is_verified: false,
            verified_at: None,
            attempts,
            max_attempts: 3,
            ip_address: None,
            user_agent: None,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn matching_code_verifies() {
        let now = Utc::now();
        let (update, outcome) = plan_attempt(&session(1, Duration::minutes(5)), true, now).unwrap();
        assert_eq!(outcome, AttemptOutcome::Verified);
        assert_eq!(update.expected_attempts, 1);
        assert_eq!(update.verified_at, Some(now));
    }

    #[test]
    fn wrong_code_reports_remaining() {
        let (update, outcome) =
            plan_attempt(&session(0, Duration::minutes(5)), false, Utc::now()).unwrap();
        assert_eq!(outcome, AttemptOutcome::Rejected { remaining_attempts: 2 });
        assert!(update.verified_at.is_none());
        assert!(matches!(
            outcome.into_result(),
            Err(AuthError::InvalidCode { remaining_attempts: 2 })
        ));
    }

    #[test]
    fn last_wrong_code_exhausts() {
        let (_, outcome) =
            plan_attempt(&session(2, Duration::minutes(5)), false, Utc::now()).unwrap();
        assert_eq!(outcome, AttemptOutcome::Exhausted);
        assert!(matches!(outcome.into_result(), Err(AuthError::AttemptsExceeded)));
    }

    #[test]
    fn expired_session_consumes_nothing() {
        let result = plan_attempt(&session(1, Duration::seconds(-1)), true, Utc::now());
        assert!(matches!(result, Err(AuthError::SessionExpired)));
    }

    #[test]
    fn terminal_states_refuse() {
        let exhausted = session(3, Duration::minutes(5));
        assert!(matches!(
            plan_attempt(&exhausted, true, Utc::now()),
            Err(AuthError::AttemptsExceeded)
        ));

        let mut verified = session(1, Duration::minutes(5));
        verified.is_verified = true;
        assert!(matches!(
            plan_attempt(&verified, true, Utc::now()),
            Err(AuthError::SessionAlreadyVerified)
        ));
    }
}
