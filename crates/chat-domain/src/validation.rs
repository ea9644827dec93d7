//! Validation rules for inbound chat commands, shared by the gateway and
//! anything that constructs events directly (tests, the persistence worker's
//! replay path).

use thiserror::Error;

pub const MAX_CONTENT_SCALAR_VALUES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("content is empty after trimming")]
    EmptyContent,
    #[error("content exceeds {MAX_CONTENT_SCALAR_VALUES} scalar values")]
    ContentTooLong,
    #[error("reason is empty after trimming")]
    EmptyReason,
    #[error("timeout duration must be greater than zero")]
    NonPositiveDuration,
    #[error("timeout expiry must be in the future")]
    ExpiryNotInFuture,
    #[error("actor and target must differ")]
    ActorIsTarget,
}

/// Trims `content` and checks it against the message-length bound.
///
/// Returns the trimmed string on success so callers don't re-trim.
pub fn validate_message_content(content: &str) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if trimmed.chars().count() > MAX_CONTENT_SCALAR_VALUES {
        return Err(ValidationError::ContentTooLong);
    }
    Ok(trimmed.to_owned())
}

/// Trims `reason` and checks it is non-empty (used for both timeout/ban
/// reasons and report reasons).
pub fn validate_reason(reason: &str) -> Result<String, ValidationError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyReason);
    }
    Ok(trimmed.to_owned())
}

pub fn validate_timeout_duration_ms(duration_ms: i64) -> Result<(), ValidationError> {
    if duration_ms <= 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    Ok(())
}

pub fn validate_actor_differs_from_target(actor_id: &str, target_id: &str) -> Result<(), ValidationError> {
    if actor_id == target_id {
        return Err(ValidationError::ActorIsTarget);
    }
    Ok(())
}

pub fn validate_expiry_in_future(
    expires_at: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(), ValidationError> {
    if expires_at <= now {
        return Err(ValidationError::ExpiryNotInFuture);
    }
    Ok(())
}
