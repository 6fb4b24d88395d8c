use thiserror::Error;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 20;
pub const MAX_CHAT_LEN: usize = 200;
pub const MAX_BET_AMOUNT: u64 = 1_000_000;

/// Schema-level rejections. Payloads failing these never reach the core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must be 2-20 characters of letters, digits, spaces, '_' or '-'")]
    BadName,
    #[error("chat message must be 1-200 characters after trimming")]
    BadChatMessage,
    #[error("amount must be an integer between 1 and 1000000")]
    BadAmount,
}

/// Player names match `^[A-Za-z0-9_\- ]{2,20}$`.
pub fn player_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(ValidationError::BadName);
    }
    let legal = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ');
    if legal {
        Ok(())
    } else {
        Err(ValidationError::BadName)
    }
}

/// Chat messages are trimmed and must land in 1..=200 characters.
pub fn chat_message(message: &str) -> Result<String, ValidationError> {
    let trimmed = message.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_CHAT_LEN {
        return Err(ValidationError::BadChatMessage);
    }
    Ok(trimmed.to_string())
}

/// Bet and raise amounts are integers in `[1, 1_000_000]`.
pub fn bet_amount(amount: u64) -> Result<u32, ValidationError> {
    if (1..=MAX_BET_AMOUNT).contains(&amount) {
        Ok(amount as u32)
    } else {
        Err(ValidationError::BadAmount)
    }
}
