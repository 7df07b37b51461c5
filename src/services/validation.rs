//! 发送前的本地校验

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

fn recipient_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@,;<>]+@[^\s@,;<>]+\.[^\s@,;<>.]{2,}$").expect("静态正则表达式合法")
    })
}

/// 收件人地址是否形如 `user@example.com`
pub fn is_valid_recipient(address: &str) -> bool {
    recipient_regex().is_match(address.trim())
}

/// 校验收件人地址
pub fn validate_recipient(address: &str) -> Result<(), ValidationError> {
    if is_valid_recipient(address) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRecipient {
            address: address.to_string(),
        })
    }
}
