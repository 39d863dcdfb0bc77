/// Why an order number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LuhnError {
    #[error("order number is empty")]
    Empty,
    #[error("order number contains a non-digit character")]
    NotDigit,
    #[error("order number fails the Luhn checksum")]
    Checksum,
}

/// Validate an order number: ASCII digits only, Luhn checksum zero.
///
/// Every second digit from the right is doubled, with 9 subtracted when the
/// doubled value exceeds 9.
pub fn validate_order_number(number: &str) -> Result<(), LuhnError> {
    if number.is_empty() {
        return Err(LuhnError::Empty);
    }

    let mut sum = 0u32;
    for (i, byte) in number.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return Err(LuhnError::NotDigit);
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    if sum % 10 == 0 {
        Ok(())
    } else {
        Err(LuhnError::Checksum)
    }
}
