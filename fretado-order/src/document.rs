use fretado_core::ValidationError;
use fretado_shared::PayerDocument;

/// Normalizes and checks a CPF: 11 digits with two mod-11 check digits.
/// Punctuation is ignored; numbers made of one repeated digit are rejected.
pub fn validate_cpf(raw: &str) -> Result<String, ValidationError> {
    let digits: Vec<u32> = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| invalid("CPF must contain only digits"))?;

    if digits.len() != 11 {
        return Err(invalid("CPF must have 11 digits"));
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(invalid("CPF cannot repeat a single digit"));
    }

    let check = |len: usize| -> u32 {
        let weighted: u32 = digits[..len]
            .iter()
            .zip((2..=len as u32 + 1).rev())
            .map(|(d, w)| d * w)
            .sum();
        match weighted % 11 {
            0 | 1 => 0,
            r => 11 - r,
        }
    };

    if check(9) != digits[9] || check(10) != digits[10] {
        return Err(invalid("CPF check digits do not match"));
    }

    Ok(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect())
}

pub fn validate_passport(raw: &str) -> Result<String, ValidationError> {
    let number = raw.trim().to_ascii_uppercase();
    if !(5..=20).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("passport must be 5 to 20 letters or digits"));
    }
    Ok(number)
}

/// Picks the payer document from the form. A national ID wins when both are filled.
pub fn payer_document(national_id: Option<&str>, passport: Option<&str>) -> Result<PayerDocument, ValidationError> {
    fn filled(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    match (filled(national_id), filled(passport)) {
        (Some(cpf), _) => validate_cpf(cpf).map(PayerDocument::NationalId),
        (None, Some(number)) => validate_passport(number).map(PayerDocument::Passport),
        (None, None) => Err(ValidationError::MissingPayerDocument),
    }
}

fn invalid(reason: &str) -> ValidationError {
    ValidationError::InvalidPayerDocument {
        reason: reason.to_string(),
    }
}
