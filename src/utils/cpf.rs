/// Strip formatting ("529.982.247-25" → "52998224725"); keeps digits only.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Check-digit validation over a normalized CPF. Repeated-digit sequences
/// like 111.111.111-11 pass the arithmetic but are not issued, so they are
/// rejected explicitly.
pub fn is_valid(cpf: &str) -> bool {
    if cpf.len() != 11 || !cpf.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = cpf.bytes().map(|b| u32::from(b - b'0')).collect();

    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    verify_digit(&digits, 9) && verify_digit(&digits, 10)
}

fn verify_digit(digits: &[u32], position: usize) -> bool {
    let sum: u32 = digits[..position]
        .iter()
        .zip((2..=(position as u32 + 1)).rev())
        .map(|(d, w)| d * w)
        .sum();

    let rem = sum % 11;
    let expected = if rem < 2 { 0 } else { 11 - rem };

    digits[position] == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_formatted_input() {
        assert_eq!(normalize("529.982.247-25"), "52998224725");
        assert_eq!(normalize(" 123 456 789-09 "), "12345678909");
        assert_eq!(normalize("no digits"), "");
    }

    #[test]
    fn accepts_known_valid_cpfs() {
        for cpf in ["52998224725", "12345678909", "98765432100"] {
            assert!(is_valid(cpf), "{cpf} should be valid");
        }
    }

    #[test]
    fn rejects_wrong_check_digits() {
        assert!(!is_valid("52998224724"));
        assert!(!is_valid("12345678900"));
    }

    #[test]
    fn rejects_repeated_digit_sequences() {
        for cpf in ["00000000000", "11111111111", "99999999999"] {
            assert!(!is_valid(cpf), "{cpf} should be rejected");
        }
    }

    #[test]
    fn rejects_wrong_length_or_non_digits() {
        assert!(!is_valid(""));
        assert!(!is_valid("1234567890"));
        assert!(!is_valid("123456789012"));
        assert!(!is_valid("5299822472x"));
    }
}
