//! CPF (Brazilian tax id) validation and display formatting, plus the
//! matching phone formatter.
//!
//! Validation uses the subtract-from-11 check-digit form: for each check
//! digit, a weighted digit sum is reduced with `r = 11 - (sum % 11)`, and
//! the expected digit is `0` when `r > 9`, otherwise `r`.

/// Strips everything but ASCII digits.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=first_weight).rev())
        .map(|(d, w)| d * w)
        .sum();
    let remainder = 11 - (sum % 11);
    if remainder > 9 {
        0
    } else {
        remainder
    }
}

/// Validates a CPF in any formatting. Rejects anything that is not exactly
/// eleven digits after normalization, the eleven-repeated-digits sequences,
/// and any CPF whose two check digits do not match the weighted sums.
pub fn validate(raw: &str) -> bool {
    let cpf = normalize(raw);
    if cpf.len() != 11 {
        return false;
    }

    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9], 10) == digits[9] && check_digit(&digits[..10], 11) == digits[10]
}

/// Formats a CPF progressively as digits accumulate, up to the full
/// `###.###.###-##` shape. Partial prefixes get the separators earned so
/// far, so the formatter can run on every keystroke.
pub fn format(raw: &str) -> String {
    let mut cpf = normalize(raw);
    cpf.truncate(11);

    match cpf.len() {
        0..=3 => cpf,
        4..=6 => format!("{}.{}", &cpf[..3], &cpf[3..]),
        7..=9 => format!("{}.{}.{}", &cpf[..3], &cpf[3..6], &cpf[6..]),
        _ => format!("{}.{}.{}-{}", &cpf[..3], &cpf[3..6], &cpf[6..9], &cpf[9..]),
    }
}

/// Formats a Brazilian phone number progressively: `(DD) DDDDD-DDDD` for
/// eleven digits, `(DD) DDDD-DDDD` for ten, partial shapes below that.
pub fn format_phone(raw: &str) -> String {
    let mut phone = normalize(raw);
    phone.truncate(11);

    match phone.len() {
        0..=2 => phone,
        3..=6 => format!("({}) {}", &phone[..2], &phone[2..]),
        7..=10 => format!("({}) {}-{}", &phone[..2], &phone[2..6], &phone[6..]),
        _ => format!("({}) {}-{}", &phone[..2], &phone[2..7], &phone[7..]),
    }
}
