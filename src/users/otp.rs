use rand::{rngs::OsRng, Rng};

/// Numeric one-time code of exactly `length` digits, uniform over `[0, 10^length)`.
///
/// Drawn from the OS generator so codes cannot be predicted from earlier ones.
///
/// # Panics
///
/// When `length` is outside `1..=18`; longer ranges do not fit in a `u64`.
pub fn generate_otp(length: usize) -> String {
    assert!(
        (1..=18).contains(&length),
        "otp length must be within 1..=18, got {length}"
    );
    let upper = 10u64.pow(length as u32);
    let code = OsRng.gen_range(0..upper);
    format!("{code:0length$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_digit_codes() {
        for _ in 0..200 {
            let code = generate_otp(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn honours_requested_length() {
        assert_eq!(generate_otp(1).len(), 1);
        assert_eq!(generate_otp(8).len(), 8);
        assert_eq!(generate_otp(18).len(), 18);
    }

    #[test]
    #[should_panic(expected = "otp length")]
    fn zero_length_is_refused() {
        generate_otp(0);
    }

    #[test]
    #[should_panic(expected = "otp length")]
    fn overlong_length_is_refused() {
        generate_otp(19);
    }

    #[test]
    fn short_codes_are_zero_padded() {
        let padded = (0..1000)
            .map(|_| generate_otp(2))
            .find(|code| code.starts_with('0'))
            .expect("a code below 10 in 1000 draws");
        assert_eq!(padded.len(), 2);
    }

    #[test]
    fn consecutive_codes_vary() {
        let codes: std::collections::HashSet<String> = (0..50).map(|_| generate_otp(6)).collect();
        assert!(codes.len() > 1);
    }
}
