// src/utils/referral.rs

use rand::Rng;

/// Characters allowed anywhere in a referral code. Visually ambiguous
/// glyphs (0/O, 1/I) are excluded so a code survives being read aloud or
/// typed from a screenshot.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Letters only; the first character avoids leading digits.
const LEAD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

pub const CODE_LENGTH: usize = 8;

const TIME_SUFFIX_LENGTH: usize = 3;

/// Generates a candidate referral code: one leading letter, four random
/// characters, and three characters derived from the epoch millisecond
/// count as a temporal tie-breaker.
///
/// Collisions are possible. The unique constraint on the participants
/// table is the authority; callers must be prepared to regenerate.
pub fn generate_code(now_epoch_ms: i64) -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(CODE_LENGTH);
    code.push(LEAD_ALPHABET[rng.random_range(0..LEAD_ALPHABET.len())] as char);
    for _ in 0..(CODE_LENGTH - TIME_SUFFIX_LENGTH - 1) {
        code.push(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char);
    }
    code.push_str(&time_suffix(now_epoch_ms));
    code
}

/// Last `TIME_SUFFIX_LENGTH` digits of the timestamp written in base 32
/// over the safe alphabet.
fn time_suffix(now_epoch_ms: i64) -> String {
    let base = CODE_ALPHABET.len() as u64;
    let mut value = now_epoch_ms.max(0) as u64;
    let mut out = [0u8; TIME_SUFFIX_LENGTH];
    for slot in out.iter_mut().rev() {
        *slot = CODE_ALPHABET[(value % base) as usize];
        value /= base;
    }
    out.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn codes_are_eight_unambiguous_characters() {
        let now = Utc::now().timestamp_millis();
        for _ in 0..10_000 {
            let code = generate_code(now);
            assert_eq!(code.len(), CODE_LENGTH);
            for c in code.chars() {
                assert!(
                    !matches!(c, '0' | 'O' | '1' | 'I'),
                    "ambiguous character {} in {}",
                    c,
                    code
                );
                assert!(CODE_ALPHABET.contains(&(c as u8)), "{} not in alphabet", c);
            }
        }
    }

    #[test]
    fn the_first_character_is_a_letter() {
        let now = Utc::now().timestamp_millis();
        for _ in 0..1_000 {
            let code = generate_code(now);
            let first = code.chars().next().expect("non-empty");
            assert!(first.is_ascii_uppercase());
        }
    }

    #[test]
    fn the_time_suffix_is_deterministic_for_a_fixed_timestamp() {
        let a = time_suffix(1_700_000_000_000);
        let b = time_suffix(1_700_000_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), TIME_SUFFIX_LENGTH);

        let c = time_suffix(1_700_000_000_000 + 1);
        assert_ne!(a, c);
    }
}
