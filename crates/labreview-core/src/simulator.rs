//! Deterministic score simulator.
//!
//! No report is ever read. A score is derived from the slot identity alone,
//! so re-reviewing the same slot always yields the same number.

use crate::model::{ReportSlot, ReportType};
use crate::results::PASS_SCORE;

/// Number of distinct simulated scores, giving the range `[60, 95]`.
pub const SCORE_SPAN: u32 = 36;

/// Lowest simulated score.
pub const MIN_SIMULATED_SCORE: u32 = PASS_SCORE;

/// Highest simulated score.
pub const MAX_SIMULATED_SCORE: u32 = PASS_SCORE + SCORE_SPAN - 1;

/// 32-bit multiplicative string hash: `h = h * 31 + unit (mod 2^32)`.
///
/// Iterates UTF-16 code units so non-ASCII experiment ids hash the same way
/// the dashboard's JavaScript did.
pub fn str_hash(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

/// Simulated score for the slot `(experiment_id, report_type, index)`.
pub fn score_for_report(experiment_id: &str, report_type: ReportType, index: u32) -> u32 {
    let key = format!("{experiment_id}:{report_type}:{index}");
    MIN_SIMULATED_SCORE + str_hash(&key) % SCORE_SPAN
}

/// Simulated score for a slot.
pub fn score_slot(slot: &ReportSlot) -> u32 {
    score_for_report(&slot.experiment_id, slot.report_type, slot.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_known_values() {
        assert_eq!(str_hash(""), 0);
        assert_eq!(str_hash("a"), 97);
        assert_eq!(str_hash("ab"), 97 * 31 + 98);
        // "hello".hashCode() in Java uses the same recurrence
        assert_eq!(str_hash("hello"), 99162322);
    }

    #[test]
    fn hash_wraps_at_32_bits() {
        let long = "z".repeat(64);
        let expected = long
            .bytes()
            .fold(0u64, |h, b| (h * 31 + u64::from(b)) % (1u64 << 32));
        assert_eq!(u64::from(str_hash(&long)), expected);
    }

    #[test]
    fn hash_uses_utf16_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00
        let expected = 0xD83Du32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(str_hash("\u{1F600}"), expected);
    }

    #[test]
    fn score_matches_formula() {
        for idx in 0..3 {
            let key = format!("exp1:word:{idx}");
            let expected = 60 + str_hash(&key) % 36;
            assert_eq!(score_for_report("exp1", ReportType::Word, idx), expected);
        }
    }

    #[test]
    fn score_is_deterministic_and_in_range() {
        for exp in ["hdfs_exp", "java_exp1", "ds_exp2", "数据库"] {
            for ty in [ReportType::Word, ReportType::Dify] {
                for idx in 0..200 {
                    let first = score_for_report(exp, ty, idx);
                    let second = score_for_report(exp, ty, idx);
                    assert_eq!(first, second);
                    assert!((MIN_SIMULATED_SCORE..=MAX_SIMULATED_SCORE).contains(&first));
                }
            }
        }
    }

    #[test]
    fn report_type_changes_key() {
        let slot = ReportSlot::new("ds_exp1", ReportType::Dify, 7);
        assert_eq!(score_slot(&slot), score_for_report("ds_exp1", ReportType::Dify, 7));
        let word_key = str_hash("ds_exp1:word:7");
        let dify_key = str_hash("ds_exp1:dify:7");
        assert_ne!(word_key, dify_key);
    }
}
