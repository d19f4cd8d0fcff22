//! Fingerprint primitives for continuity matching.
//!
//! A fingerprint answers exactly one question: "is this the same region as
//! before?". It is built from position buckets and an average color only, so
//! continuity matching can never depend on biometrics.
//!
//! Format: `POS:<px><py><pw><ph>` where each digit is `floor(value * 10)`
//! clamped to `[0, 9]`, optionally suffixed with `|CLR:<rrggbb>`.

use crate::types::BBox;

/// Relative weight of the position sub-score in [`hash_similarity`].
const POSITION_WEIGHT: f64 = 0.6;

/// Color sub-score used when either side carries no color component.
const NEUTRAL_COLOR_SCORE: f64 = 0.5;

/// Generates a fingerprint string from a bbox and an optional average color.
///
/// The color is a 6-hex-digit `rrggbb` string, with or without a leading `#`.
pub fn generate_fingerprint(bbox: &BBox, color_hex: Option<&str>) -> String {
    let bucket = |v: f64| ((v * 10.0).floor() as i64).clamp(0, 9);
    let mut out = format!(
        "POS:{}{}{}{}",
        bucket(bbox.x),
        bucket(bbox.y),
        bucket(bbox.w),
        bucket(bbox.h)
    );
    if let Some(hex) = color_hex {
        out.push_str("|CLR:");
        out.push_str(&hex.trim_start_matches('#').to_ascii_lowercase());
    }
    out
}

/// Similarity between two fingerprints in `[0, 1]`.
///
/// Equal non-empty strings score `1.0`; an empty side scores `0.0`. When
/// both are `POS:`-formatted, the score is `0.6 * position + 0.4 * color`
/// where the position sub-score is the mean per-digit closeness and the
/// color sub-score is Euclidean RGB closeness (`0.5` when either side has
/// no color). Anything else falls back to the fraction of equal characters.
pub fn hash_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    if let (Some((pos_a, clr_a)), Some((pos_b, clr_b))) = (split_parts(a), split_parts(b)) {
        let position = position_score(&pos_a, &pos_b);
        let color = match (clr_a, clr_b) {
            (Some(ca), Some(cb)) => color_score(&ca, &cb),
            _ => NEUTRAL_COLOR_SCORE,
        };
        return POSITION_WEIGHT * position + (1.0 - POSITION_WEIGHT) * color;
    }

    // Generic fallback: fraction of positions holding the same character.
    let equal = a.chars().zip(b.chars()).filter(|(ca, cb)| ca == cb).count();
    equal as f64 / a.chars().count().max(b.chars().count()) as f64
}

/// Deterministic 32-bit rolling hash rendered as 8 lowercase hex chars.
///
/// Used to detect slide changes from snapshot content; not cryptographic.
pub fn content_hash(s: &str) -> String {
    let mut h: u32 = 0;
    for byte in s.bytes() {
        h = h.wrapping_mul(31).wrapping_add(byte as u32);
    }
    format!("{:08x}", h)
}

/// Splits a `POS:`-formatted fingerprint into position digits and RGB color.
///
/// Returns `None` when the string is not `POS:`-formatted or the digits are
/// malformed, in which case similarity falls back to the generic branch.
fn split_parts(fingerprint: &str) -> Option<([u8; 4], Option<[f64; 3]>)> {
    let mut parts = fingerprint.split('|');
    let pos = parts.next()?.strip_prefix("POS:")?;

    let mut digits = [0u8; 4];
    let mut chars = pos.chars();
    for slot in digits.iter_mut() {
        *slot = chars.next()?.to_digit(10)? as u8;
    }

    let color = parts
        .find_map(|p| p.strip_prefix("CLR:"))
        .and_then(parse_rgb);

    Some((digits, color))
}

fn position_score(a: &[u8; 4], b: &[u8; 4]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(da, db)| 1.0 - (*da as f64 - *db as f64).abs() / 10.0)
        .sum();
    sum / 4.0
}

fn color_score(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dist_sq: f64 = a.iter().zip(b.iter()).map(|(ca, cb)| (ca - cb).powi(2)).sum();
    let max_dist = (3.0 * 255.0_f64 * 255.0).sqrt();
    1.0 - dist_sq.sqrt() / max_dist
}

fn parse_rgb(hex: &str) -> Option<[f64; 3]> {
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([
        channel(0..2)? as f64,
        channel(2..4)? as f64,
        channel(4..6)? as f64,
    ])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_fingerprint_buckets() {
        let bbox = BBox::new(0.0, 0.52, 0.5, 0.48);
        assert_eq!(generate_fingerprint(&bbox, None), "POS:0554");
    }

    #[test]
    fn test_generate_fingerprint_clamps_edge() {
        // value 1.0 would bucket to 10; must clamp to 9
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(generate_fingerprint(&bbox, None), "POS:0099");
    }

    #[test]
    fn test_generate_fingerprint_with_color() {
        let bbox = BBox::new(0.1, 0.1, 0.3, 0.3);
        assert_eq!(
            generate_fingerprint(&bbox, Some("#A1B2C3")),
            "POS:1133|CLR:a1b2c3"
        );
    }

    #[test]
    fn test_generate_fingerprint_deterministic() {
        let bbox = BBox::new(0.33, 0.66, 0.25, 0.25);
        assert_eq!(
            generate_fingerprint(&bbox, Some("334455")),
            generate_fingerprint(&bbox, Some("334455"))
        );
    }

    #[test]
    fn test_similarity_equal_and_empty() {
        assert_eq!(hash_similarity("POS:1234", "POS:1234"), 1.0);
        assert_eq!(hash_similarity("", "POS:1234"), 0.0);
        assert_eq!(hash_similarity("", ""), 0.0);
    }

    #[test]
    fn test_similarity_position_only() {
        // digits differ by 1 in one slot: pos = (3*1.0 + 0.9)/4 = 0.975
        // no color on either side -> 0.5 neutral
        let s = hash_similarity("POS:0055", "POS:0155");
        let expected = 0.6 * 0.975 + 0.4 * 0.5;
        assert!((s - expected).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn test_similarity_identical_color() {
        let s = hash_similarity("POS:0055|CLR:808080", "POS:0054|CLR:808080");
        // pos = (3*1.0 + 0.9)/4 = 0.975, color = 1.0
        let expected = 0.6 * 0.975 + 0.4 * 1.0;
        assert!((s - expected).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn test_similarity_opposite_colors() {
        let s = hash_similarity("POS:0000|CLR:000000", "POS:0000|CLR:ffffff");
        // pos identical = 1.0, color distance is maximal = 0.0
        assert!((s - 0.6).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn test_similarity_generic_fallback() {
        // Not POS-formatted: fraction of equal characters over max length
        let s = hash_similarity("abcd", "abxy");
        assert!((s - 0.5).abs() < 1e-9);
        let s = hash_similarity("abc", "abcdef");
        assert!((s - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_malformed_pos_falls_back() {
        // Too few digits after POS: must not panic, uses the generic branch
        let s = hash_similarity("POS:12", "POS:13");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_content_hash_shape() {
        let h = content_hash("slide one");
        assert_eq!(h.len(), 8);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(h, content_hash("slide one"));
        assert_ne!(h, content_hash("slide two"));
    }

    #[test]
    fn test_content_hash_empty() {
        assert_eq!(content_hash(""), "00000000");
    }
}
