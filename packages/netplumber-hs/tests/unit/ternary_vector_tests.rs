//! Ternary vector behaviour through the public API

use netplumber_hs::{TernaryVector, Trit};
use pretty_assertions::assert_eq;

fn v(s: &str) -> TernaryVector {
    TernaryVector::parse(s).unwrap()
}

// ============================================================================
// Text form
// ============================================================================

#[test]
fn test_display_groups_bytes() {
    let vec = v("1010xxxx0000111100zz11xx");
    assert_eq!(vec.to_string(), "1010xxxx,00001111,00zz11xx");
    assert_eq!(vec.len(), 3);
}

#[test]
fn test_parse_accepts_upper_case() {
    assert_eq!(v("XXXXXXXX"), TernaryVector::all_x(1));
    assert_eq!(v("ZZZZZZZZ"), TernaryVector::new(1, Trit::Conflict));
}

#[test]
fn test_serde_uses_text_form() {
    let vec = v("1xxxxxx0");
    let json = serde_json::to_string(&vec).unwrap();
    assert_eq!(json, "\"1xxxxxx0\"");
    let back: TernaryVector = serde_json::from_str(&json).unwrap();
    assert_eq!(back, vec);
}

// ============================================================================
// Multi-word vectors
// ============================================================================

#[test]
fn test_intersect_across_word_boundary() {
    let mut a = TernaryVector::all_x(6);
    let mut b = TernaryVector::all_x(6);
    a.set(31, Trit::One);
    b.set(32, Trit::Zero);
    let c = a.intersect(&b).unwrap();
    assert_eq!(c.get(31), Trit::One);
    assert_eq!(c.get(32), Trit::Zero);
    assert_eq!(c.count_x(), 46);

    b.set(31, Trit::Zero);
    assert!(a.intersect(&b).is_none());
}

#[test]
fn test_complement_count_matches_concrete_trits() {
    let a = v("10xxxxxx,xxxxxxxx,xxxxxxxx,xxxxxxxx,xxxxxxx1");
    let terms = a.complement();
    assert_eq!(terms.len(), 3);
    for (i, t) in terms.iter().enumerate() {
        assert!(a.intersect(t).is_none());
        for u in &terms[i + 1..] {
            assert!(t.intersect(u).is_none());
        }
    }
}

#[test]
fn test_rewrite_in_second_word() {
    let mut a = TernaryVector::all_x(5);
    let mut mask = TernaryVector::new(5, Trit::Zero);
    let mut rw = TernaryVector::new(5, Trit::Zero);
    mask.set(36, Trit::One);
    rw.set(36, Trit::One);
    assert_eq!(a.rewrite(&mask, &rw), 1);
    assert_eq!(a.get(36), Trit::One);
    assert_eq!(a.count_x(), 39);
}

#[test]
fn test_enlarge_preserves_prefix() {
    let mut a = v("1xxxxxx0");
    a.enlarge(5);
    assert_eq!(a.len(), 5);
    assert_eq!(a.get(0), Trit::One);
    assert_eq!(a.get(7), Trit::Zero);
    assert_eq!(a.count_x(), 38);
    assert!(!a.has_z());
}

#[test]
fn test_merge_rejects_two_differences() {
    assert!(v("00xxxxxx").merge(&v("11xxxxxx")).is_none());
    assert_eq!(v("0xxxxxx1").merge(&v("0xxxxxx0")), Some(v("0xxxxxxx")));
}
