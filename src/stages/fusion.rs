use image::Luma;

use crate::models::Mask;

/// Pixelwise OR of two same-size masks.
///
/// Commutative, associative and idempotent. Mismatched dimensions are an
/// invariant violation and panic.
pub fn or(a: &Mask, b: &Mask) -> Mask {
    assert_eq!(
        a.dimensions(),
        b.dimensions(),
        "cannot fuse masks of different dimensions"
    );
    let mut out = Mask::new(a.width(), a.height());
    for ((pa, pb), po) in a.pixels().zip(b.pixels()).zip(out.pixels_mut()) {
        *po = Luma([pa[0] | pb[0]]);
    }
    out
}

/// Fold any number of cue masks into one.
///
/// Panics if `masks` is empty or the dimensions disagree.
pub fn fuse(masks: &[&Mask]) -> Mask {
    assert!(!masks.is_empty(), "cannot fuse zero masks");
    let mut out = masks[0].clone();
    for mask in &masks[1..] {
        out = or(&out, mask);
    }
    out
}
