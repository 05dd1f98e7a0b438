//! Scalar reference implementations of the alpha transforms.
//!
//! These are the numeric ground truth: every batch path in `simd_sse` /
//! `simd_neon` must produce byte-identical output, and the remainder of any
//! row not covered by a full batch is handed to these functions. Rounding
//! matches libwebp's alpha processing exactly.

#[cfg(feature = "multiverse")]
use multiversed::multiversed;

/// 24-bit fixed point scale for the un-premultiply (division) path.
const MFIX: u32 = 24;
const HALF: u64 = 1 << (MFIX - 1);
/// `(1 << MFIX) / 255`, the forward reciprocal used by the planar reference.
const KINV_255: u32 = (1 << MFIX) / 255;

/// `(v * scale + 0.5)` in MFIX fixed point, clamped to 255.
///
/// The product can exceed 32 bits when the caller's buffer is not actually
/// premultiplied, so the arithmetic is widened and the result clamped rather
/// than wrapped.
#[inline(always)]
fn mult_fix(v: u32, scale: u32) -> u32 {
    (((u64::from(v) * u64::from(scale) + HALF) >> MFIX) as u32).min(255)
}

/// `round(a * v / 255)` with the exact rounding of the packed-word vector
/// path: `t = a*v + 128; (t + (t >> 8)) >> 8`.
#[inline(always)]
pub(crate) fn mult_div_255(a: u32, v: u32) -> u32 {
    let t = a * v + 128;
    (t + (t >> 8)) >> 8
}

#[inline(always)]
fn inverse_scale(a: u32) -> u32 {
    (255u32 << MFIX) / a
}

/// Byte offsets of the color triple and the alpha byte within a 4-byte pixel.
#[inline(always)]
pub(crate) fn channel_offsets(alpha_first: bool) -> (usize, usize) {
    if alpha_first { (1, 0) } else { (0, 3) }
}

// -----------------------------------------------------------------------------
// Merge / extract / expand

/// Write each alpha sample into the alpha slot (`dst[4 * i]`) of the packed
/// destination, leaving the other channels untouched. Returns `true` when any
/// alpha byte differs from 0xFF (the region has transparency).
#[cfg_attr(feature = "multiverse", multiversed)]
pub(crate) fn merge_alpha(
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
    dst: &mut [u8],
    dst_stride: usize,
) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let mut alpha_and = 0xffu8;
    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..][..width];
        let dst_row = &mut dst[j * dst_stride..];
        for (i, &a) in src_row.iter().enumerate() {
            dst_row[4 * i] = a;
            alpha_and &= a;
        }
    }
    alpha_and != 0xff
}

/// Read the alpha slot (`src[4 * i]`) of each packed pixel into a separate
/// plane. Returns `true` when every alpha byte equals 0xFF (the region is
/// fully opaque) — note the sense is inverted relative to [`merge_alpha`].
#[cfg_attr(feature = "multiverse", multiversed)]
pub(crate) fn extract_alpha(
    src: &[u8],
    src_stride: usize,
    width: usize,
    height: usize,
    alpha: &mut [u8],
    alpha_stride: usize,
) -> bool {
    if width == 0 || height == 0 {
        return true;
    }
    let mut alpha_and = 0xffu8;
    for j in 0..height {
        let src_row = &src[j * src_stride..];
        let dst_row = &mut alpha[j * alpha_stride..][..width];
        for (i, out) in dst_row.iter_mut().enumerate() {
            let a = src_row[4 * i];
            *out = a;
            alpha_and &= a;
        }
    }
    alpha_and == 0xff
}

/// Expand each alpha sample to the 32-bit word `alpha << 8` (the lossless
/// green-channel substitution representation).
#[cfg_attr(feature = "multiverse", multiversed)]
pub(crate) fn expand_alpha_to_luma(
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
    dst: &mut [u32],
    dst_stride: usize,
) {
    if width == 0 || height == 0 {
        return;
    }
    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..][..width];
        let dst_row = &mut dst[j * dst_stride..][..width];
        for (out, &a) in dst_row.iter_mut().zip(src_row) {
            *out = u32::from(a) << 8;
        }
    }
}

// -----------------------------------------------------------------------------
// Premultiply: interleaved pixels

/// Premultiply the color triple of each pixel in one row segment.
///
/// `row` starts at the first byte of the first pixel to process; `rgb_off` /
/// `a_off` come from [`channel_offsets`]. Uses the fixed-point multiplier
/// `m = a * 0x8081; result = (v * m) >> 23`, which agrees exactly with the
/// `(v + 1 + (v >> 8)) >> 8` identity of the batch path for every
/// (channel, alpha) pair.
#[inline]
pub(crate) fn apply_alpha_multiply_row(row: &mut [u8], rgb_off: usize, a_off: usize, width: usize) {
    for i in 0..width {
        let px = 4 * i;
        let a = u32::from(row[px + a_off]);
        if a != 0xff {
            let m = a * 0x8081;
            for c in 0..3 {
                let v = u32::from(row[px + rgb_off + c]);
                row[px + rgb_off + c] = ((v * m) >> 23) as u8;
            }
        }
    }
}

/// Premultiply a whole interleaved buffer in place.
#[cfg_attr(feature = "multiverse", multiversed)]
pub(crate) fn apply_alpha_multiply(
    rgba: &mut [u8],
    alpha_first: bool,
    width: usize,
    height: usize,
    stride: usize,
) {
    if width == 0 || height == 0 {
        return;
    }
    let (rgb_off, a_off) = channel_offsets(alpha_first);
    for j in 0..height {
        apply_alpha_multiply_row(&mut rgba[j * stride..], rgb_off, a_off, width);
    }
}

// -----------------------------------------------------------------------------
// Premultiply: packed-word and planar rows

/// Scale the three color bytes of each 32-bit word by its alpha byte (top
/// byte). Forward uses the same rounding formula as the vector path;
/// `inverse` divides the colors back out in MFIX fixed point. Alpha 0 zeroes
/// the word permanently; alpha 255 is a no-op either way.
pub(crate) fn mult_argb_row(ptr: &mut [u32], inverse: bool) {
    for argb in ptr.iter_mut() {
        let a = *argb >> 24;
        if a == 255 {
            continue;
        }
        let (b, g, r) = if inverse {
            if a == 0 {
                *argb = 0;
                continue;
            }
            let scale = inverse_scale(a);
            (
                mult_fix(*argb & 0xff, scale),
                mult_fix((*argb >> 8) & 0xff, scale),
                mult_fix((*argb >> 16) & 0xff, scale),
            )
        } else {
            (
                mult_div_255(a, *argb & 0xff),
                mult_div_255(a, (*argb >> 8) & 0xff),
                mult_div_255(a, (*argb >> 16) & 0xff),
            )
        };
        *argb = (a << 24) | (r << 16) | (g << 8) | b;
    }
}

/// Scale each sample of a channel plane row by the matching alpha sample.
/// The forward direction is the planar reference the batch path must match
/// bit-for-bit: `(v * a * 65793 + (1 << 23)) >> 24`.
#[cfg_attr(feature = "multiverse", multiversed)]
pub(crate) fn mult_row(ptr: &mut [u8], alpha: &[u8], inverse: bool) {
    assert!(alpha.len() >= ptr.len());
    for (v, &a) in ptr.iter_mut().zip(alpha) {
        if a != 255 {
            if a == 0 {
                *v = 0;
            } else {
                let scale = if inverse {
                    inverse_scale(u32::from(a))
                } else {
                    u32::from(a) * KINV_255
                };
                *v = mult_fix(u32::from(*v), scale) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The interleaved scalar multiplier must agree with the batch identity
    /// `(v + 1 + (v >> 8)) >> 8` for the full (channel, alpha) grid.
    #[test]
    fn test_interleaved_rounding_identity() {
        for a in 0u32..=255 {
            let m = a * 0x8081;
            for x in 0u32..=255 {
                let v = x * a;
                let batch = (v + 1 + (v >> 8)) >> 8;
                let scalar = (x * m) >> 23;
                assert_eq!(scalar, batch, "mismatch at channel={x} alpha={a}");
            }
        }
    }

    /// The planar reference is exact rounding of `v * a / 255`.
    #[test]
    fn test_planar_rounding_is_exact() {
        for a in 1u32..=254 {
            let scale = a * KINV_255;
            for x in 0u32..=255 {
                let got = mult_fix(x, scale);
                let want = (x * a + 127) / 255; // round(x*a/255), no exact .5 cases
                assert_eq!(got, want, "mismatch at channel={x} alpha={a}");
            }
        }
    }

    /// The packed-word forward formula rounds exactly like the planar
    /// reference, and is the identity at alpha 255.
    #[test]
    fn test_packed_rounding_matches_planar() {
        for a in 0u32..=255 {
            for x in 0u32..=255 {
                let packed = mult_div_255(a, x);
                let want = (x * a + 127) / 255;
                assert_eq!(packed, want, "mismatch at v={x} alpha={a}");
            }
            assert_eq!(mult_div_255(255, a), a);
        }
    }

    #[test]
    fn test_merge_reports_transparency() {
        let alpha = [0u8, 128, 255, 255];
        let mut rgba = [255u8; 16];
        let has_transparency = merge_alpha(&alpha, 4, 4, 1, &mut rgba[3..], 16);
        assert!(has_transparency);
        assert_eq!([rgba[3], rgba[7], rgba[11], rgba[15]], [0, 128, 255, 255]);
        // Color channels untouched
        assert_eq!(&rgba[..3], &[255, 255, 255]);
        assert_eq!(&rgba[4..7], &[255, 255, 255]);
    }

    #[test]
    fn test_extract_sense_is_inverted() {
        let rgba = [10u8, 20, 30, 255, 40, 50, 60, 255];
        let mut alpha = [0u8; 2];
        assert!(extract_alpha(&rgba[3..], 8, 2, 1, &mut alpha, 2));
        assert_eq!(alpha, [255, 255]);

        let rgba = [10u8, 20, 30, 254, 40, 50, 60, 255];
        assert!(!extract_alpha(&rgba[3..], 8, 2, 1, &mut alpha, 2));
    }

    #[test]
    fn test_mult_argb_row_alpha_zero_is_permanent() {
        let mut words = [0x00ff_ffffu32];
        mult_argb_row(&mut words, false);
        assert_eq!(words[0], 0);
        mult_argb_row(&mut words, true);
        assert_eq!(words[0], 0);
    }

    #[test]
    fn test_mult_argb_row_opaque_roundtrip() {
        let mut words = [0xff12_3456u32, 0xffab_cdefu32];
        let orig = words;
        mult_argb_row(&mut words, false);
        assert_eq!(words, orig);
        mult_argb_row(&mut words, true);
        assert_eq!(words, orig);
    }

    #[test]
    fn test_mult_row_inverse_recovers_premultiplied() {
        // Premultiplied values never exceed their alpha, so the inverse stays
        // within one rounding step of the original.
        let alpha = [200u8; 8];
        let mut plane: [u8; 8] = [0, 10, 50, 100, 150, 180, 199, 200];
        let orig = plane;
        mult_row(&mut plane, &alpha, false);
        mult_row(&mut plane, &alpha, true);
        for (got, want) in plane.iter().zip(orig) {
            assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
        }
    }
}
