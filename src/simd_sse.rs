//! SSE2-class batch implementations of the alpha transforms.
//!
//! Instruction sequences match libwebp's alpha_processing_sse2.c: 8-pixel
//! chunks for the alpha-slot ops with a vector AND reduction, 16-sample
//! chunks for alpha-to-luma, 2-pixel chunks for the premultiply family.
//! Remainders and the inverse (division) direction fall back to the scalar
//! reference in [`crate::scalar`], which every chunk kernel must match
//! byte-for-byte.
//!
//! Uses archmage for safe SIMD intrinsics with token-based CPU feature
//! verification.

#![allow(clippy::too_many_arguments)]

use archmage::{arcane, X64V3Token};
use core::arch::x86_64::*;
use safe_unaligned_simd::x86_64 as simd_mem;

use crate::scalar;

/// Load 8 bytes into the low half of a register.
#[arcane]
#[inline(always)]
fn load_lo_8(_token: X64V3Token, src: &[u8]) -> __m128i {
    _mm_cvtsi64_si128(i64::from_le_bytes(src[..8].try_into().unwrap()))
}

/// Store the low 8 bytes of a register.
#[arcane]
#[inline(always)]
fn store_lo_8(_token: X64V3Token, dst: &mut [u8], v: __m128i) {
    dst[..8].copy_from_slice(&(_mm_cvtsi128_si64(v) as u64).to_le_bytes());
}

/// Fold the low 8 lanes of the vector AND accumulator into the scalar one.
#[arcane]
#[inline(always)]
fn fold_alpha_and(_token: X64V3Token, alpha_and: u8, all_alphas: __m128i) -> u8 {
    (_mm_cvtsi128_si64(all_alphas) as u64)
        .to_le_bytes()
        .iter()
        .fold(alpha_and, |acc, &b| acc & b)
}

/// Merge an alpha plane into the alpha slots of a packed buffer, 8 pixels at
/// a time. Returns `true` when the region has transparency.
#[arcane]
pub(crate) fn merge_alpha(
    _token: X64V3Token,
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
    // One length check up front to elide per-chunk bounds checks.
    assert!(alpha.len() >= (height - 1) * alpha_stride + width);
    assert!(dst.len() >= (height - 1) * dst_stride + 4 * width - 3);

    let zero = _mm_setzero_si128();
    let rgb_mask = _mm_set1_epi32(0xffff_ff00u32 as i32); // to preserve RGB
    let all_0xff = _mm_set_epi32(0, 0, -1, -1);
    let mut all_alphas = all_0xff;
    let mut alpha_and = 0xffu8;

    // Chunks stop one pixel short of the row end so the 32-byte loads and
    // stores stay inside the logical row.
    let limit = (width - 1) & !7;

    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..];
        let dst_row = &mut dst[j * dst_stride..];
        let mut i = 0;
        while i < limit {
            // 8 alpha bytes, widened to one byte per 32-bit pixel slot
            let a0 = load_lo_8(_token, &src_row[i..]);
            let a1 = _mm_unpacklo_epi8(a0, zero);
            let a2_lo = _mm_unpacklo_epi16(a1, zero);
            let a2_hi = _mm_unpackhi_epi16(a1, zero);
            // 8 dst pixels (32 bytes); mask their alpha slots and combine
            let d = &mut dst_row[4 * i..4 * i + 32];
            let b0_lo = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&d[..16]).unwrap());
            let b0_hi = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&d[16..32]).unwrap());
            let b1_lo = _mm_and_si128(b0_lo, rgb_mask);
            let b1_hi = _mm_and_si128(b0_hi, rgb_mask);
            let b2_lo = _mm_or_si128(b1_lo, a2_lo);
            let b2_hi = _mm_or_si128(b1_hi, a2_hi);
            simd_mem::_mm_storeu_si128(<&mut [u8; 16]>::try_from(&mut d[..16]).unwrap(), b2_lo);
            simd_mem::_mm_storeu_si128(<&mut [u8; 16]>::try_from(&mut d[16..32]).unwrap(), b2_hi);
            // accumulate eight alpha 'and' in parallel
            all_alphas = _mm_and_si128(all_alphas, a0);
            i += 8;
        }
        while i < width {
            let a = src_row[i];
            dst_row[4 * i] = a;
            alpha_and &= a;
            i += 1;
        }
    }

    fold_alpha_and(_token, alpha_and, all_alphas) != 0xff
}

/// Extract the alpha slots of a packed buffer into a separate plane, 8 pixels
/// at a time. Returns `true` when the region is fully opaque.
#[arcane]
pub(crate) fn extract_alpha(
    _token: X64V3Token,
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
    assert!(src.len() >= (height - 1) * src_stride + 4 * width - 3);
    assert!(alpha.len() >= (height - 1) * alpha_stride + width);

    let a_mask = _mm_set1_epi32(0xff); // to keep the alpha slot only
    let all_0xff = _mm_set_epi32(0, 0, -1, -1);
    let mut all_alphas = all_0xff;
    let mut alpha_and = 0xffu8;

    let limit = (width - 1) & !7;

    for j in 0..height {
        let src_row = &src[j * src_stride..];
        let dst_row = &mut alpha[j * alpha_stride..];
        let mut i = 0;
        while i < limit {
            // 8 pixels (32 bytes), narrowed to their 8 alpha bytes
            let s = &src_row[4 * i..4 * i + 32];
            let a0 = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&s[..16]).unwrap());
            let a1 = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&s[16..32]).unwrap());
            let b0 = _mm_and_si128(a0, a_mask);
            let b1 = _mm_and_si128(a1, a_mask);
            let c0 = _mm_packs_epi32(b0, b1);
            let d0 = _mm_packus_epi16(c0, c0);
            store_lo_8(_token, &mut dst_row[i..], d0);
            all_alphas = _mm_and_si128(all_alphas, d0);
            i += 8;
        }
        while i < width {
            let a = src_row[4 * i];
            dst_row[i] = a;
            alpha_and &= a;
            i += 1;
        }
    }

    fold_alpha_and(_token, alpha_and, all_alphas) == 0xff
}

/// Expand alpha samples to `alpha << 8` packed words, 16 samples at a time.
#[arcane]
pub(crate) fn expand_alpha_to_luma(
    _token: X64V3Token,
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
    assert!(alpha.len() >= (height - 1) * alpha_stride + width);
    assert!(dst.len() >= (height - 1) * dst_stride + width);

    let zero = _mm_setzero_si128();
    let limit = width & !15;

    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..];
        let dst_row = &mut dst[j * dst_stride..];
        let mut i = 0;
        while i < limit {
            let a0 = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&src_row[i..i + 16]).unwrap());
            // note the 'zero' first: bytes land in the high half of each u16
            let a1 = _mm_unpacklo_epi8(zero, a0);
            let b1 = _mm_unpackhi_epi8(zero, a0);
            let a2_lo = _mm_unpacklo_epi16(a1, zero);
            let a2_hi = _mm_unpackhi_epi16(a1, zero);
            let b2_lo = _mm_unpacklo_epi16(b1, zero);
            let b2_hi = _mm_unpackhi_epi16(b1, zero);
            let d = &mut dst_row[i..i + 16];
            simd_mem::_mm_storeu_si128(<&mut [u32; 4]>::try_from(&mut d[0..4]).unwrap(), a2_lo);
            simd_mem::_mm_storeu_si128(<&mut [u32; 4]>::try_from(&mut d[4..8]).unwrap(), a2_hi);
            simd_mem::_mm_storeu_si128(<&mut [u32; 4]>::try_from(&mut d[8..12]).unwrap(), b2_lo);
            simd_mem::_mm_storeu_si128(<&mut [u32; 4]>::try_from(&mut d[12..16]).unwrap(), b2_hi);
            i += 16;
        }
        while i < width {
            dst_row[i] = u32::from(src_row[i]) << 8;
            i += 1;
        }
    }
}

/// Premultiply an interleaved buffer in place, 2 pixels at a time.
///
/// Uses `v / 255 = (v + 1 + (v >> 8)) >> 8`, where `v = alpha * channel` is a
/// 16-bit value; the scalar tail's `0x8081` multiplier agrees exactly.
#[arcane]
pub(crate) fn apply_alpha_multiply(
    _token: X64V3Token,
    rgba: &mut [u8],
    alpha_first: bool,
    width: usize,
    height: usize,
    stride: usize,
) {
    if width == 0 || height == 0 {
        return;
    }
    assert!(rgba.len() >= (height - 1) * stride + 4 * width);

    let zero = _mm_setzero_si128();
    let one = _mm_set1_epi16(1);
    let kmask = _mm_set_epi16(0, 0xff, 0xff, 0, 0, 0xff, 0xff, 0);
    let (rgb_off, a_off) = scalar::channel_offsets(alpha_first);
    let span = width & !1;

    for j in 0..height {
        let row = &mut rgba[j * stride..];
        let mut i = 0;
        while i < span {
            let chunk = &mut row[4 * i..4 * i + 8];
            let argb0 = load_lo_8(_token, chunk);
            let argb1 = _mm_unpacklo_epi8(argb0, zero);
            // Broadcast each pixel's alpha over its color lanes; the OR with
            // kmask turns the leftover lane into 0xff so the alpha channel
            // itself passes through the multiply unchanged.
            let alpha0 = _mm_or_si128(argb1, kmask);
            let alpha2 = if alpha_first {
                let t = _mm_shufflelo_epi16(alpha0, 0b00_00_00_01); // _MM_SHUFFLE(0,0,0,1)
                _mm_shufflehi_epi16(t, 0b00_00_00_01)
            } else {
                let t = _mm_shufflelo_epi16(alpha0, 0b10_11_11_11); // _MM_SHUFFLE(2,3,3,3)
                _mm_shufflehi_epi16(t, 0b10_11_11_11)
            };
            let a0 = _mm_mullo_epi16(alpha2, argb1);
            let a1 = _mm_srli_epi16(a0, 8);
            let a2 = _mm_add_epi16(a1, a0);
            let a3 = _mm_add_epi16(a2, one);
            let a4 = _mm_srli_epi16(a3, 8);
            let a5 = _mm_packus_epi16(a4, zero);
            store_lo_8(_token, chunk, a5);
            i += 2;
        }
        if i < width {
            scalar::apply_alpha_multiply_row(&mut row[4 * i..], rgb_off, a_off, width - i);
        }
    }
}

/// Premultiply a row of packed 32-bit words in place, 2 words at a time.
/// The inverse direction is entirely handled by the scalar reference.
#[arcane]
pub(crate) fn mult_argb_row(_token: X64V3Token, words: &mut [u32], inverse: bool) {
    let mut x = 0;
    if !inverse {
        let zero = _mm_setzero_si128();
        let k128 = _mm_set1_epi16(128);
        let kmask = _mm_set_epi16(0, 0xff, 0, 0, 0, 0xff, 0, 0);
        while x + 2 <= words.len() {
            // To compute 'result = (int)(a * v / 255. + .5)', we use:
            //   t = a * v + 128, result = (t + (t >> 8)) >> 8
            let pair = u64::from(words[x]) | (u64::from(words[x + 1]) << 32);
            let a0 = _mm_cvtsi64_si128(pair as i64);
            let a1 = _mm_unpacklo_epi8(a0, zero);
            let a2 = _mm_or_si128(a1, kmask);
            let a3 = _mm_shufflelo_epi16(a2, 0b10_11_11_11); // _MM_SHUFFLE(2,3,3,3)
            let a4 = _mm_shufflehi_epi16(a3, 0b10_11_11_11);
            // here, a4 = [ff a0 a0 a0][ff a1 a1 a1]
            let a5 = _mm_mullo_epi16(a4, a1);
            let a6 = _mm_add_epi16(a5, k128);
            let a7 = _mm_srli_epi16(a6, 8);
            let a8 = _mm_add_epi16(a7, a6);
            let a9 = _mm_srli_epi16(a8, 8);
            let a10 = _mm_packus_epi16(a9, zero);
            let out = _mm_cvtsi128_si64(a10) as u64;
            words[x] = out as u32;
            words[x + 1] = (out >> 32) as u32;
            x += 2;
        }
    }
    if x < words.len() {
        scalar::mult_argb_row(&mut words[x..], inverse);
    }
}

/// Premultiply a planar channel row in place, 8 samples at a time, via a
/// high/low 16-bit multiply decomposition. The inverse direction is entirely
/// handled by the scalar reference.
#[arcane]
pub(crate) fn mult_row(_token: X64V3Token, ptr: &mut [u8], alpha: &[u8], inverse: bool) {
    assert!(alpha.len() >= ptr.len());
    let mut x = 0;
    if !inverse {
        let zero = _mm_setzero_si128();
        let k_round = _mm_set1_epi16(1 << 7);
        let w2 = ptr.len() & !7;
        while x < w2 {
            let v0 = load_lo_8(_token, &ptr[x..]);
            let v1 = _mm_unpacklo_epi8(v0, zero);
            let alpha0 = load_lo_8(_token, &alpha[x..]);
            let alpha1 = _mm_unpacklo_epi8(alpha0, zero);
            // alpha2 lanes hold a * 257, so mulhi(v, alpha2) + mullo(v, alpha1)
            // reconstructs the 24-bit product without widening past 16 bits
            let alpha2 = _mm_unpacklo_epi8(alpha0, alpha0);
            let v2 = _mm_mulhi_epu16(v1, alpha2);
            let v3 = _mm_mullo_epi16(v1, alpha1);
            let v4 = _mm_adds_epu16(v2, v3);
            let v5 = _mm_adds_epu16(v4, k_round);
            let v6 = _mm_srli_epi16(v5, 8);
            let v7 = _mm_packus_epi16(v6, zero);
            store_lo_8(_token, &mut ptr[x..], v7);
            x += 8;
        }
    }
    if x < ptr.len() {
        scalar::mult_row(&mut ptr[x..], &alpha[x..], inverse);
    }
}
