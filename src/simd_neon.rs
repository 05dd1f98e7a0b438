//! NEON batch implementations of the alpha transforms.
//!
//! Ported from the x86 SSE2 versions in simd_sse.rs: the same chunk sizes,
//! the same AND-reduction discipline, and the same scalar tails. The
//! premultiply family is not ported; the dispatcher runs it through the
//! scalar reference on aarch64.

#![allow(clippy::too_many_arguments)]

use archmage::{arcane, rite, NeonToken};
use core::arch::aarch64::*;
use safe_unaligned_simd::aarch64 as simd_mem;

/// Fold the 8 lanes of the vector AND accumulator into the scalar one.
#[rite]
fn fold_alpha_and(_token: NeonToken, alpha_and: u8, all_alphas: uint8x8_t) -> u8 {
    vget_lane_u64(vreinterpret_u64_u8(all_alphas), 0)
        .to_le_bytes()
        .iter()
        .fold(alpha_and, |acc, &b| acc & b)
}

/// Merge an alpha plane into the alpha slots of a packed buffer, 8 pixels at
/// a time. Returns `true` when the region has transparency.
#[arcane]
pub(crate) fn merge_alpha(
    _token: NeonToken,
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
    assert!(alpha.len() >= (height - 1) * alpha_stride + width);
    assert!(dst.len() >= (height - 1) * dst_stride + 4 * width - 3);

    // per-u32 mask preserving the three color bytes
    let rgb_mask = vreinterpretq_u8_u32(vdupq_n_u32(0xffff_ff00));
    let mut all_alphas = vdup_n_u8(0xff);
    let mut alpha_and = 0xffu8;

    let limit = (width - 1) & !7;

    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..];
        let dst_row = &mut dst[j * dst_stride..];
        let mut i = 0;
        while i < limit {
            // widen 8 alpha bytes to the low byte of 8 u32 lanes
            let a0 = simd_mem::vld1_u8(<&[u8; 8]>::try_from(&src_row[i..i + 8]).unwrap());
            let a16 = vmovl_u8(a0);
            let a32_lo = vreinterpretq_u8_u32(vmovl_u16(vget_low_u16(a16)));
            let a32_hi = vreinterpretq_u8_u32(vmovl_u16(vget_high_u16(a16)));
            let d = &mut dst_row[4 * i..4 * i + 32];
            let b0_lo = simd_mem::vld1q_u8(<&[u8; 16]>::try_from(&d[..16]).unwrap());
            let b0_hi = simd_mem::vld1q_u8(<&[u8; 16]>::try_from(&d[16..32]).unwrap());
            let b2_lo = vorrq_u8(vandq_u8(b0_lo, rgb_mask), a32_lo);
            let b2_hi = vorrq_u8(vandq_u8(b0_hi, rgb_mask), a32_hi);
            simd_mem::vst1q_u8(<&mut [u8; 16]>::try_from(&mut d[..16]).unwrap(), b2_lo);
            simd_mem::vst1q_u8(<&mut [u8; 16]>::try_from(&mut d[16..32]).unwrap(), b2_hi);
            all_alphas = vand_u8(all_alphas, a0);
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
    _token: NeonToken,
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

    let mut all_alphas = vdup_n_u8(0xff);
    let mut alpha_and = 0xffu8;

    let limit = (width - 1) & !7;

    for j in 0..height {
        let src_row = &src[j * src_stride..];
        let dst_row = &mut alpha[j * alpha_stride..];
        let mut i = 0;
        while i < limit {
            // narrow 8 u32 pixels down to their low (alpha) bytes
            let s = &src_row[4 * i..4 * i + 32];
            let p_lo = vreinterpretq_u32_u8(simd_mem::vld1q_u8(
                <&[u8; 16]>::try_from(&s[..16]).unwrap(),
            ));
            let p_hi = vreinterpretq_u32_u8(simd_mem::vld1q_u8(
                <&[u8; 16]>::try_from(&s[16..32]).unwrap(),
            ));
            let n16 = vcombine_u16(vmovn_u32(p_lo), vmovn_u32(p_hi));
            let d0 = vmovn_u16(n16);
            simd_mem::vst1_u8(<&mut [u8; 8]>::try_from(&mut dst_row[i..i + 8]).unwrap(), d0);
            all_alphas = vand_u8(all_alphas, d0);
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
    _token: NeonToken,
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

    let limit = width & !15;

    for j in 0..height {
        let src_row = &alpha[j * alpha_stride..];
        let dst_row = &mut dst[j * dst_stride..];
        let mut i = 0;
        while i < limit {
            let a0 = simd_mem::vld1q_u8(<&[u8; 16]>::try_from(&src_row[i..i + 16]).unwrap());
            // shift-and-widen puts each alpha in bits 8..16 of a u16 lane
            let lo = vshll_n_u8(vget_low_u8(a0), 8);
            let hi = vshll_n_u8(vget_high_u8(a0), 8);
            let d = &mut dst_row[i..i + 16];
            let w0 = vmovl_u16(vget_low_u16(lo));
            let w1 = vmovl_u16(vget_high_u16(lo));
            let w2 = vmovl_u16(vget_low_u16(hi));
            let w3 = vmovl_u16(vget_high_u16(hi));
            simd_mem::vst1q_u32(<&mut [u32; 4]>::try_from(&mut d[0..4]).unwrap(), w0);
            simd_mem::vst1q_u32(<&mut [u32; 4]>::try_from(&mut d[4..8]).unwrap(), w1);
            simd_mem::vst1q_u32(<&mut [u32; 4]>::try_from(&mut d[8..12]).unwrap(), w2);
            simd_mem::vst1q_u32(<&mut [u32; 4]>::try_from(&mut d[12..16]).unwrap(), w3);
            i += 16;
        }
        while i < width {
            dst_row[i] = u32::from(src_row[i]) << 8;
            i += 1;
        }
    }
}
