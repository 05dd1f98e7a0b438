//! Runtime dispatch for the alpha transforms.
//!
//! Capability detection happens once: [`AlphaOps::new`] summons the CPU
//! token and every method dispatches on it with a scalar fallback, so the
//! per-call cost is a single branch. The free functions of the same names
//! summon per call for one-shot use.
//!
//! All implementation choices are referentially transparent; constructing
//! `AlphaOps` repeatedly (even concurrently) is harmless.

#![allow(clippy::too_many_arguments)]
// On targets without a batch implementation the token is carried but not
// dispatched.
#![allow(unused_variables)]

use crate::scalar;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
use crate::simd_sse;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
use crate::simd_neon;

#[cfg(all(feature = "simd", any(target_arch = "x86_64", target_arch = "aarch64")))]
use archmage::SimdToken;

/// Capability token for the batch paths on this target.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub(crate) type SimdTokenType = Option<archmage::X64V3Token>;

/// Capability token for the batch paths on this target.
#[cfg(all(feature = "simd", target_arch = "aarch64"))]
pub(crate) type SimdTokenType = Option<archmage::NeonToken>;

/// Capability token for the batch paths on this target.
#[cfg(not(all(
    feature = "simd",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
pub(crate) type SimdTokenType = Option<()>;

/// Alpha transforms bound to the fastest implementation available on this
/// CPU.
///
/// Construct once at startup and reuse; the handle is `Copy` and free to
/// pass around. Rows are independent, so disjoint row ranges may be
/// processed from multiple threads with the same handle.
#[derive(Clone, Copy)]
pub struct AlphaOps {
    #[cfg_attr(
        not(all(feature = "simd", any(target_arch = "x86_64", target_arch = "aarch64"))),
        allow(dead_code)
    )]
    simd: SimdTokenType,
}

impl AlphaOps {
    /// Detect CPU capabilities and bind the operation set. Idempotent and
    /// safe to call repeatedly.
    pub fn new() -> Self {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        {
            Self {
                simd: archmage::X64V3Token::summon(),
            }
        }
        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        {
            Self {
                simd: archmage::NeonToken::summon(),
            }
        }
        #[cfg(not(all(
            feature = "simd",
            any(target_arch = "x86_64", target_arch = "aarch64")
        )))]
        {
            Self { simd: None }
        }
    }

    /// Write each sample of an alpha plane into the alpha slot of the
    /// corresponding packed pixel, leaving the other three channels
    /// unchanged.
    ///
    /// `dst` starts at the alpha byte of the first pixel, so `dst[4 * i]` is
    /// pixel i's alpha slot; for RGBA data pass `&mut rgba[3..]`, for
    /// alpha-first layouts pass the buffer unoffset. `dst_stride` is in
    /// bytes, `alpha_stride` in samples.
    ///
    /// Returns `true` when any alpha sample differs from 255, i.e. the
    /// region has transparency.
    pub fn merge_alpha(
        &self,
        alpha: &[u8],
        alpha_stride: usize,
        width: usize,
        height: usize,
        dst: &mut [u8],
        dst_stride: usize,
    ) -> bool {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::merge_alpha(token, alpha, alpha_stride, width, height, dst, dst_stride);
        }

        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        if let Some(token) = self.simd {
            return simd_neon::merge_alpha(token, alpha, alpha_stride, width, height, dst, dst_stride);
        }

        scalar::merge_alpha(alpha, alpha_stride, width, height, dst, dst_stride)
    }

    /// Expand each alpha sample to the 32-bit word `alpha << 8`, the packed
    /// representation used for lossless green-channel substitution.
    ///
    /// `dst_stride` is in 32-bit words.
    pub fn expand_alpha_to_luma(
        &self,
        alpha: &[u8],
        alpha_stride: usize,
        width: usize,
        height: usize,
        dst: &mut [u32],
        dst_stride: usize,
    ) {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::expand_alpha_to_luma(
                token,
                alpha,
                alpha_stride,
                width,
                height,
                dst,
                dst_stride,
            );
        }

        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        if let Some(token) = self.simd {
            return simd_neon::expand_alpha_to_luma(
                token,
                alpha,
                alpha_stride,
                width,
                height,
                dst,
                dst_stride,
            );
        }

        scalar::expand_alpha_to_luma(alpha, alpha_stride, width, height, dst, dst_stride)
    }

    /// Read the alpha slot of each packed pixel into a separate plane.
    ///
    /// `src` starts at the alpha byte of the first pixel, as in
    /// [`merge_alpha`](Self::merge_alpha).
    ///
    /// Returns `true` when every alpha sample equals 255, i.e. the region is
    /// fully opaque. The sense is deliberately inverted relative to
    /// [`merge_alpha`](Self::merge_alpha), matching what the respective
    /// callers branch on.
    pub fn extract_alpha(
        &self,
        src: &[u8],
        src_stride: usize,
        width: usize,
        height: usize,
        alpha: &mut [u8],
        alpha_stride: usize,
    ) -> bool {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::extract_alpha(token, src, src_stride, width, height, alpha, alpha_stride);
        }

        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        if let Some(token) = self.simd {
            return simd_neon::extract_alpha(
                token,
                src,
                src_stride,
                width,
                height,
                alpha,
                alpha_stride,
            );
        }

        scalar::extract_alpha(src, src_stride, width, height, alpha, alpha_stride)
    }

    /// Premultiply the color channels of a 4-channel interleaved buffer by
    /// its alpha channel, in place. `alpha_first` selects whether alpha is
    /// the first or the last byte of each pixel; `stride` is in bytes.
    ///
    /// Rounds as `(channel * alpha) / 255` with the fixed-point scheme shared
    /// by the batch and scalar paths, so results are identical for every
    /// input regardless of which path ran.
    pub fn premultiply_interleaved(
        &self,
        rgba: &mut [u8],
        alpha_first: bool,
        width: usize,
        height: usize,
        stride: usize,
    ) {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::apply_alpha_multiply(token, rgba, alpha_first, width, height, stride);
        }

        scalar::apply_alpha_multiply(rgba, alpha_first, width, height, stride)
    }

    /// Premultiply (or, with `inverse`, un-premultiply) one row of packed
    /// 32-bit samples in place. Alpha lives in the most-significant byte of
    /// each word; the row width is `words.len()`.
    ///
    /// The inverse direction always runs the scalar reference path: at
    /// alpha 0 the word is zeroed permanently, at alpha 255 it is left
    /// untouched, otherwise the colors are divided back out in 24-bit fixed
    /// point.
    pub fn premultiply_packed(&self, words: &mut [u32], inverse: bool) {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::mult_argb_row(token, words, inverse);
        }

        scalar::mult_argb_row(words, inverse)
    }

    /// Premultiply (or un-premultiply) one row of a planar channel by the
    /// matching alpha row, in place. The row width is `channel.len()`;
    /// `alpha` must be at least as long.
    pub fn premultiply_planar(&self, channel: &mut [u8], alpha: &[u8], inverse: bool) {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if let Some(token) = self.simd {
            return simd_sse::mult_row(token, channel, alpha, inverse);
        }

        scalar::mult_row(channel, alpha, inverse)
    }

    /// [`premultiply_packed`](Self::premultiply_packed) over a strided
    /// rectangle. `stride` is in 32-bit words.
    pub fn premultiply_packed_rows(
        &self,
        words: &mut [u32],
        stride: usize,
        width: usize,
        height: usize,
        inverse: bool,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        for j in 0..height {
            self.premultiply_packed(&mut words[j * stride..][..width], inverse);
        }
    }

    /// [`premultiply_planar`](Self::premultiply_planar) over strided channel
    /// and alpha planes.
    pub fn premultiply_planar_rows(
        &self,
        channel: &mut [u8],
        stride: usize,
        alpha: &[u8],
        alpha_stride: usize,
        width: usize,
        height: usize,
        inverse: bool,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        for j in 0..height {
            self.premultiply_planar(
                &mut channel[j * stride..][..width],
                &alpha[j * alpha_stride..][..width],
                inverse,
            );
        }
    }
}

impl Default for AlphaOps {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot form of [`AlphaOps::merge_alpha`].
pub fn merge_alpha(
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
    dst: &mut [u8],
    dst_stride: usize,
) -> bool {
    AlphaOps::new().merge_alpha(alpha, alpha_stride, width, height, dst, dst_stride)
}

/// One-shot form of [`AlphaOps::expand_alpha_to_luma`].
pub fn expand_alpha_to_luma(
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
    dst: &mut [u32],
    dst_stride: usize,
) {
    AlphaOps::new().expand_alpha_to_luma(alpha, alpha_stride, width, height, dst, dst_stride)
}

/// One-shot form of [`AlphaOps::extract_alpha`].
pub fn extract_alpha(
    src: &[u8],
    src_stride: usize,
    width: usize,
    height: usize,
    alpha: &mut [u8],
    alpha_stride: usize,
) -> bool {
    AlphaOps::new().extract_alpha(src, src_stride, width, height, alpha, alpha_stride)
}

/// One-shot form of [`AlphaOps::premultiply_interleaved`].
pub fn premultiply_interleaved(
    rgba: &mut [u8],
    alpha_first: bool,
    width: usize,
    height: usize,
    stride: usize,
) {
    AlphaOps::new().premultiply_interleaved(rgba, alpha_first, width, height, stride)
}

/// One-shot form of [`AlphaOps::premultiply_packed`].
pub fn premultiply_packed(words: &mut [u32], inverse: bool) {
    AlphaOps::new().premultiply_packed(words, inverse)
}

/// One-shot form of [`AlphaOps::premultiply_planar`].
pub fn premultiply_planar(channel: &mut [u8], alpha: &[u8], inverse: bool) {
    AlphaOps::new().premultiply_planar(channel, alpha, inverse)
}

/// One-shot form of [`AlphaOps::premultiply_packed_rows`].
pub fn premultiply_packed_rows(
    words: &mut [u32],
    stride: usize,
    width: usize,
    height: usize,
    inverse: bool,
) {
    AlphaOps::new().premultiply_packed_rows(words, stride, width, height, inverse)
}

/// One-shot form of [`AlphaOps::premultiply_planar_rows`].
pub fn premultiply_planar_rows(
    channel: &mut [u8],
    stride: usize,
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
    inverse: bool,
) {
    AlphaOps::new().premultiply_planar_rows(
        channel,
        stride,
        alpha,
        alpha_stride,
        width,
        height,
        inverse,
    )
}
