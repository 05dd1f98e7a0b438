//! Alpha-channel processing for image codec pixel pipelines.
//!
//! This crate provides the transparency-channel transforms an image codec
//! needs around its core decode/encode loops: merging a separate alpha plane
//! into packed pixels, extracting it back out, expanding alpha to a packed
//! luma representation, and (un)premultiplying color channels by alpha. All
//! operations are pure, allocation-free, and bit-exact across the vectorized
//! and scalar paths.
//!
//! # Features
//!
//! - `std` (default): Enable standard library support. The crate itself is
//!   `no_std`-clean.
//! - `simd` (default): Enable SIMD batch paths for faster processing.
//! - `multiverse`: Multi-version the scalar loops per CPU level.
//! - `pixel-types`: Typed-pixel helpers using the [`rgb`] crate.
//!
//! # Usage
//!
//! Callers that process many rows should summon CPU capabilities once and
//! reuse the handle:
//!
//! ```rust
//! use zenalpha::AlphaOps;
//!
//! let ops = AlphaOps::new();
//! let alpha = [0u8, 128, 255, 255];
//! let mut rgba = [255u8; 16]; // 4x1 opaque placeholder pixels
//! // The destination starts at the alpha slot of pixel 0 (byte 3 for RGBA).
//! let has_transparency = ops.merge_alpha(&alpha, 4, 4, 1, &mut rgba[3..], 16);
//! assert!(has_transparency);
//! assert_eq!([rgba[3], rgba[7], rgba[11], rgba[15]], [0, 128, 255, 255]);
//! ```
//!
//! One-shot callers can use the free functions of the same names, which
//! detect capabilities per call.
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]` to prevent direct unsafe usage
//! in source. When the `simd` feature is enabled, we rely on the [`archmage`]
//! crate for safe SIMD intrinsics. The `#[arcane]` proc macro generates
//! unsafe blocks internally (which bypass the `forbid` lint due to proc-macro
//! span handling). The soundness of our SIMD code depends on archmage's
//! token-based safety model being correct.
//!
//! Without the `simd` feature, this crate contains no unsafe code whatsoever.
//!
//! [`archmage`]: https://docs.rs/archmage

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dispatch;
mod scalar;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod simd_sse;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
mod simd_neon;

/// Typed-pixel helpers over the `rgb` crate.
#[cfg(feature = "pixel-types")]
pub mod pixel;

pub use dispatch::{
    AlphaOps, expand_alpha_to_luma, extract_alpha, merge_alpha, premultiply_interleaved,
    premultiply_packed, premultiply_packed_rows, premultiply_planar, premultiply_planar_rows,
};
