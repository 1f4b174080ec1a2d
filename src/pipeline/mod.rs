//! Pipeline stages for table extraction.
//!
//! Each submodule implements one transformation step with explicit inputs and
//! outputs, so every stage can be run and tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ grid ──▶ ocr ──▶ sheet
//! (path)   (pdfium)  (masks)  (crops)   │
//!                               └──────▶ preview
//! ```
//!
//! 1. [`input`]  : validate the local path and `%PDF` magic bytes
//! 2. [`render`] : rasterise the last page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`grid`]   : threshold, line openings ([`morphology`]), contour tracing,
//!    debug overlay
//! 4. [`ocr`]    : crop each candidate region and recognize its text
//! 5. [`sheet`]  : bucket, merge, write the `.xlsx`
//! 6. [`preview`]: fixed 7×20 preview table image

pub mod grid;
pub mod input;
pub mod morphology;
pub mod ocr;
pub mod preview;
pub mod render;
pub mod sheet;
