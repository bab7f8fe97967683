//! Pipeline stages for grading an uploaded answer sheet.
//!
//! Each submodule implements exactly one transformation step, so the web
//! layer can drive them in order and tests can drive any one in isolation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ score
//! (upload)  (pdfium)  (base64)  (VLM)   (join + regex)
//! ```
//!
//! 1. [`input`]   persist the uploaded bytes and check the `%PDF` magic
//! 2. [`render`]  rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]  PNG-encode and base64-wrap each `DynamicImage` for the
//!    multimodal API request body
//! 4. [`llm`]     one grading call per page; failures degrade to a
//!    sentinel feedback string
//! 5. [`score`]   join page feedback and pull out the first `SCORE: x/y`

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod score;
