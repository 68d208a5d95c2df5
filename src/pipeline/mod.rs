//! Pipeline stages from raw study input to a learning-content record.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the network-facing pieces can be swapped without touching the
//! text handling.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ input ──▶ llm ──▶ parse
//! (files)    (join)    (chat)  (JSON)
//!                 ╰── fallback: repeat llm+parse per model ──╯
//! ```
//!
//! 1. [`extract`]  — pull plain text out of `.pdf`, `.docx` and `.txt` uploads
//! 2. [`input`]    — join typed text with extracted text; reject blank input
//! 3. [`llm`]      — one chat request against one model; the only stage with
//!    network I/O
//! 4. [`parse`]    — find the JSON object inside free-form model output
//! 5. [`fallback`] — ordered "try until one succeeds" combinator driving 3–4

pub mod extract;
pub mod fallback;
pub mod input;
pub mod llm;
pub mod parse;
