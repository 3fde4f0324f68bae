//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（已打开的 PDF 文档），只向上暴露能力。

pub mod pdf_document;

pub use pdf_document::{EmbeddedImage, PdfDocument};
