pub mod corpus_assembler;
pub mod image_harvester;
pub mod llm_service;
pub mod output_validator;
pub mod structurer;
pub mod text_extractor;

pub use corpus_assembler::{CorpusAssembler, ANSWER_KEY_SEPARATOR};
pub use image_harvester::{extract_images, HarvestOutcome};
pub use llm_service::LlmService;
pub use output_validator::OutputValidator;
pub use structurer::{QuestionStructurer, StructuringBackend};
pub use text_extractor::{extract_text, ExtractedText};
