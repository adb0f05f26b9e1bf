//! Identity extraction from package photos via vision LLMs.

pub mod extractor;
pub mod fallback;
pub mod json_repair;
pub mod ndc;
pub mod prompts;
pub mod vision;

pub use extractor::VisionExtractor;
pub use fallback::fallback_links;
pub use json_repair::{parse_json_object, strip_code_fences};
pub use ndc::{clean_ndc, find_ndc, is_ndc};
pub use prompts::{render, GUIDANCE_TEMPLATE, IDENTITY_TEMPLATE};
pub use vision::{build_client, complete_with_images, VisionProvider};
