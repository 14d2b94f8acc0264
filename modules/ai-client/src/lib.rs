pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use openai::{OpenAi, StructuredOutput};
pub use traits::{Completion, CompletionRequest, Message, MessageRole};
pub use traits::extract;
pub use util::{json_payload, strip_code_blocks, truncate_to_char_boundary};
