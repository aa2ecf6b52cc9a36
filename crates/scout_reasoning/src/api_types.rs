pub use scout_core::tools::{Tool, ToolInputSchema};
pub use scout_core::turn::{ContentBlock, Role, Turn};

use serde::Deserialize;

// Response payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    pub fn into_turn(self) -> Turn {
        Turn::assistant(self.content)
    }
}
