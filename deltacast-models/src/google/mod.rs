//! Cumulative-text stream translation for the Google Gemini API.
//!
//! Gemini frames each carry the entire text produced so far rather than a
//! delta. The translator diffs successive frames and emits only the newly
//! appended suffix, preserving the delta contract consumers expect.

mod stream;
mod types;

pub use stream::GoogleEventStream;
pub use types::{Candidate, CandidateContent, FunctionCall, GenerateContentResponse, Part, UsageMetadata};
