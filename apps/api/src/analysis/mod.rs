//! Resume analysis: prompt selection and the analyze endpoint.

pub mod handlers;
pub mod prompts;
