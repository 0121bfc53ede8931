// Library interface for newsdesk modules
// This allows tests and the binary to import modules

pub mod campaign;
pub mod llm;
pub mod news;
pub mod server;
pub mod writer;
