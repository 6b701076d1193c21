// Library interface for linesh
// The binary, integration tests and benchmarks all go through these modules

pub mod config;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod runtime;
pub mod script;
