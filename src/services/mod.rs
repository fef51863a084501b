pub mod db;
pub mod error;
pub mod generator;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod prompt;
pub mod publisher;
pub mod twitter;
