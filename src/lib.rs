pub mod admission;
pub mod analyzer;
pub mod config;
pub mod data_models;
pub mod document;
pub mod llm;
pub mod nlp;
pub mod pipeline;
pub mod scoring;
pub mod search;
pub mod validator;
