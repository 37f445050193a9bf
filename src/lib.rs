pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod ratelimit;
pub mod util;
pub mod web;
