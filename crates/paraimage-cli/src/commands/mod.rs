pub mod generate;
pub mod history;
pub mod models;
pub mod prompts;
pub mod providers;
