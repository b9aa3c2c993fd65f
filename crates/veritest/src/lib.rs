// Library exports so the engine is embeddable and testable without the binary

// ===== Suite model and execution =====
pub mod cli;
pub mod config;
pub mod runner;

// ===== Request pipeline =====
pub mod exec;
pub mod precondition;
pub mod request;

// ===== Validation and templating =====
pub mod pattern;
pub mod template;
pub mod validator;
pub mod variables;

pub mod error;

pub use error::{ErrorKind, TestFailure};
pub use runner::{RunnerOptions, SuiteRunner, SuiteResults, TestResult};
