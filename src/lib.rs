pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod flows;
pub mod runner;

// Re-export common items
pub use config::{SpeedProfile, Timing};
pub use driver::{AppiumConfig, LocatorStrategy};
pub use error::EngineError;
pub use runner::{run_workflow, SessionContext, WorkflowResult, WorkflowStep};
