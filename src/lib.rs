pub mod analysis;
pub mod app;
pub mod chart;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod session;
pub mod state;
pub mod table;
pub mod theme;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use analysis::{AnalysisClient, AnalysisReport, AnalysisResponse};
pub use config::{Config, Overrides, Settings};
pub use error::AnalysisError;
pub use session::{ChatSession, Submission};
pub use state::{CellValue, ChartSeries, Message, Role, RowRecord};
