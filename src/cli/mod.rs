pub mod commands;
pub mod report;
pub mod ui;

pub use report::{DiscoveryReport, ReportSource};
pub use ui::Output;
