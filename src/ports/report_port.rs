//! Report generation port trait.

use crate::domain::error::LevtraderError;
use crate::domain::report::OptimizationReport;

/// Port for presenting the winning configuration.
pub trait ReportPort {
    fn write(&self, report: &OptimizationReport) -> Result<(), LevtraderError>;
}
