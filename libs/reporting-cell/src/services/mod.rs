pub mod reports;
pub mod statements;

pub use reports::ReportService;
pub use statements::{build_monthly_statement, statement_pipeline, StatementService};
