pub mod invoices;
pub mod payments;

pub use invoices::InvoiceService;
pub use payments::{settle, PaymentService};
