pub mod actions;
pub mod coerce;
pub mod config;
pub mod editor;
pub mod error;
pub mod milestones;
pub mod model;
pub mod render;
pub mod store;
pub mod table;
pub mod totals;

pub use config::AppSettings;
pub use editor::Editor;
pub use error::{Error, Result};
pub use model::{InvoiceRecord, LineItem, PaymentMilestone, Template};
pub use store::Store;
pub use totals::{OverridePolicy, Totals, TotalsFlags, compute_totals};
