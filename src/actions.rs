//! Placeholder delivery actions. Neither produces a file nor sends anything.

use tracing::info;

use crate::model::InvoiceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubAction {
    DownloadPdf,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubOutcome {
    pub action: StubAction,
    pub invoice_number: String,
    pub message: &'static str,
}

pub fn download_pdf(record: &InvoiceRecord) -> StubOutcome {
    info!(invoice = %record.invoice_number, "PDF download requested");
    StubOutcome {
        action: StubAction::DownloadPdf,
        invoice_number: record.invoice_number.clone(),
        message: "PDF download functionality would be implemented here",
    }
}

pub fn email_invoice(record: &InvoiceRecord) -> StubOutcome {
    info!(invoice = %record.invoice_number, to = %record.client_email, "email requested");
    StubOutcome {
        action: StubAction::Email,
        invoice_number: record.invoice_number.clone(),
        message: "Email functionality would be implemented here",
    }
}
