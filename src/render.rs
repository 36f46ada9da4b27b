//! HTML rendering of the invoice through the visual templates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use slug::slugify;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{FieldLabels, InvoiceRecord, Template, TemplateColors};
use crate::totals::item_subtotal;

// Embed templates at compile time so a fresh install can render.
const EMBEDDED: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html.tera")),
    ("classic.html", include_str!("../templates/classic.html.tera")),
    ("minimalist.html", include_str!("../templates/minimalist.html.tera")),
    ("sidebar.html", include_str!("../templates/sidebar.html.tera")),
    ("creative.html", include_str!("../templates/creative.html.tera")),
    ("blueprint.html", include_str!("../templates/blueprint.html.tera")),
    ("elegant.html", include_str!("../templates/elegant.html.tera")),
    ("grid.html", include_str!("../templates/grid.html.tera")),
    ("dark.html", include_str!("../templates/dark.html.tera")),
];

#[derive(Serialize)]
struct RowView {
    description: String,
    quantity: u32,
    rate: String,
    amount: String,
}

#[derive(Serialize)]
struct MilestoneView {
    description: String,
    percentage: String,
    amount: String,
    due_date: String,
}

#[derive(Serialize)]
struct InvoiceView<'a> {
    template_name: &'static str,
    colors: TemplateColors,
    labels: &'a FieldLabels,
    record: &'a InvoiceRecord,
    invoice_date: String,
    due_date: String,
    rows: Vec<RowView>,
    subtotal: String,
    total_vat: String,
    vat_rate: String,
    total_fees: String,
    grand_total: String,
    show_vat_row: bool,
    show_fee_row: bool,
    show_pay_button: bool,
    milestones: Vec<MilestoneView>,
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

impl<'a> InvoiceView<'a> {
    fn new(record: &'a InvoiceRecord) -> Self {
        let rows = record
            .line_items
            .iter()
            .map(|item| RowView {
                description: item.description.clone(),
                quantity: item.quantity,
                rate: record.money(item.unit_price),
                amount: record.money(item_subtotal(item, record.show_quantity)),
            })
            .collect();

        let milestones = record
            .payment_milestones
            .iter()
            .map(|m| MilestoneView {
                description: m.description.clone(),
                percentage: format!("{}%", m.percentage),
                amount: record.money(m.amount),
                due_date: format_date(m.due_date),
            })
            .collect();

        InvoiceView {
            template_name: record.template.display_name(),
            colors: record.colors(),
            labels: &record.field_labels,
            record,
            invoice_date: format_date(record.invoice_date),
            due_date: format_date(record.due_date),
            rows,
            subtotal: record.money(record.subtotal),
            total_vat: record.money(record.total_vat),
            vat_rate: record.global_vat_rate.to_string(),
            total_fees: record.money(record.total_fees),
            grand_total: record.money(record.grand_total),
            show_vat_row: record.include_vat && record.total_vat > 0.0,
            show_fee_row: record.include_transaction_fees && record.total_fees > 0.0 && !record.absorb_fees,
            show_pay_button: record.show_pay_button && !record.payment_link.trim().is_empty(),
            milestones,
        }
    }
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn embedded() -> Result<Renderer> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED.to_vec())?;
        Ok(Renderer { tera })
    }

    /// Embedded templates, replaced by any `<name>.html.tera` found in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Renderer> {
        let mut renderer = Self::embedded()?;
        if !dir.is_dir() {
            return Ok(renderer);
        }

        let mut overrides = Vec::new();
        for entry in fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(".tera") {
                if EMBEDDED.iter().any(|(embedded, _)| *embedded == name) {
                    debug!(template = name, path = %path.display(), "using template override");
                    overrides.push((name.to_string(), fs::read_to_string(&path)?));
                }
            }
        }
        renderer.tera.add_raw_templates(overrides)?;
        Ok(renderer)
    }

    pub fn render_html(&self, record: &InvoiceRecord) -> Result<String> {
        let context = Context::from_serialize(InvoiceView::new(record))?;
        Ok(self.tera.render(&template_file(record.template), &context)?)
    }

    /// Renders the invoice to `<out_dir>/<invoice-number>.html`.
    pub fn write_preview(&self, record: &InvoiceRecord, out_dir: &Path) -> Result<PathBuf> {
        let html = self.render_html(record)?;
        fs::create_dir_all(out_dir)?;

        let mut stem = slugify(&record.invoice_number);
        if stem.is_empty() {
            stem = "invoice".to_string();
        }
        let path = out_dir.join(format!("{stem}.html"));
        fs::write(&path, html)?;
        info!(path = %path.display(), template = %record.template, "invoice preview rendered");
        Ok(path)
    }
}

fn template_file(template: Template) -> String {
    format!("{}.html", template.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_renders() {
        let renderer = Renderer::embedded().unwrap();
        let mut record = InvoiceRecord::default();
        for template in Template::ALL {
            record.template = template;
            let html = renderer.render_html(&record).unwrap();
            assert!(html.contains("INV-001"), "{template} is missing the invoice number");
            assert!(html.contains("$3000.00"), "{template} is missing the total");
        }
    }

    #[test]
    fn pay_button_needs_a_link() {
        let renderer = Renderer::embedded().unwrap();
        let mut record = InvoiceRecord::default();
        assert!(!renderer.render_html(&record).unwrap().contains("Pay Now"));
        record.payment_link = "https://pay.example.com/inv-001".into();
        assert!(renderer.render_html(&record).unwrap().contains("Pay Now"));
        record.show_pay_button = false;
        assert!(!renderer.render_html(&record).unwrap().contains("Pay Now"));
    }

    #[test]
    fn user_text_is_escaped() {
        let renderer = Renderer::embedded().unwrap();
        let mut record = InvoiceRecord::default();
        record.client_name = "<script>alert(1)</script>".into();
        let html = renderer.render_html(&record).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn override_directory_replaces_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("minimalist.html.tera"),
            "custom {{ record.invoiceNumber }} {{ grand_total }}",
        )
        .unwrap();
        fs::write(dir.path().join("unrelated.html.tera"), "ignored").unwrap();

        let renderer = Renderer::with_overrides(dir.path()).unwrap();
        let html = renderer.render_html(&InvoiceRecord::default()).unwrap();
        assert_eq!(html, "custom INV-001 $3000.00");
    }

    #[test]
    fn preview_file_is_named_after_invoice_number() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::embedded().unwrap();
        let mut record = InvoiceRecord::default();
        record.invoice_number = "INV 2025/07".into();
        let path = renderer.write_preview(&record, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "inv-2025-07.html");
        assert!(path.exists());
    }
}
