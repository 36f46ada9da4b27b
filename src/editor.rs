//! Record edits.
//!
//! Every edit takes the current record and returns a replacement. Edits that
//! touch line items, rates, or milestone percentages recompute totals and the
//! payment schedule before returning; cosmetic edits leave them untouched.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate, Utc};
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::milestones::{allocate, reallocate};
use crate::model::{InvoiceRecord, LineItem, PaymentMilestone, Template, TemplateColors};
use crate::totals::{OverridePolicy, compute_totals};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid colour pattern"));

#[derive(Debug, Clone, Default)]
pub struct LineItemPatch {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<f64>,
    /// `Some(None)` clears the override.
    pub vat_rate: Option<Option<f64>>,
    pub transaction_fee_rate: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub description: Option<String>,
    pub percentage: Option<f64>,
    /// Hand-entered amount. Kept until the next recalculation.
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub global_vat_rate: Option<f64>,
    pub global_transaction_fee_rate: Option<f64>,
    pub absorb_fees: Option<bool>,
    pub show_quantity: Option<bool>,
    pub show_rate: Option<bool>,
    pub show_pay_button: Option<bool>,
    pub include_vat: Option<bool>,
    pub include_transaction_fees: Option<bool>,
    pub template: Option<Template>,
    pub currency: Option<String>,
    pub payment_link: Option<String>,
    pub notes: Option<String>,
}

impl SettingsPatch {
    fn affects_totals(&self) -> bool {
        self.global_vat_rate.is_some()
            || self.global_transaction_fee_rate.is_some()
            || self.absorb_fees.is_some()
            || self.show_quantity.is_some()
            || self.include_vat.is_some()
            || self.include_transaction_fees.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetailsPatch {
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub company_website: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_address: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Editor {
    policy: OverridePolicy,
    default_template: Template,
}

impl Editor {
    pub fn new(policy: OverridePolicy, default_template: Template) -> Self {
        Editor {
            policy,
            default_template,
        }
    }

    pub fn policy(&self) -> OverridePolicy {
        self.policy
    }

    pub fn fresh_record(&self) -> InvoiceRecord {
        InvoiceRecord {
            template: self.default_template,
            ..InvoiceRecord::default()
        }
    }

    pub fn recalculate(&self, record: InvoiceRecord) -> InvoiceRecord {
        let totals = compute_totals(
            &record.line_items,
            record.global_vat_rate,
            record.global_transaction_fee_rate,
            record.flags(),
            self.policy,
        );
        debug!(?totals, policy = %self.policy, "recalculated totals");
        let payment_milestones = reallocate(&record.payment_milestones, totals.grand_total);
        InvoiceRecord {
            payment_milestones,
            ..record.with_totals(totals)
        }
    }

    pub fn add_line_item(&self, record: &InvoiceRecord) -> (InvoiceRecord, String) {
        let id = next_id(record.line_items.iter().map(|i| i.id.as_str()));
        let mut next = record.clone();
        next.line_items.push(LineItem::new(id.clone(), "", 1, 0.0));
        (self.recalculate(next), id)
    }

    pub fn update_line_item(&self, record: &InvoiceRecord, id: &str, patch: LineItemPatch) -> Result<InvoiceRecord> {
        let mut next = record.clone();
        let item = next
            .line_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("line item", id))?;

        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            item.unit_price = unit_price;
        }
        if let Some(vat_rate) = patch.vat_rate {
            item.vat_rate = vat_rate;
        }
        if let Some(fee_rate) = patch.transaction_fee_rate {
            item.transaction_fee_rate = fee_rate;
        }
        Ok(self.recalculate(next))
    }

    pub fn remove_line_item(&self, record: &InvoiceRecord, id: &str) -> Result<InvoiceRecord> {
        if !record.line_items.iter().any(|i| i.id == id) {
            return Err(not_found("line item", id));
        }
        if record.line_items.len() <= 1 {
            return Err(Error::LastEntry { kind: "line item" });
        }
        let mut next = record.clone();
        next.line_items.retain(|i| i.id != id);
        Ok(self.recalculate(next))
    }

    pub fn add_milestone(&self, record: &InvoiceRecord) -> (InvoiceRecord, String) {
        let id = next_id(record.payment_milestones.iter().map(|m| m.id.as_str()));
        let mut next = record.clone();
        next.payment_milestones
            .push(PaymentMilestone::new(id.clone(), "Payment", 0.0, Local::now().date_naive()));
        (next, id)
    }

    pub fn update_milestone(&self, record: &InvoiceRecord, id: &str, patch: MilestonePatch) -> Result<InvoiceRecord> {
        let mut next = record.clone();
        let grand_total = next.grand_total;
        let milestone = next
            .payment_milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found("milestone", id))?;

        if let Some(description) = patch.description {
            milestone.description = description;
        }
        if let Some(due_date) = patch.due_date {
            milestone.due_date = due_date;
        }
        if let Some(percentage) = patch.percentage {
            milestone.percentage = percentage;
            milestone.amount = allocate(grand_total, percentage);
        }
        if let Some(amount) = patch.amount {
            debug!(milestone = %id, amount, "manual milestone amount");
            milestone.amount = amount;
        }
        Ok(next)
    }

    pub fn remove_milestone(&self, record: &InvoiceRecord, id: &str) -> Result<InvoiceRecord> {
        if !record.payment_milestones.iter().any(|m| m.id == id) {
            return Err(not_found("milestone", id));
        }
        if record.payment_milestones.len() <= 1 {
            return Err(Error::LastEntry { kind: "milestone" });
        }
        let mut next = record.clone();
        next.payment_milestones.retain(|m| m.id != id);
        Ok(next)
    }

    pub fn update_settings(&self, record: &InvoiceRecord, patch: SettingsPatch) -> InvoiceRecord {
        let recompute = patch.affects_totals();
        let mut next = record.clone();

        if let Some(rate) = patch.global_vat_rate {
            next.global_vat_rate = rate;
        }
        if let Some(rate) = patch.global_transaction_fee_rate {
            next.global_transaction_fee_rate = rate;
        }
        if let Some(flag) = patch.absorb_fees {
            next.absorb_fees = flag;
        }
        if let Some(flag) = patch.show_quantity {
            next.show_quantity = flag;
        }
        if let Some(flag) = patch.show_rate {
            next.show_rate = flag;
        }
        if let Some(flag) = patch.show_pay_button {
            next.show_pay_button = flag;
        }
        if let Some(flag) = patch.include_vat {
            next.include_vat = flag;
        }
        if let Some(flag) = patch.include_transaction_fees {
            next.include_transaction_fees = flag;
        }
        if let Some(template) = patch.template {
            next.template = template;
        }
        if let Some(currency) = patch.currency {
            next.currency = currency;
        }
        if let Some(link) = patch.payment_link {
            next.payment_link = link;
        }
        if let Some(notes) = patch.notes {
            next.notes = notes;
        }

        if recompute { self.recalculate(next) } else { next }
    }

    pub fn update_details(&self, record: &InvoiceRecord, patch: DetailsPatch) -> InvoiceRecord {
        let mut next = record.clone();
        let fields = [
            (patch.company_name, &mut next.company_name),
            (patch.company_address, &mut next.company_address),
            (patch.company_website, &mut next.company_website),
            (patch.company_email, &mut next.company_email),
            (patch.company_phone, &mut next.company_phone),
            (patch.client_name, &mut next.client_name),
            (patch.client_email, &mut next.client_email),
            (patch.client_address, &mut next.client_address),
            (patch.invoice_number, &mut next.invoice_number),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(date) = patch.invoice_date {
            next.invoice_date = date;
        }
        if let Some(date) = patch.due_date {
            next.due_date = date;
        }
        next
    }

    pub fn set_field_label(&self, record: &InvoiceRecord, field: &str, text: &str) -> Result<InvoiceRecord> {
        let mut next = record.clone();
        let slot = next
            .field_labels
            .get_mut(field)
            .ok_or_else(|| Error::InvalidLabel(field.to_string()))?;
        *slot = text.to_string();
        Ok(next)
    }

    /// Merges the given colours into the template's current palette.
    pub fn set_template_colors(
        &self,
        record: &InvoiceRecord,
        template: Template,
        patch: ColorsPatch,
    ) -> Result<InvoiceRecord> {
        let mut next = record.clone();
        let mut colors = next
            .template_colors
            .get(template.id())
            .cloned()
            .unwrap_or_else(|| template.default_colors());

        let fields = [
            (patch.primary, &mut colors.primary),
            (patch.secondary, &mut colors.secondary),
            (patch.text, &mut colors.text),
            (patch.background, &mut colors.background),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = validate_color(&value)?;
            }
        }

        next.template_colors.insert(template.id().to_string(), colors);
        Ok(next)
    }

    pub fn reset_template_colors(&self, record: &InvoiceRecord, template: Template) -> InvoiceRecord {
        let mut next = record.clone();
        next.template_colors
            .insert(template.id().to_string(), template.default_colors());
        next
    }

    pub fn set_logo(&self, record: &InvoiceRecord, data_url: String) -> InvoiceRecord {
        InvoiceRecord {
            company_logo: data_url,
            ..record.clone()
        }
    }

    pub fn remove_logo(&self, record: &InvoiceRecord) -> InvoiceRecord {
        self.set_logo(record, String::new())
    }

    /// Back to defaults, keeping the logo and the bill-to details.
    pub fn partial_reset(&self, record: &InvoiceRecord) -> InvoiceRecord {
        InvoiceRecord {
            company_logo: record.company_logo.clone(),
            client_name: record.client_name.clone(),
            client_email: record.client_email.clone(),
            client_address: record.client_address.clone(),
            ..self.fresh_record()
        }
    }

    pub fn complete_reset(&self) -> InvoiceRecord {
        self.fresh_record()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorsPatch {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub text: Option<String>,
    pub background: Option<String>,
}

impl From<TemplateColors> for ColorsPatch {
    fn from(colors: TemplateColors) -> Self {
        ColorsPatch {
            primary: Some(colors.primary),
            secondary: Some(colors.secondary),
            text: Some(colors.text),
            background: Some(colors.background),
        }
    }
}

pub fn validate_color(value: &str) -> Result<String> {
    let value = value.trim();
    if HEX_COLOR.is_match(value) {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(Error::InvalidColor(value.to_string()))
    }
}

fn not_found(kind: &'static str, id: &str) -> Error {
    Error::NotFound {
        kind,
        id: id.to_string(),
    }
}

// Millisecond timestamps, bumped until unused.
fn next_id<'a>(existing: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.collect();
    let mut candidate = Utc::now().timestamp_millis();
    while taken.contains(&candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}
