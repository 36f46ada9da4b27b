use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::coerce::{lenient_date, lenient_f64, lenient_rate, lenient_u32};
use crate::error::Error;
use crate::milestones::reallocate;
use crate::totals::{OverridePolicy, Totals, TotalsFlags, compute_totals};

pub const CURRENCIES: &[(&str, &str, &str)] = &[
    ("USD", "$", "US Dollar"),
    ("EUR", "€", "Euro"),
    ("GBP", "£", "British Pound"),
    ("CAD", "C$", "Canadian Dollar"),
    ("AUD", "A$", "Australian Dollar"),
    ("JPY", "¥", "Japanese Yen"),
    ("INR", "₹", "Indian Rupee"),
];

/// Symbol for a currency code. Unknown codes fall back to `$`; symbols are
/// cosmetic only.
pub fn currency_symbol(code: &str) -> &'static str {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, symbol, _)| *symbol)
        .unwrap_or("$")
}

pub fn parse_currency(code: &str) -> Result<String, Error> {
    CURRENCIES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(c, _, _)| c.to_string())
        .ok_or_else(|| Error::InvalidCurrency(code.to_string()))
}

pub fn format_money(code: &str, amount: f64) -> String {
    format!("{}{:.2}", currency_symbol(code), amount)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unit_price: f64,
    /// Item-level VAT percentage. `None` means "use the global rate".
    #[serde(default, deserialize_with = "lenient_rate")]
    pub vat_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_rate")]
    pub transaction_fee_rate: Option<f64>,
}

impl LineItem {
    pub fn new(id: impl Into<String>, description: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        LineItem {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
            vat_rate: None,
            transaction_fee_rate: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMilestone {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
    /// Derived from the grand total; overwritten on every recalculation.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient_date", default = "today")]
    pub due_date: NaiveDate,
}

impl PaymentMilestone {
    pub fn new(id: impl Into<String>, description: impl Into<String>, percentage: f64, due_date: NaiveDate) -> Self {
        PaymentMilestone {
            id: id.into(),
            description: description.into(),
            percentage,
            amount: 0.0,
            due_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Template {
    Classic,
    #[default]
    Minimalist,
    Sidebar,
    Creative,
    Blueprint,
    Elegant,
    Grid,
    Dark,
}

impl Template {
    pub const ALL: [Template; 8] = [
        Template::Classic,
        Template::Minimalist,
        Template::Sidebar,
        Template::Creative,
        Template::Blueprint,
        Template::Elegant,
        Template::Grid,
        Template::Dark,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Template::Classic => "classic",
            Template::Minimalist => "minimalist",
            Template::Sidebar => "sidebar",
            Template::Creative => "creative",
            Template::Blueprint => "blueprint",
            Template::Elegant => "elegant",
            Template::Grid => "grid",
            Template::Dark => "dark",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Template::Classic => "Classic Corporate",
            Template::Minimalist => "Minimalist",
            Template::Sidebar => "Modern Sidebar",
            Template::Creative => "Creative Freelancer",
            Template::Blueprint => "Tech Blueprint",
            Template::Elegant => "Elegant Marquee",
            Template::Grid => "Grid & Icons",
            Template::Dark => "Dark Mode",
        }
    }

    pub fn default_colors(self) -> TemplateColors {
        let (primary, secondary, text, background) = match self {
            Template::Classic => ("#2563eb", "#dbeafe", "#1e40af", "#ffffff"),
            Template::Minimalist => ("#000000", "#f5f5f5", "#000000", "#ffffff"),
            Template::Sidebar => ("#4f46e5", "#e0e7ff", "#312e81", "#ffffff"),
            Template::Creative => ("#9333ea", "#f3e8ff", "#581c87", "#ffffff"),
            Template::Blueprint => ("#0891b2", "#cffafe", "#164e63", "#ffffff"),
            Template::Elegant => ("#10b981", "#d1fae5", "#065f46", "#ffffff"),
            Template::Grid => ("#dc2626", "#fee2e2", "#7f1d1d", "#ffffff"),
            Template::Dark => ("#38bdf8", "#1e293b", "#e2e8f0", "#0f172a"),
        };
        TemplateColors {
            primary: primary.into(),
            secondary: secondary.into(),
            text: text.into(),
            background: background.into(),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidTemplate(s.to_string()))
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

// Stored data from other builds may name templates we no longer ship.
impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|_| {
            warn!(template = %raw, "unknown template, using minimalist");
            Template::Minimalist
        }))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TemplateColors {
    pub primary: String,
    pub secondary: String,
    pub text: String,
    pub background: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FieldLabels {
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
    pub subtotal: String,
    pub total: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        FieldLabels {
            description: "Description".into(),
            quantity: "Quantity".into(),
            rate: "Rate".into(),
            amount: "Amount".into(),
            subtotal: "Subtotal".into(),
            total: "Total".into(),
        }
    }
}

impl FieldLabels {
    pub fn get_mut(&mut self, field: &str) -> Option<&mut String> {
        match field.trim().to_ascii_lowercase().as_str() {
            "description" => Some(&mut self.description),
            "quantity" => Some(&mut self.quantity),
            "rate" => Some(&mut self.rate),
            "amount" => Some(&mut self.amount),
            "subtotal" => Some(&mut self.subtotal),
            "total" => Some(&mut self.total),
            _ => None,
        }
    }
}

/// The whole invoice as the builder holds it. Edits replace the record
/// wholesale; the derived totals at the bottom are only written by
/// recalculation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceRecord {
    // Company
    pub company_name: String,
    pub company_logo: String,
    pub company_address: String,
    pub company_website: String,
    pub company_email: String,
    pub company_phone: String,

    // Bill to
    pub client_name: String,
    pub client_email: String,
    pub client_address: String,

    // Invoice
    pub invoice_number: String,
    #[serde(deserialize_with = "lenient_date")]
    pub invoice_date: NaiveDate,
    #[serde(deserialize_with = "lenient_date")]
    pub due_date: NaiveDate,
    pub currency: String,

    pub line_items: Vec<LineItem>,
    pub payment_milestones: Vec<PaymentMilestone>,

    // Settings
    #[serde(deserialize_with = "lenient_f64")]
    pub global_vat_rate: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub global_transaction_fee_rate: f64,
    pub absorb_fees: bool,
    pub template: Template,
    pub show_quantity: bool,
    pub show_rate: bool,
    pub show_pay_button: bool,
    pub include_vat: bool,
    pub include_transaction_fees: bool,
    pub payment_link: String,
    pub notes: String,

    /// Keyed by template id. Keys for templates we do not ship are kept as-is.
    pub template_colors: BTreeMap<String, TemplateColors>,
    pub field_labels: FieldLabels,

    // Derived
    #[serde(deserialize_with = "lenient_f64")]
    pub subtotal: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_vat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_fees: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub grand_total: f64,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Default for InvoiceRecord {
    fn default() -> Self {
        let today = today();
        let in_thirty_days = today + Duration::days(30);

        let record = InvoiceRecord {
            company_name: "Your Company Name".into(),
            company_logo: String::new(),
            company_address: "123 Business Street\nCity, State 12345".into(),
            company_website: "www.yourcompany.com".into(),
            company_email: "hello@yourcompany.com".into(),
            company_phone: "+1 (555) 123-4567".into(),

            client_name: "Client Company".into(),
            client_email: "client@company.com".into(),
            client_address: "456 Client Avenue\nClient City, State 67890".into(),

            invoice_number: "INV-001".into(),
            invoice_date: today,
            due_date: in_thirty_days,
            currency: "USD".into(),

            line_items: vec![LineItem::new("1", "Web Development Services", 1, 3000.0)],
            payment_milestones: vec![
                PaymentMilestone::new("1", "50% Advance Payment", 50.0, today),
                PaymentMilestone::new("2", "50% Final Payment", 50.0, in_thirty_days),
            ],

            global_vat_rate: 0.0,
            global_transaction_fee_rate: 0.0,
            absorb_fees: false,
            template: Template::Minimalist,
            show_quantity: true,
            show_rate: true,
            show_pay_button: true,
            include_vat: false,
            include_transaction_fees: false,
            payment_link: String::new(),
            notes: String::new(),

            template_colors: Template::ALL
                .into_iter()
                .map(|t| (t.id().to_string(), t.default_colors()))
                .collect(),
            field_labels: FieldLabels::default(),

            subtotal: 0.0,
            total_vat: 0.0,
            total_fees: 0.0,
            grand_total: 0.0,
        };

        // The placeholder item has no overrides, so the policy is irrelevant here.
        let totals = compute_totals(
            &record.line_items,
            record.global_vat_rate,
            record.global_transaction_fee_rate,
            record.flags(),
            OverridePolicy::default(),
        );
        let milestones = reallocate(&record.payment_milestones, totals.grand_total);
        InvoiceRecord {
            payment_milestones: milestones,
            ..record.with_totals(totals)
        }
    }
}

impl InvoiceRecord {
    pub fn flags(&self) -> TotalsFlags {
        TotalsFlags {
            show_quantity: self.show_quantity,
            include_vat: self.include_vat,
            include_transaction_fees: self.include_transaction_fees,
            absorb_fees: self.absorb_fees,
        }
    }

    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            total_vat: self.total_vat,
            total_fees: self.total_fees,
            grand_total: self.grand_total,
        }
    }

    pub fn with_totals(self, totals: Totals) -> Self {
        InvoiceRecord {
            subtotal: totals.subtotal,
            total_vat: totals.total_vat,
            total_fees: totals.total_fees,
            grand_total: totals.grand_total,
            ..self
        }
    }

    pub fn colors(&self) -> TemplateColors {
        self.template_colors
            .get(self.template.id())
            .cloned()
            .unwrap_or_else(|| self.template.default_colors())
    }

    pub fn money(&self, amount: f64) -> String {
        format_money(&self.currency, amount)
    }
}
