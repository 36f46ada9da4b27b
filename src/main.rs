use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, DateSelect, InquireError, Text};
use tracing::info;
use tracing_subscriber::EnvFilter;

use invoice_builder::actions::{self, StubOutcome};
use invoice_builder::editor::{ColorsPatch, DetailsPatch, LineItemPatch, MilestonePatch, SettingsPatch};
use invoice_builder::model::{CURRENCIES, parse_currency};
use invoice_builder::render::Renderer;
use invoice_builder::store::{format_last_saved, read_logo};
use invoice_builder::{AppSettings, Editor, InvoiceRecord, OverridePolicy, Store, Template, table};

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "invoice-builder", about = "Build invoices with line items, rates and payment milestones")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the invoice preview
    Show,
    /// Walk through the invoice interactively
    New,
    /// Add, edit or remove line items
    Item {
        #[command(subcommand)]
        action: ItemCommand,
    },
    /// Add, edit or remove payment milestones
    Milestone {
        #[command(subcommand)]
        action: MilestoneCommand,
    },
    /// Change rates, flags and invoice details
    Set(SetArgs),
    /// Select a template, or list them
    Template { template: Option<Template> },
    /// Customize a template's colours
    Color(ColorArgs),
    /// Rename a column or totals label
    Label { field: String, text: String },
    /// Set or remove the company logo
    Logo {
        path: Option<PathBuf>,
        #[arg(long, conflicts_with = "path")]
        remove: bool,
    },
    /// Render the invoice to HTML
    Render {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save now
    Save,
    /// Reset to defaults, keeping the logo and bill-to details unless --complete
    Reset {
        #[arg(long)]
        complete: bool,
    },
    /// Download the invoice as PDF
    Download,
    /// Email the invoice to the client
    Email,
    /// Configure data directory and rate policy
    Config {
        #[arg(long)]
        data_root: Option<String>,
        #[arg(long)]
        policy: Option<OverridePolicy>,
        #[arg(long)]
        default_template: Option<Template>,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    Add {
        description: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        vat: Option<f64>,
        #[arg(long)]
        fee: Option<f64>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        quantity: Option<u32>,
        #[arg(short, long)]
        price: Option<f64>,
        #[arg(long, conflicts_with = "clear_vat")]
        vat: Option<f64>,
        #[arg(long)]
        clear_vat: bool,
        #[arg(long, conflicts_with = "clear_fee")]
        fee: Option<f64>,
        #[arg(long)]
        clear_fee: bool,
    },
    Remove { id: String },
}

#[derive(Subcommand)]
enum MilestoneCommand {
    Add {
        description: String,
        #[arg(short, long, default_value_t = 0.0)]
        percentage: f64,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        percentage: Option<f64>,
        /// Override the computed amount until the next recalculation
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    Remove { id: String },
}

#[derive(Args)]
struct SetArgs {
    #[arg(long)]
    vat_rate: Option<f64>,
    #[arg(long)]
    fee_rate: Option<f64>,
    #[arg(long)]
    include_vat: Option<bool>,
    #[arg(long)]
    include_fees: Option<bool>,
    #[arg(long)]
    absorb_fees: Option<bool>,
    #[arg(long)]
    show_quantity: Option<bool>,
    #[arg(long)]
    show_rate: Option<bool>,
    #[arg(long)]
    show_pay_button: Option<bool>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    payment_link: Option<String>,
    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    company_name: Option<String>,
    #[arg(long)]
    company_address: Option<String>,
    #[arg(long)]
    company_website: Option<String>,
    #[arg(long)]
    company_email: Option<String>,
    #[arg(long)]
    company_phone: Option<String>,
    #[arg(long)]
    client_name: Option<String>,
    #[arg(long)]
    client_email: Option<String>,
    #[arg(long)]
    client_address: Option<String>,
    #[arg(long)]
    number: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    due: Option<NaiveDate>,
}

#[derive(Args)]
struct ColorArgs {
    /// Defaults to the selected template
    template: Option<Template>,
    #[arg(long)]
    primary: Option<String>,
    #[arg(long)]
    secondary: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    background: Option<String>,
    #[arg(long)]
    reset: bool,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    let settings = AppSettings::load().context("loading settings")?;

    if let Commands::Config {
        data_root,
        policy,
        default_template,
    } = command
    {
        return configure(settings, data_root, policy, default_template);
    }

    let session = Session::open(settings)?;
    let editor = session.editor;
    let record = &session.record;

    match command {
        Commands::Show => session.show(record),
        Commands::New => match wizard(&editor, record) {
            Ok(next) => session.commit(next),
            Err(e) if is_cancel(&e) => {
                println!("Cancelled");
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Item { action } => session.commit(item_command(&editor, record, action)?),
        Commands::Milestone { action } => session.commit(milestone_command(&editor, record, action)?),
        Commands::Set(args) => session.commit(set_command(&editor, record, args)?),
        Commands::Template { template: None } => {
            for template in Template::ALL {
                let marker = if template == record.template { "▶" } else { " " };
                println!("{marker} {:<11} {}", template.id(), template.display_name());
            }
            Ok(())
        }
        Commands::Template {
            template: Some(template),
        } => {
            let patch = SettingsPatch {
                template: Some(template),
                ..Default::default()
            };
            println!("✅ Template: {}", template.display_name());
            session.commit(editor.update_settings(record, patch))
        }
        Commands::Color(args) => {
            let template = args.template.unwrap_or(record.template);
            let next = if args.reset {
                editor.reset_template_colors(record, template)
            } else {
                let patch = ColorsPatch {
                    primary: args.primary,
                    secondary: args.secondary,
                    text: args.text,
                    background: args.background,
                };
                editor.set_template_colors(record, template, patch)?
            };
            session.commit(next)
        }
        Commands::Label { field, text } => session.commit(editor.set_field_label(record, &field, &text)?),
        Commands::Logo { path, remove } => {
            let next = match path {
                Some(path) if !remove => {
                    let data_url = read_logo(&path).with_context(|| format!("reading logo {}", path.display()))?;
                    editor.set_logo(record, data_url)
                }
                _ => editor.remove_logo(record),
            };
            session.commit(next)
        }
        Commands::Render { out } => {
            let renderer = Renderer::with_overrides(&session.settings.templates_dir())?;
            let out_dir = out.unwrap_or_else(|| session.settings.output_dir());
            let path = renderer.write_preview(record, &out_dir)?;
            println!("✅ Preview written: {}", path.display());
            Ok(())
        }
        Commands::Save => {
            session.store.save(record)?;
            println!("✅ Saved.");
            Ok(())
        }
        Commands::Reset { complete } => {
            if complete {
                let sure = Confirm::new("Reset everything to default values? This cannot be undone.")
                    .with_default(false)
                    .prompt()?;
                if !sure {
                    return Ok(());
                }
                session.store.clear()?;
                session.commit(editor.complete_reset())
            } else {
                let sure = Confirm::new("Reset all data except company logo and bill to information?")
                    .with_default(false)
                    .prompt()?;
                if !sure {
                    return Ok(());
                }
                session.commit(editor.partial_reset(record))
            }
        }
        Commands::Download => {
            report(actions::download_pdf(record));
            Ok(())
        }
        Commands::Email => {
            report(actions::email_invoice(record));
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

// ==========================================
// 1. Session: load, edit, save
// ==========================================

struct Session {
    settings: AppSettings,
    store: Store,
    editor: Editor,
    record: InvoiceRecord,
}

impl Session {
    fn open(settings: AppSettings) -> Result<Session> {
        let editor = Editor::new(settings.override_policy, settings.default_template);
        let store = Store::new(settings.data_dir());
        let record = match store.load().context("loading saved invoice")? {
            Some(saved) => editor.recalculate(saved),
            None => editor.fresh_record(),
        };
        Ok(Session {
            settings,
            store,
            editor,
            record,
        })
    }

    // Every edit is saved straight away; the record is written whole.
    fn commit(&self, record: InvoiceRecord) -> Result<()> {
        self.store.save(&record).context("saving invoice")?;
        self.show(&record)
    }

    fn show(&self, record: &InvoiceRecord) -> Result<()> {
        println!(
            "\n{} · {} · {} → {}",
            record.invoice_number,
            record.template.display_name(),
            record.company_name,
            record.client_name
        );
        println!("{}", table::items_table(record, self.editor.policy()));
        println!("{}", table::totals_table(record));
        println!("\n--- Payment Schedule ---");
        println!("{}", table::schedule_table(record));
        if let Some(warning) = table::warning_text(record) {
            println!("⚠️  {warning}");
        }
        let saved = self.store.last_saved()?;
        println!("Last saved: {}", format_last_saved(saved, Utc::now()));
        Ok(())
    }
}

fn report(outcome: StubOutcome) {
    println!("ℹ️  {} ({})", outcome.message, outcome.invoice_number);
}

fn configure(
    mut settings: AppSettings,
    data_root: Option<String>,
    policy: Option<OverridePolicy>,
    default_template: Option<Template>,
) -> Result<()> {
    if data_root.is_none() && policy.is_none() && default_template.is_none() {
        println!("\n⚙️  --- Configuration Setup ---");
        let current = settings.data_dir().to_string_lossy().to_string();
        let root = Text::new("Data directory:").with_default(&current).prompt()?;
        settings.data_root = Some(root);
    } else {
        if let Some(root) = data_root {
            settings.data_root = Some(root);
        }
        if let Some(policy) = policy {
            settings.override_policy = policy;
        }
        if let Some(template) = default_template {
            settings.default_template = template;
        }
    }
    let path = settings.save()?;
    info!(path = %path.display(), "settings written");
    println!("✅ Settings saved to {}", path.display());
    Ok(())
}

// ==========================================
// 2. Edit Commands
// ==========================================

fn item_command(editor: &Editor, record: &InvoiceRecord, action: ItemCommand) -> Result<InvoiceRecord> {
    let next = match action {
        ItemCommand::Add {
            description,
            quantity,
            price,
            vat,
            fee,
        } => {
            let (added, id) = editor.add_line_item(record);
            let patch = LineItemPatch {
                description: Some(description),
                quantity: Some(quantity),
                unit_price: Some(price),
                vat_rate: Some(vat),
                transaction_fee_rate: Some(fee),
            };
            println!("✅ Added line item {id}");
            editor.update_line_item(&added, &id, patch)?
        }
        ItemCommand::Update {
            id,
            description,
            quantity,
            price,
            vat,
            clear_vat,
            fee,
            clear_fee,
        } => {
            let patch = LineItemPatch {
                description,
                quantity,
                unit_price: price,
                vat_rate: if clear_vat { Some(None) } else { vat.map(Some) },
                transaction_fee_rate: if clear_fee { Some(None) } else { fee.map(Some) },
            };
            editor.update_line_item(record, &id, patch)?
        }
        ItemCommand::Remove { id } => editor.remove_line_item(record, &id)?,
    };
    Ok(next)
}

fn milestone_command(editor: &Editor, record: &InvoiceRecord, action: MilestoneCommand) -> Result<InvoiceRecord> {
    let next = match action {
        MilestoneCommand::Add {
            description,
            percentage,
            due,
        } => {
            let (added, id) = editor.add_milestone(record);
            let patch = MilestonePatch {
                description: Some(description),
                percentage: Some(percentage),
                due_date: due,
                ..Default::default()
            };
            println!("✅ Added milestone {id}");
            editor.update_milestone(&added, &id, patch)?
        }
        MilestoneCommand::Update {
            id,
            description,
            percentage,
            amount,
            due,
        } => {
            let patch = MilestonePatch {
                description,
                percentage,
                amount,
                due_date: due,
            };
            editor.update_milestone(record, &id, patch)?
        }
        MilestoneCommand::Remove { id } => editor.remove_milestone(record, &id)?,
    };
    Ok(next)
}

fn set_command(editor: &Editor, record: &InvoiceRecord, args: SetArgs) -> Result<InvoiceRecord> {
    let currency = args.currency.as_deref().map(parse_currency).transpose()?;
    let settings = SettingsPatch {
        global_vat_rate: args.vat_rate,
        global_transaction_fee_rate: args.fee_rate,
        absorb_fees: args.absorb_fees,
        show_quantity: args.show_quantity,
        show_rate: args.show_rate,
        show_pay_button: args.show_pay_button,
        include_vat: args.include_vat,
        include_transaction_fees: args.include_fees,
        template: None,
        currency,
        payment_link: args.payment_link,
        notes: args.notes,
    };
    let details = DetailsPatch {
        company_name: args.company_name,
        company_address: args.company_address,
        company_website: args.company_website,
        company_email: args.company_email,
        company_phone: args.company_phone,
        client_name: args.client_name,
        client_email: args.client_email,
        client_address: args.client_address,
        invoice_number: args.number,
        invoice_date: args.date,
        due_date: args.due,
    };
    let next = editor.update_settings(record, settings);
    Ok(editor.update_details(&next, details))
}

// ==========================================
// 3. Interactive Wizard
// ==========================================

fn is_cancel(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

fn wizard(editor: &Editor, record: &InvoiceRecord) -> Result<InvoiceRecord> {
    println!("\n--- Invoice Details ---");
    let details = DetailsPatch {
        company_name: Some(Text::new("Business Name:").with_default(&record.company_name).prompt()?),
        client_name: Some(Text::new("Client Name:").with_default(&record.client_name).prompt()?),
        client_email: Some(Text::new("Client Email:").with_default(&record.client_email).prompt()?),
        invoice_number: Some(Text::new("Invoice Number:").with_default(&record.invoice_number).prompt()?),
        invoice_date: Some(
            DateSelect::new("Invoice Date:")
                .with_default(record.invoice_date)
                .prompt()?,
        ),
        due_date: Some(DateSelect::new("Due Date:").with_default(record.due_date).prompt()?),
        ..Default::default()
    };
    let mut next = editor.update_details(record, details);

    let codes: Vec<&str> = CURRENCIES.iter().map(|(code, _, _)| *code).collect();
    let currency = inquire::Select::new("Currency:", codes)
        .with_starting_cursor(
            CURRENCIES
                .iter()
                .position(|(code, _, _)| *code == next.currency)
                .unwrap_or(0),
        )
        .prompt()?;

    println!("\n--- Enter Line Items ---");
    println!("(Leave Description empty to keep the current items)");
    let items = enter_line_items()?;
    if !items.is_empty() {
        let keep: Vec<String> = next.line_items.iter().map(|i| i.id.clone()).collect();
        for (description, quantity, price) in items {
            let (added, id) = editor.add_line_item(&next);
            let patch = LineItemPatch {
                description: Some(description),
                quantity: Some(quantity),
                unit_price: Some(price),
                ..Default::default()
            };
            next = editor.update_line_item(&added, &id, patch)?;
        }
        for id in keep {
            next = editor.remove_line_item(&next, &id)?;
        }
    }

    println!("\n--- Tax & Fees ---");
    let include_vat = Confirm::new("Add VAT to total?").with_default(next.include_vat).prompt()?;
    let vat_rate = if include_vat {
        Some(
            CustomType::<f64>::new("Global VAT Rate %:")
                .with_default(next.global_vat_rate)
                .prompt()?,
        )
    } else {
        None
    };
    let include_fees = Confirm::new("Add transaction fees?")
        .with_default(next.include_transaction_fees)
        .prompt()?;
    let (fee_rate, absorb) = if include_fees {
        let rate = CustomType::<f64>::new("Transaction Fee Rate %:")
            .with_default(next.global_transaction_fee_rate)
            .prompt()?;
        let absorb = Confirm::new("Absorb fees yourself?")
            .with_default(next.absorb_fees)
            .prompt()?;
        (Some(rate), Some(absorb))
    } else {
        (None, None)
    };
    next = editor.update_settings(
        &next,
        SettingsPatch {
            include_vat: Some(include_vat),
            global_vat_rate: vat_rate,
            include_transaction_fees: Some(include_fees),
            global_transaction_fee_rate: fee_rate,
            absorb_fees: absorb,
            currency: Some(currency.to_string()),
            ..Default::default()
        },
    );

    if Confirm::new("Edit payment schedule?").with_default(false).prompt()? {
        next = enter_milestones(editor, next)?;
    }

    Ok(next)
}

fn enter_line_items() -> Result<Vec<(String, u32, f64)>> {
    let mut items = Vec::new();
    loop {
        let description = Text::new("Description (leave empty to finish):").prompt()?;
        if description.trim().is_empty() {
            break;
        }
        let quantity = CustomType::<u32>::new("Quantity:").with_default(1).prompt()?;
        let price = CustomType::<f64>::new("Unit Price:").prompt()?;
        items.push((description, quantity, price));
    }
    Ok(items)
}

fn enter_milestones(editor: &Editor, record: InvoiceRecord) -> Result<InvoiceRecord> {
    let mut next = record;
    let keep: Vec<String> = next.payment_milestones.iter().map(|m| m.id.clone()).collect();
    let mut added_any = false;
    let mut allocated: f64 = 0.0;

    loop {
        let description = Text::new("Milestone (leave empty to finish):").prompt()?;
        if description.trim().is_empty() {
            break;
        }
        let percentage = CustomType::<f64>::new("Percentage:")
            .with_default((100.0 - allocated).max(0.0))
            .prompt()?;
        let due = DateSelect::new("Due Date:")
            .with_default(Local::now().date_naive())
            .prompt()?;

        let (added, id) = editor.add_milestone(&next);
        let patch = MilestonePatch {
            description: Some(description),
            percentage: Some(percentage),
            due_date: Some(due),
            ..Default::default()
        };
        next = editor.update_milestone(&added, &id, patch)?;
        allocated += percentage;
        added_any = true;
    }

    if added_any {
        for id in keep {
            next = editor.remove_milestone(&next, &id)?;
        }
    }
    Ok(next)
}
