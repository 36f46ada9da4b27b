//! Terminal preview of the invoice.

use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};

use crate::milestones::{AllocationWarning, allocation_warning, total_percentage};
use crate::model::InvoiceRecord;
use crate::totals::{OverridePolicy, effective_rate, item_subtotal};

const RED: Color = Color::Rgb { r: 185, g: 28, b: 28 };
const GREEN: Color = Color::Rgb { r: 4, g: 120, b: 87 };

// Rates inherited from the global setting are shown dimmed in brackets.
fn rate_cell(rate: Option<f64>, global: f64, policy: OverridePolicy) -> Cell {
    let charged = effective_rate(rate, global, policy);
    match rate {
        Some(r) if r == charged => Cell::new(format!("{charged}%")),
        _ => Cell::new(format!("({charged}%)")).add_attribute(Attribute::Dim),
    }
}

pub fn items_table(record: &InvoiceRecord, policy: OverridePolicy) -> Table {
    let labels = &record.field_labels;
    let mut header = vec![Cell::new("ID"), Cell::new(&labels.description)];
    if record.show_quantity {
        header.push(Cell::new(&labels.quantity));
    }
    if record.show_rate {
        header.push(Cell::new(&labels.rate));
    }
    if record.include_vat {
        header.push(Cell::new("VAT"));
    }
    if record.include_transaction_fees {
        header.push(Cell::new("Fee"));
    }
    header.push(Cell::new(&labels.amount));

    let mut table = Table::new();
    table.set_header(header);

    for item in &record.line_items {
        let mut row = vec![Cell::new(&item.id), Cell::new(&item.description)];
        if record.show_quantity {
            row.push(Cell::new(item.quantity).set_alignment(CellAlignment::Center));
        }
        if record.show_rate {
            row.push(Cell::new(record.money(item.unit_price)).set_alignment(CellAlignment::Right));
        }
        if record.include_vat {
            row.push(rate_cell(item.vat_rate, record.global_vat_rate, policy));
        }
        if record.include_transaction_fees {
            row.push(rate_cell(item.transaction_fee_rate, record.global_transaction_fee_rate, policy));
        }
        row.push(
            Cell::new(record.money(item_subtotal(item, record.show_quantity)))
                .set_alignment(CellAlignment::Right),
        );
        table.add_row(row);
    }
    table
}

pub fn totals_table(record: &InvoiceRecord) -> Table {
    let labels = &record.field_labels;
    let mut table = Table::new();
    table.add_row(vec![Cell::new(&labels.subtotal), money_cell(record, record.subtotal)]);

    if record.include_vat {
        table.add_row(vec![
            Cell::new(format!("VAT ({}%)", record.global_vat_rate)),
            money_cell(record, record.total_vat),
        ]);
    }
    if record.include_transaction_fees {
        let label = if record.absorb_fees {
            "Transaction Fees (absorbed)"
        } else {
            "Transaction Fees"
        };
        let cell = money_cell(record, record.total_fees);
        let cell = if record.absorb_fees { cell.add_attribute(Attribute::Dim) } else { cell };
        table.add_row(vec![Cell::new(label), cell]);
    }

    table.add_row(vec![
        Cell::new(&labels.total).add_attribute(Attribute::Bold),
        money_cell(record, record.grand_total).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn schedule_table(record: &InvoiceRecord) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Milestone"),
        Cell::new("Due"),
        Cell::new("%"),
        Cell::new("Amount"),
    ]);

    for milestone in &record.payment_milestones {
        table.add_row(vec![
            Cell::new(&milestone.id),
            Cell::new(&milestone.description),
            Cell::new(milestone.due_date.format("%Y-%m-%d")),
            Cell::new(format!("{}%", milestone.percentage)).set_alignment(CellAlignment::Right),
            money_cell(record, milestone.amount),
        ]);
    }

    let total = total_percentage(&record.payment_milestones);
    let total_cell = Cell::new(format!("{total}%"))
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Right);
    let total_cell = match allocation_warning(&record.payment_milestones) {
        Some(AllocationWarning::OverAllocated(_)) => total_cell.fg(RED),
        None if total == 100.0 => total_cell.fg(GREEN),
        None => total_cell,
    };
    table.add_row(vec![
        Cell::new(""),
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        total_cell,
        Cell::new(""),
    ]);
    table
}

fn money_cell(record: &InvoiceRecord, amount: f64) -> Cell {
    Cell::new(record.money(amount)).set_alignment(CellAlignment::Right)
}

pub fn warning_text(record: &InvoiceRecord) -> Option<String> {
    allocation_warning(&record.payment_milestones).map(|AllocationWarning::OverAllocated(total)| {
        format!("Milestone percentages add up to {total}%, more than 100%")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentMilestone;

    #[test]
    fn hidden_columns_are_left_out() {
        let mut record = InvoiceRecord::default();
        record.show_quantity = false;
        record.show_rate = false;
        let rendered = items_table(&record, OverridePolicy::NonZero).to_string();
        assert!(!rendered.contains("Quantity"));
        assert!(!rendered.contains("Rate"));
        assert!(rendered.contains("$3000.00"));
    }

    #[test]
    fn zero_override_shows_the_rate_actually_charged() {
        let mut record = InvoiceRecord::default();
        record.include_vat = true;
        record.global_vat_rate = 20.0;
        record.line_items[0].vat_rate = Some(0.0);

        let inherited = items_table(&record, OverridePolicy::NonZero).to_string();
        assert!(inherited.contains("(20%)"));
        assert!(!inherited.contains(" 0%"));

        let explicit = items_table(&record, OverridePolicy::Explicit).to_string();
        assert!(explicit.contains(" 0%"));
        assert!(!explicit.contains("(20%)"));
    }

    #[test]
    fn over_allocation_produces_warning() {
        let mut record = InvoiceRecord::default();
        assert!(warning_text(&record).is_none());
        record.payment_milestones.push(PaymentMilestone::new(
            "3",
            "Bonus",
            10.0,
            record.due_date,
        ));
        let text = warning_text(&record).unwrap();
        assert!(text.contains("110%"));
    }

    #[test]
    fn absorbed_fees_are_labelled() {
        let mut record = InvoiceRecord::default();
        record.include_transaction_fees = true;
        record.absorb_fees = true;
        assert!(totals_table(&record).to_string().contains("absorbed"));
    }
}
