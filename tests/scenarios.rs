//! Worked invoice scenarios, end to end through the editor.

use invoice_builder::editor::{LineItemPatch, SettingsPatch};
use invoice_builder::milestones::reallocate;
use invoice_builder::model::format_money;
use invoice_builder::{Editor, InvoiceRecord, LineItem, OverridePolicy, Template, TotalsFlags, compute_totals};

fn record_with(item: LineItem, settings: SettingsPatch, editor: &Editor) -> InvoiceRecord {
    let mut record = editor.fresh_record();
    record.line_items = vec![item];
    let record = editor.recalculate(record);
    editor.update_settings(&record, settings)
}

#[test]
fn single_item_without_vat_splits_evenly() {
    let editor = Editor::default();
    let item = LineItem {
        vat_rate: Some(0.0),
        transaction_fee_rate: Some(0.0),
        ..LineItem::new("1", "Web Development Services", 1, 3000.0)
    };
    let record = record_with(
        item,
        SettingsPatch {
            global_vat_rate: Some(0.0),
            include_vat: Some(false),
            ..Default::default()
        },
        &editor,
    );

    assert_eq!(record.subtotal, 3000.0);
    assert_eq!(record.total_vat, 0.0);
    assert_eq!(record.total_fees, 0.0);
    assert_eq!(record.grand_total, 3000.0);
    let amounts: Vec<String> = record
        .payment_milestones
        .iter()
        .map(|m| format!("{:.2}", m.amount))
        .collect();
    assert_eq!(amounts, ["1500.00", "1500.00"]);
}

#[test]
fn vat_and_fees_on_top_of_item_total() {
    let editor = Editor::default();
    let item = LineItem {
        vat_rate: Some(20.0),
        transaction_fee_rate: Some(2.9),
        ..LineItem::new("1", "Consulting", 40, 75.0)
    };
    let record = record_with(
        item,
        SettingsPatch {
            include_vat: Some(true),
            include_transaction_fees: Some(true),
            absorb_fees: Some(false),
            ..Default::default()
        },
        &editor,
    );

    assert_eq!(format!("{:.2}", record.subtotal), "3000.00");
    assert_eq!(format!("{:.2}", record.total_vat), "600.00");
    assert_eq!(format!("{:.2}", record.total_fees), "87.00");
    assert_eq!(format!("{:.2}", record.grand_total), "3687.00");
    assert_eq!(format_money("USD", record.payment_milestones[0].amount), "$1843.50");
}

#[test]
fn zero_item_vat_uses_global_rate_under_default_policy() {
    let editor = Editor::default();
    let item = LineItem {
        vat_rate: Some(0.0),
        ..LineItem::new("1", "Design", 1, 1000.0)
    };
    let settings = SettingsPatch {
        include_vat: Some(true),
        global_vat_rate: Some(19.0),
        ..Default::default()
    };
    let record = record_with(item.clone(), settings.clone(), &editor);
    assert_eq!(record.total_vat, 190.0);

    let explicit = Editor::new(OverridePolicy::Explicit, Template::default());
    let record = record_with(item, settings, &explicit);
    assert_eq!(record.total_vat, 0.0);
}

#[test]
fn hiding_quantity_changes_the_amount_charged() {
    let editor = Editor::default();
    let record = editor
        .update_line_item(
            &editor.fresh_record(),
            "1",
            LineItemPatch {
                quantity: Some(4),
                unit_price: Some(250.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(record.subtotal, 1000.0);

    let hidden = editor.update_settings(
        &record,
        SettingsPatch {
            show_quantity: Some(false),
            ..Default::default()
        },
    );
    assert_eq!(hidden.subtotal, 250.0);
    assert_eq!(hidden.payment_milestones[0].amount, 125.0);
}

#[test]
fn absorbed_fees_leave_grand_total_alone() {
    let items = [LineItem {
        transaction_fee_rate: Some(50.0),
        ..LineItem::new("1", "Hosting", 2, 100.0)
    }];
    let flags = TotalsFlags {
        show_quantity: true,
        include_vat: true,
        include_transaction_fees: true,
        absorb_fees: true,
    };
    let totals = compute_totals(&items, 10.0, 0.0, flags, OverridePolicy::NonZero);
    assert_eq!(totals.total_fees, 100.0);
    assert_eq!(totals.grand_total, totals.subtotal + totals.total_vat);
}

#[test]
fn milestones_on_two_hundred() {
    let record = InvoiceRecord::default();
    let out = reallocate(&record.payment_milestones, 200.0);
    assert_eq!(out[0].amount, 100.0);
    assert_eq!(out[1].amount, 100.0);
}

#[test]
fn empty_invoice_totals_are_zero() {
    let editor = Editor::default();
    let mut record = editor.fresh_record();
    record.line_items.clear();
    let record = editor.recalculate(record);
    assert_eq!(record.grand_total, 0.0);
    assert!(record.payment_milestones.iter().all(|m| m.amount == 0.0));
}
