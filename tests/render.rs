use invoice_builder::editor::{ColorsPatch, MilestonePatch, SettingsPatch};
use invoice_builder::render::Renderer;
use invoice_builder::{Editor, Template};

#[test]
fn rendered_invoice_reflects_totals_and_schedule() {
    let editor = Editor::default();
    let record = editor.update_settings(
        &editor.fresh_record(),
        SettingsPatch {
            include_vat: Some(true),
            global_vat_rate: Some(20.0),
            currency: Some("EUR".into()),
            notes: Some("Net 30".into()),
            ..Default::default()
        },
    );
    let record = editor
        .update_milestone(
            &record,
            "2",
            MilestonePatch {
                description: Some("Handover".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let html = Renderer::embedded().unwrap().render_html(&record).unwrap();
    assert!(html.contains("€3600.00"));
    assert!(html.contains("VAT (20%)"));
    assert!(html.contains("€1800.00"));
    assert!(html.contains("Handover"));
    assert!(html.contains("Net 30"));
    assert!(!html.contains("Transaction Fees"));
}

#[test]
fn absorbed_fees_are_not_shown_to_the_client() {
    let editor = Editor::default();
    let record = editor.update_settings(
        &editor.fresh_record(),
        SettingsPatch {
            include_transaction_fees: Some(true),
            global_transaction_fee_rate: Some(3.0),
            absorb_fees: Some(true),
            ..Default::default()
        },
    );
    assert_eq!(record.total_fees, 90.0);
    let html = Renderer::embedded().unwrap().render_html(&record).unwrap();
    assert!(!html.contains("Transaction Fees"));
    assert!(html.contains("$3000.00"));
}

#[test]
fn template_colours_reach_the_stylesheet() {
    let editor = Editor::default();
    let record = editor.update_settings(
        &editor.fresh_record(),
        SettingsPatch {
            template: Some(Template::Dark),
            ..Default::default()
        },
    );
    let record = editor
        .set_template_colors(
            &record,
            Template::Dark,
            ColorsPatch {
                primary: Some("#ff8800".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let html = Renderer::embedded().unwrap().render_html(&record).unwrap();
    assert!(html.contains("--primary: #ff8800"));
    assert!(html.contains("template-dark"));
}

#[test]
fn hidden_columns_are_not_rendered() {
    let editor = Editor::default();
    let record = editor.update_settings(
        &editor.fresh_record(),
        SettingsPatch {
            show_quantity: Some(false),
            show_rate: Some(false),
            ..Default::default()
        },
    );
    let html = Renderer::embedded().unwrap().render_html(&record).unwrap();
    assert!(!html.contains(">Quantity<"));
    assert!(!html.contains(">Rate<"));
    assert!(html.contains(">Amount<"));
}
