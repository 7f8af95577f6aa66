use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use sheetwise_core::{
    ApplyOutcome, CellRef, ClearMode, Document, ERROR_SENTINEL, EditMode, Highlight, Key, KeyInput,
    Sheet, SheetError, StyleKey, Workbook,
};
use sheetwise_core::sheet::CellUpdate;

fn a1(id: &str) -> CellRef {
    CellRef::decode(id).unwrap()
}

fn computed(doc: &Document, id: &str) -> String {
    doc.cell(a1(id)).map(|c| c.computed.clone()).unwrap_or_default()
}

fn type_into(doc: &mut Document, id: &str, text: &str) {
    doc.pointer_down(a1(id), false).unwrap();
    doc.pointer_up().unwrap();
    doc.text_input(text).unwrap();
    doc.key(KeyInput::new(Key::Enter)).unwrap();
}

#[test]
fn shift_selection_is_canonical() {
    let mut doc = Document::new();
    doc.pointer_down(a1("B2"), false).unwrap();
    doc.pointer_down(a1("A1"), true).unwrap();
    assert_eq!(doc.name_box_label(), "A1:B2");
    assert_eq!(doc.selection().active(), a1("A1"));

    let mut other = Document::new();
    other.pointer_down(a1("A1"), false).unwrap();
    other.pointer_move(a1("B2"));
    other.pointer_up().unwrap();
    assert_eq!(other.selection().rect(), doc.selection().rect());
    assert_eq!(other.name_box_label(), "A1:B2");
}

#[test]
fn keyboard_extend_and_collapse() {
    let mut doc = Document::new();
    doc.pointer_down(a1("C3"), false).unwrap();
    doc.key(KeyInput::shift(Key::Up)).unwrap();
    doc.key(KeyInput::shift(Key::Left)).unwrap();
    assert_eq!(doc.name_box_label(), "B2:C3");
    assert_eq!(doc.view_cell(a1("C3"), Instant::now()).highlight, Highlight::Selected);
    assert_eq!(doc.view_cell(a1("B2"), Instant::now()).highlight, Highlight::Active);

    doc.key(KeyInput::new(Key::Down)).unwrap();
    assert_eq!(doc.name_box_label(), "B3");
}

#[test]
fn typing_commits_and_moves_down() {
    let mut doc = Document::new();
    type_into(&mut doc, "A1", "1");
    assert_eq!(doc.selection().active(), a1("A2"));
    type_into(&mut doc, "B1", "=A1+1");
    assert_eq!(computed(&doc, "B1"), "2");
    assert_eq!(doc.mode(), EditMode::Viewing);
}

#[test]
fn dependency_propagation() {
    let mut doc = Document::new();
    type_into(&mut doc, "A1", "1");
    type_into(&mut doc, "B1", "=A1+1");
    assert_eq!(computed(&doc, "B1"), "2");

    doc.set_cell_from_input(a1("A1"), "5").unwrap();
    assert_eq!(computed(&doc, "B1"), "6");
}

#[test]
fn incomplete_formula_is_shown_verbatim() {
    let mut doc = Document::new();
    doc.pointer_down(a1("C1"), false).unwrap();
    doc.text_input("=SUM(A1:A2").unwrap();
    assert_eq!(computed(&doc, "C1"), "=SUM(A1:A2");
    doc.blur().unwrap();
    assert_eq!(computed(&doc, "C1"), "=SUM(A1:A2");
    assert_eq!(doc.cell(a1("C1")).unwrap().formula, "=SUM(A1:A2");

    type_into(&mut doc, "A1", "4");
    doc.double_click(a1("C1")).unwrap();
    doc.key(KeyInput::new(Key::End)).unwrap();
    doc.text_input(")").unwrap();
    doc.blur().unwrap();
    assert_eq!(computed(&doc, "C1"), "4");
}

#[test]
fn error_sentinel_keeps_formula() {
    let mut doc = Document::new();
    let outcome = doc.set_cell_from_input(a1("A1"), "=1/0").unwrap();
    assert_eq!(outcome, ApplyOutcome::Failed { thrown: true });
    let cell = doc.cell(a1("A1")).unwrap();
    assert_eq!(cell.computed, ERROR_SENTINEL);
    assert_eq!(cell.formula, "=1/0");

    let now = Instant::now();
    assert!(doc.view_cell(a1("A1"), now).errored);
    assert!(!doc.view_cell(a1("A1"), now + Duration::from_secs(5)).errored);
}

#[test]
fn second_edit_force_commits_first() {
    let mut doc = Document::new();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.text_input("7").unwrap();
    assert_eq!(doc.editor().editing_cell(), Some(a1("A1")));

    doc.double_click(a1("B1")).unwrap();
    assert_eq!(doc.editor().editing_cell(), Some(a1("B1")));
    assert_eq!(doc.cell(a1("A1")).unwrap().value, "7");

    doc.pointer_down(a1("C1"), false).unwrap();
    assert_eq!(doc.mode(), EditMode::Viewing);
}

#[test]
fn escape_restores_previous_content() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "keep").unwrap();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.text_input("x").unwrap();
    assert_eq!(doc.view_cell(a1("A1"), Instant::now()).text, "x");

    doc.key(KeyInput::new(Key::Escape)).unwrap();
    assert_eq!(doc.mode(), EditMode::Viewing);
    assert_eq!(computed(&doc, "A1"), "keep");
    assert_eq!(doc.selection().active(), a1("A1"));
}

#[test]
fn autocomplete_flow() {
    let mut doc = Document::new();
    doc.pointer_down(a1("A5"), false).unwrap();
    doc.text_input("=").unwrap();
    assert_eq!(doc.mode(), EditMode::EditingWithAutocomplete);
    doc.text_input("ab").unwrap();
    assert_eq!(doc.editor().autocomplete().unwrap().candidates, vec!["ABS"]);

    doc.key(KeyInput::new(Key::Enter)).unwrap();
    assert_eq!(doc.mode(), EditMode::Editing);
    doc.text_input("-3").unwrap();
    assert_eq!(doc.editor().session().unwrap().text, "=ABS(-3)");

    doc.key(KeyInput::new(Key::Enter)).unwrap();
    assert_eq!(doc.selection().active(), a1("A6"));
    assert_eq!(doc.cell(a1("A5")).unwrap().formula, "=ABS(-3)");
    assert_eq!(computed(&doc, "A5"), "3");
}

#[test]
fn autocomplete_escape_keeps_editing() {
    let mut doc = Document::new();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.text_input("=").unwrap();
    doc.key(KeyInput::new(Key::Escape)).unwrap();
    assert_eq!(doc.mode(), EditMode::Editing);
    doc.text_input("2*3").unwrap();
    doc.key(KeyInput::new(Key::Tab)).unwrap();
    assert_eq!(computed(&doc, "A1"), "6");
    assert_eq!(doc.selection().active(), a1("B1"));
}

#[test]
fn numeric_fill_down() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "5").unwrap();
    doc.fill_handle_down(a1("A1")).unwrap();
    doc.pointer_move(a1("A4"));
    assert!(doc.view_cell(a1("A3"), Instant::now()).fill_preview);

    let filled = doc.pointer_up().unwrap();
    assert_eq!(filled, vec![a1("A2"), a1("A3"), a1("A4")]);
    assert_eq!(
        ["A2", "A3", "A4"].map(|id| computed(&doc, id)),
        ["6", "7", "8"].map(String::from)
    );
    assert!(!doc.view_cell(a1("A3"), Instant::now()).fill_preview);
}

#[test]
fn text_fill_right_and_tie_goes_vertical() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "hello").unwrap();
    doc.fill_handle_down(a1("A1")).unwrap();
    doc.pointer_move(a1("C1"));
    doc.pointer_up().unwrap();
    assert_eq!(computed(&doc, "B1"), "hello");
    assert_eq!(computed(&doc, "C1"), "hello");

    doc.fill_handle_down(a1("A1")).unwrap();
    doc.pointer_move(a1("B2"));
    doc.pointer_up().unwrap();
    assert_eq!(computed(&doc, "A2"), "hello");
    assert_eq!(computed(&doc, "B2"), "");
}

#[test]
fn fill_from_outside_the_grid_is_ignored() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "5").unwrap();
    let outside = CellRef::new(doc.dims().rows, 0);
    doc.fill_handle_down(outside).unwrap();
    assert!(!doc.fill().is_active());

    doc.pointer_move(a1("A3"));
    assert_eq!(doc.pointer_up().unwrap(), Vec::<CellRef>::new());
    assert_eq!(computed(&doc, "A2"), "");
    assert_eq!(computed(&doc, "A1"), "5");
}

#[test]
fn fill_refreshes_dependents_once_done() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "1").unwrap();
    doc.set_cell_from_input(a1("B1"), "=SUM(A1:A3)").unwrap();
    doc.fill_handle_down(a1("A1")).unwrap();
    doc.pointer_move(a1("A3"));
    doc.pointer_up().unwrap();
    assert_eq!(computed(&doc, "B1"), "6");
}

#[test]
fn fill_of_formula_copies_text() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "2").unwrap();
    doc.set_cell_from_input(a1("B1"), "=A1*10").unwrap();
    doc.fill_handle_down(a1("B1")).unwrap();
    doc.pointer_move(a1("B2"));
    doc.pointer_up().unwrap();
    assert_eq!(doc.cell(a1("B2")).unwrap().formula, "=A1*10");
    assert_eq!(computed(&doc, "B2"), "20");
}

#[test]
fn delete_clears_contents_but_keeps_styles() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "x").unwrap();
    doc.set_cell_from_input(a1("B1"), "y").unwrap();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.pointer_down(a1("B1"), true).unwrap();
    assert!(doc.toggle_style_on_selection(StyleKey::Bold).unwrap());

    doc.key(KeyInput::new(Key::Delete)).unwrap();
    let cell = doc.cell(a1("B1")).unwrap();
    assert_eq!(cell.value, "");
    assert_eq!(cell.computed, "");
    assert_eq!(cell.style(StyleKey::Bold), Some("bold"));

    doc.clear_selection(ClearMode::All).unwrap();
    assert_eq!(doc.cell(a1("A1")).unwrap().styles, None);
}

#[test]
fn toggle_follows_active_cell() {
    let mut doc = Document::new();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.toggle_style_on_selection(StyleKey::Italic).unwrap();
    doc.pointer_down(a1("A2"), true).unwrap();
    assert!(doc.toggle_style_on_selection(StyleKey::Italic).unwrap());
    assert!(!doc.toggle_style_on_selection(StyleKey::Italic).unwrap());
    assert_eq!(doc.cell(a1("A1")).unwrap().styles, None);
}

#[test]
fn formula_bar_shows_formula_of_active_cell() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "=1+1").unwrap();
    doc.pointer_down(a1("A1"), false).unwrap();
    doc.pointer_down(a1("B3"), true).unwrap();
    assert_eq!(doc.formula_bar_text(), "");
    doc.pointer_down(a1("A1"), false).unwrap();
    assert_eq!(doc.formula_bar_text(), "=1+1");

    doc.formula_bar_commit("=3*3").unwrap();
    assert_eq!(computed(&doc, "A1"), "9");
}

#[test]
fn sheets_keep_separate_engine_state() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "1").unwrap();
    doc.set_cell_from_input(a1("B1"), "=A1+1").unwrap();

    assert_eq!(doc.add_sheet().unwrap(), 2);
    assert_eq!(doc.active_sheet_number(), 2);
    doc.set_cell_from_input(a1("A1"), "100").unwrap();
    doc.set_cell_from_input(a1("B1"), "=A1+1").unwrap();
    assert_eq!(computed(&doc, "B1"), "101");

    doc.switch_sheet(1).unwrap();
    assert_eq!(computed(&doc, "B1"), "2");
    assert!(doc.switch_sheet(4).is_err());
}

#[test]
fn rejected_sheet_insert_leaves_engine_untouched() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "1").unwrap();
    doc.set_cell_from_input(a1("B1"), "=A1+1").unwrap();

    let mut duplicate = Sheet::new(1);
    duplicate.set(a1("A1"), CellUpdate::literal("50"));
    assert!(matches!(
        doc.insert_sheet(duplicate),
        Err(SheetError::DuplicateSheet(1))
    ));

    assert_eq!(doc.active_sheet_number(), 1);
    doc.set_cell_from_input(a1("C1"), "=A1+1").unwrap();
    assert_eq!(computed(&doc, "C1"), "2");
    assert_eq!(computed(&doc, "B1"), "2");
}

#[test]
fn snapshot_and_reload() {
    let mut doc = Document::new();
    doc.set_cell_from_input(a1("A1"), "3").unwrap();
    doc.set_cell_from_input(a1("A2"), "=A1*A1").unwrap();
    let snapshot = doc.snapshot_active_sheet().unwrap();
    doc.set_cell_from_input(a1("A1"), "4").unwrap();
    assert_eq!(snapshot["A1"]["value"], "3");
    assert_eq!(snapshot["A2"]["computed"], "9");

    let mut sheet = Sheet::new(1);
    sheet.load_data(&snapshot).unwrap();
    sheet.set(a1("A2"), CellUpdate::computed(""));
    let mut second = Sheet::new(2);
    second.set(a1("B2"), CellUpdate::formula("=2+2", ""));
    let workbook = Workbook::from_sheets(uuid::Uuid::new_v4(), "Budget", vec![second, sheet]).unwrap();

    let mut reopened = Document::new();
    reopened.load_workbook(workbook).unwrap();
    assert_eq!(reopened.title(), "Budget");
    assert!(!reopened.modified);
    assert_eq!(computed(&reopened, "A2"), "9");
    reopened.switch_sheet(2).unwrap();
    assert_eq!(computed(&reopened, "B2"), "4");
}

#[test]
fn tab_wraps_at_row_end() {
    let mut doc = Document::new();
    let last_col = CellRef::new(0, doc.dims().cols - 1);
    doc.pointer_down(last_col, false).unwrap();
    doc.key(KeyInput::new(Key::Tab)).unwrap();
    assert_eq!(doc.selection().active(), a1("A2"));
    doc.key(KeyInput::shift(Key::Tab)).unwrap();
    assert_eq!(doc.selection().active(), last_col);
}

#[test]
fn tab_at_last_cell_returns_to_start_of_last_row() {
    let mut doc = Document::new();
    let last = CellRef::new(doc.dims().rows - 1, doc.dims().cols - 1);
    doc.pointer_down(last, false).unwrap();
    doc.pointer_up().unwrap();
    doc.key(KeyInput::new(Key::Tab)).unwrap();
    assert_eq!(doc.selection().active(), CellRef::new(last.row, 0));
}
