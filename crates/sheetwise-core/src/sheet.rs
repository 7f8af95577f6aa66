//! Cell store: the authoritative per-sheet mapping of coordinates to cells.
//!
//! Cells are created lazily on first access and are never removed, only
//! cleared. The store never evaluates formulas; `computed` is written by the
//! formula bridge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::error::{Result, SheetError};
use crate::selection::GridDims;
use sheetwise_engine::engine::CellRef;

/// Style attributes a cell may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleKey {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    FontFamily,
    FontSize,
    Color,
    Background,
    Align,
}

impl StyleKey {
    /// Value stored when an on/off style is toggled on.
    pub fn flag_value(self) -> Option<&'static str> {
        match self {
            StyleKey::Bold => Some("bold"),
            StyleKey::Italic => Some("italic"),
            StyleKey::Underline => Some("underline"),
            StyleKey::Strikethrough => Some("line-through"),
            _ => None,
        }
    }
}

pub type Styles = BTreeMap<StyleKey, String>;

/// A single cell as persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Raw text as entered.
    #[serde(default)]
    pub value: String,
    /// Equal to `value` when it starts with `=`, otherwise empty.
    #[serde(default)]
    pub formula: String,
    /// Displayed result.
    #[serde(default)]
    pub computed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Styles>,
}

impl Cell {
    pub fn has_formula(&self) -> bool {
        !self.formula.is_empty()
    }

    /// Re-derive `formula` from `value`.
    fn sync_formula(&mut self) {
        if self.value.starts_with('=') {
            if self.formula != self.value {
                self.formula = self.value.clone();
            }
        } else {
            self.formula.clear();
        }
    }

    /// Text shown when editing or in the formula bar.
    pub fn edit_text(&self) -> &str {
        if self.has_formula() {
            &self.formula
        } else {
            &self.value
        }
    }

    pub fn style(&self, key: StyleKey) -> Option<&str> {
        self.styles.as_ref()?.get(&key).map(String::as_str)
    }

    pub fn set_style(&mut self, key: StyleKey, value: impl Into<String>) {
        self.styles.get_or_insert_with(Styles::new).insert(key, value.into());
    }

    pub fn clear_style(&mut self, key: StyleKey) {
        if let Some(styles) = self.styles.as_mut() {
            styles.remove(&key);
            if styles.is_empty() {
                self.styles = None;
            }
        }
    }

    /// Flip an on/off style. Returns whether the style is now set.
    pub fn toggle_style(&mut self, key: StyleKey) -> bool {
        if self.style(key).is_some() {
            self.clear_style(key);
            false
        } else {
            self.set_style(key, key.flag_value().unwrap_or("true"));
            true
        }
    }
}

/// Partial update merged into a cell by [`Sheet::set`]. Unset fields are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellUpdate {
    pub value: Option<String>,
    pub formula: Option<String>,
    pub computed: Option<String>,
    pub styles: Option<Option<Styles>>,
}

impl CellUpdate {
    /// Contents for a literal entry: no formula, displayed as typed.
    pub fn literal(text: &str) -> Self {
        CellUpdate {
            value: Some(text.to_string()),
            formula: Some(String::new()),
            computed: Some(text.to_string()),
            styles: None,
        }
    }

    /// Contents for a formula entry with its displayed result.
    pub fn formula(text: &str, computed: impl Into<String>) -> Self {
        CellUpdate {
            value: Some(text.to_string()),
            formula: Some(text.to_string()),
            computed: Some(computed.into()),
            styles: None,
        }
    }

    pub fn computed(computed: impl Into<String>) -> Self {
        CellUpdate {
            computed: Some(computed.into()),
            ..Default::default()
        }
    }
}

/// What [`Sheet::clear`] resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearMode {
    /// Value, formula and computed; styles are kept.
    Contents,
    /// Contents and styles.
    All,
}

/// One sheet of a workbook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: Uuid,
    /// 1-based ordering key; see [`crate::workbook::engine_index`].
    pub sheet_number: u32,
    #[serde(with = "cell_map")]
    data: BTreeMap<CellRef, Cell>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Sheet {
    pub fn new(sheet_number: u32) -> Self {
        Self::with_id(Uuid::new_v4(), sheet_number)
    }

    pub fn with_id(id: Uuid, sheet_number: u32) -> Self {
        let now = Utc::now();
        Sheet {
            id,
            sheet_number,
            data: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn title(&self) -> String {
        format!("Sheet{}", self.sheet_number)
    }

    /// Cell at `coord`, created empty on first access.
    pub fn get(&mut self, coord: CellRef) -> &Cell {
        self.data.entry(coord).or_default()
    }

    pub fn get_mut(&mut self, coord: CellRef) -> &mut Cell {
        self.data.entry(coord).or_default()
    }

    /// Cell at `coord` without creating it.
    pub fn peek(&self, coord: CellRef) -> Option<&Cell> {
        self.data.get(&coord)
    }

    /// Merge `update` into the cell at `coord`.
    pub fn set(&mut self, coord: CellRef, update: CellUpdate) -> &Cell {
        self.updated_at = Utc::now();
        let cell = self.data.entry(coord).or_default();
        if let Some(value) = update.value {
            cell.value = value;
        }
        if let Some(formula) = update.formula {
            cell.formula = formula;
        }
        if let Some(computed) = update.computed {
            cell.computed = computed;
        }
        if let Some(styles) = update.styles {
            cell.styles = styles;
        }
        debug_assert!(cell.formula.is_empty() || cell.value.starts_with('='));
        cell
    }

    pub fn clear(&mut self, coord: CellRef, mode: ClearMode) {
        self.updated_at = Utc::now();
        let cell = self.data.entry(coord).or_default();
        cell.value.clear();
        cell.formula.clear();
        cell.computed.clear();
        if mode == ClearMode::All {
            cell.styles = None;
        }
    }

    /// Materialize every cell of a `dims` grid.
    pub fn initialize(&mut self, dims: GridDims) {
        for row in 0..dims.rows {
            for col in 0..dims.cols {
                self.data.entry(CellRef::new(row, col)).or_default();
            }
        }
    }

    /// Coordinates whose cell holds a formula, in row-major order.
    pub fn formula_cells(&self) -> Vec<CellRef> {
        self.data
            .iter()
            .filter(|(_, cell)| cell.has_formula())
            .map(|(coord, _)| *coord)
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Persisted shape: `{ "<CellId>": { value, formula, computed, styles? } }`.
    pub fn data_to_json(&self) -> Json {
        let mut map = Map::with_capacity(self.data.len());
        for (coord, cell) in &self.data {
            // Serializing a Cell cannot fail: it only holds strings.
            if let Ok(value) = serde_json::to_value(cell) {
                map.insert(coord.to_string(), value);
            }
        }
        Json::Object(map)
    }

    /// Parse the persisted shape. Every key must be a well-formed cell id.
    pub fn data_from_json(json: &Json) -> Result<BTreeMap<CellRef, Cell>> {
        let Json::Object(map) = json else {
            return Err(SheetError::NotAnObject);
        };
        let mut data = BTreeMap::new();
        for (id, value) in map {
            let coord = CellRef::decode(id)?;
            let mut cell: Cell = serde_json::from_value(value.clone())?;
            cell.sync_formula();
            data.insert(coord, cell);
        }
        Ok(data)
    }

    /// Replace this sheet's cells with persisted data.
    pub fn load_data(&mut self, json: &Json) -> Result<()> {
        self.data = Self::data_from_json(json)?;
        Ok(())
    }
}

/// Serde adapter storing cells keyed by their A1 id.
mod cell_map {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Cell;
    use sheetwise_engine::engine::CellRef;

    pub fn serialize<S: Serializer>(
        data: &BTreeMap<CellRef, Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let by_id: BTreeMap<String, &Cell> =
            data.iter().map(|(coord, cell)| (coord.to_string(), cell)).collect();
        by_id.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CellRef, Cell>, D::Error> {
        let by_id = BTreeMap::<String, Cell>::deserialize(deserializer)?;
        by_id
            .into_iter()
            .map(|(id, mut cell)| {
                cell.sync_formula();
                CellRef::decode(&id)
                    .map(|coord| (coord, cell))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn a1(id: &str) -> CellRef {
        CellRef::decode(id).unwrap()
    }

    #[test]
    fn test_get_creates_empty_cell() {
        let mut sheet = Sheet::new(1);
        assert!(sheet.peek(a1("C3")).is_none());
        assert_eq!(sheet.get(a1("C3")), &Cell::default());
        assert!(sheet.peek(a1("C3")).is_some());
    }

    #[test]
    fn test_set_merges_and_keeps_styles() {
        let mut sheet = Sheet::new(1);
        sheet.get_mut(a1("A1")).toggle_style(StyleKey::Bold);
        sheet.set(a1("A1"), CellUpdate::literal("hi"));
        let cell = sheet.peek(a1("A1")).unwrap();
        assert_eq!(cell.value, "hi");
        assert_eq!(cell.computed, "hi");
        assert_eq!(cell.style(StyleKey::Bold), Some("bold"));

        sheet.set(a1("A1"), CellUpdate::computed("x"));
        assert_eq!(sheet.peek(a1("A1")).unwrap().value, "hi");
    }

    #[test]
    fn test_clear_modes() {
        let mut sheet = Sheet::new(1);
        sheet.set(a1("B2"), CellUpdate::formula("=1+1", "2"));
        sheet.get_mut(a1("B2")).set_style(StyleKey::Color, "#ff0000");

        sheet.clear(a1("B2"), ClearMode::Contents);
        let cell = sheet.peek(a1("B2")).unwrap();
        assert_eq!((cell.value.as_str(), cell.formula.as_str(), cell.computed.as_str()), ("", "", ""));
        assert_eq!(cell.style(StyleKey::Color), Some("#ff0000"));

        sheet.clear(a1("B2"), ClearMode::All);
        assert_eq!(sheet.peek(a1("B2")).unwrap(), &Cell::default());
    }

    #[test]
    fn test_toggle_style_round_trips_to_none() {
        let mut cell = Cell::default();
        assert!(cell.toggle_style(StyleKey::Italic));
        assert!(!cell.toggle_style(StyleKey::Italic));
        assert_eq!(cell.styles, None);
    }

    #[test]
    fn test_initialize_and_formula_cells() {
        let mut sheet = Sheet::new(1);
        sheet.initialize(GridDims::new(3, 2));
        assert_eq!(sheet.len(), 6);
        sheet.set(a1("B3"), CellUpdate::formula("=A1", "0"));
        sheet.set(a1("A2"), CellUpdate::formula("=B1", "0"));
        assert_eq!(sheet.formula_cells(), vec![a1("A2"), a1("B3")]);
    }

    #[test]
    fn test_json_shape() {
        let mut sheet = Sheet::new(1);
        sheet.set(a1("AA12"), CellUpdate::literal("5"));
        sheet.get_mut(a1("A1")).set_style(StyleKey::FontSize, "14px");

        assert_eq!(
            sheet.data_to_json(),
            json!({
                "A1": { "value": "", "formula": "", "computed": "", "styles": { "fontSize": "14px" } },
                "AA12": { "value": "5", "formula": "", "computed": "5" }
            })
        );
    }

    #[test]
    fn test_json_load_defaults_and_rejects_bad_keys() {
        let data = Sheet::data_from_json(&json!({ "B2": { "value": "x" } })).unwrap();
        assert_eq!(data[&a1("B2")].computed, "");

        let err = Sheet::data_from_json(&json!({ "2B": {} })).unwrap_err();
        assert!(matches!(err, SheetError::Address(_)));
        assert!(matches!(Sheet::data_from_json(&json!([])), Err(SheetError::NotAnObject)));
    }

    #[test]
    fn test_json_load_rederives_formula_from_value() {
        let data = Sheet::data_from_json(&json!({
            "A1": { "value": "=B1+1", "formula": "=B1+2", "computed": "3" },
            "A2": { "value": "7", "formula": "=A1", "computed": "7" },
            "A3": { "value": "=1+1", "computed": "2" },
        }))
        .unwrap();
        assert_eq!(data[&a1("A1")].formula, "=B1+1");
        assert_eq!(data[&a1("A1")].edit_text(), "=B1+1");
        assert_eq!(data[&a1("A2")].formula, "");
        assert_eq!(data[&a1("A2")].edit_text(), "7");
        assert_eq!(data[&a1("A3")].formula, "=1+1");
        assert_eq!(data[&a1("A3")].computed, "2");
    }

    #[test]
    fn test_sheet_serde_uses_cell_ids() {
        let mut sheet = Sheet::new(2);
        sheet.set(a1("C4"), CellUpdate::literal("7"));
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json["data"]["C4"]["value"], "7");

        let back: Sheet = serde_json::from_value(json).unwrap();
        assert_eq!(back, sheet);
    }
}
