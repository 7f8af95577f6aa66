//! Workbook model: a titled, ordered set of sheets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SheetError};
use crate::sheet::Sheet;

pub const DEFAULT_TITLE: &str = "Untitled spreadsheet";

/// Engine sheet index for a 1-based sheet number.
///
/// This is the only place the mapping is computed; sheet numbers below 1 are
/// rejected when sheets enter a workbook.
pub const fn engine_index(sheet_number: u32) -> usize {
    sheet_number.saturating_sub(1) as usize
}

/// Inverse of [`engine_index`].
pub const fn sheet_number_for(engine_index: usize) -> u32 {
    engine_index as u32 + 1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub user_id: Option<String>,
    sheets: Vec<Sheet>,
    #[serde(skip, default = "first_sheet")]
    active: u32,
}

fn first_sheet() -> u32 {
    1
}

impl Workbook {
    /// A new workbook holding an empty first sheet.
    pub fn new(title: impl Into<String>) -> Self {
        Workbook {
            id: Uuid::new_v4(),
            title: title.into(),
            user_id: None,
            sheets: vec![Sheet::new(1)],
            active: 1,
        }
    }

    /// Build a workbook from stored sheets, validating their numbering.
    pub fn from_sheets(id: Uuid, title: impl Into<String>, sheets: Vec<Sheet>) -> Result<Self> {
        let mut workbook = Workbook {
            id,
            title: title.into(),
            user_id: None,
            sheets: Vec::with_capacity(sheets.len()),
            active: 1,
        };
        for sheet in sheets {
            workbook.insert_sheet(sheet)?;
        }
        workbook.normalize()?;
        Ok(workbook)
    }

    /// Re-check invariants after deserializing: sheets sorted by number,
    /// numbers unique and positive, active sheet present.
    pub fn normalize(&mut self) -> Result<()> {
        self.sheets.sort_by_key(|s| s.sheet_number);
        for pair in self.sheets.windows(2) {
            if pair[0].sheet_number == pair[1].sheet_number {
                return Err(SheetError::DuplicateSheet(pair[0].sheet_number));
            }
        }
        if let Some(first) = self.sheets.first() {
            if first.sheet_number == 0 {
                return Err(SheetError::InvalidSheetNumber(0));
            }
            if self.sheet(self.active).is_none() {
                self.active = first.sheet_number;
            }
            Ok(())
        } else {
            Err(SheetError::NoSheets)
        }
    }

    /// Max existing sheet number plus one.
    pub fn next_sheet_number(&self) -> u32 {
        self.sheets.iter().map(|s| s.sheet_number).max().unwrap_or(0) + 1
    }

    /// Append a new empty sheet and return its number.
    pub fn add_sheet(&mut self, id: Uuid) -> u32 {
        let number = self.next_sheet_number();
        self.sheets.push(Sheet::with_id(id, number));
        number
    }

    /// Add an existing sheet record, keeping sheets ordered by number.
    pub fn insert_sheet(&mut self, sheet: Sheet) -> Result<u32> {
        let number = sheet.sheet_number;
        if number == 0 {
            return Err(SheetError::InvalidSheetNumber(0));
        }
        if self.sheet(number).is_some() {
            return Err(SheetError::DuplicateSheet(number));
        }
        let pos = self.sheets.partition_point(|s| s.sheet_number < number);
        self.sheets.insert(pos, sheet);
        Ok(number)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, number: u32) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.sheet_number == number)
    }

    pub fn sheet_mut(&mut self, number: u32) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.sheet_number == number)
    }

    pub fn active_number(&self) -> u32 {
        self.active
    }

    pub fn active_sheet(&self) -> Result<&Sheet> {
        self.sheet(self.active).ok_or(SheetError::UnknownSheet(self.active))
    }

    pub fn active_sheet_mut(&mut self) -> Result<&mut Sheet> {
        let active = self.active;
        self.sheet_mut(active).ok_or(SheetError::UnknownSheet(active))
    }

    pub fn switch_to(&mut self, number: u32) -> Result<()> {
        if self.sheet(number).is_none() {
            return Err(SheetError::UnknownSheet(number));
        }
        self.active = number;
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_index_mapping() {
        assert_eq!(engine_index(1), 0);
        assert_eq!(engine_index(7), 6);
        for n in 1..20 {
            assert_eq!(sheet_number_for(engine_index(n)), n);
        }
    }

    #[test]
    fn test_next_sheet_number_uses_max() {
        let mut wb = Workbook::default();
        assert_eq!(wb.title, DEFAULT_TITLE);
        assert_eq!(wb.next_sheet_number(), 2);
        wb.insert_sheet(Sheet::new(5)).unwrap();
        assert_eq!(wb.add_sheet(Uuid::new_v4()), 6);
        let numbers: Vec<u32> = wb.sheets().iter().map(|s| s.sheet_number).collect();
        assert_eq!(numbers, vec![1, 5, 6]);
    }

    #[test]
    fn test_insert_rejects_bad_numbers() {
        let mut wb = Workbook::default();
        assert!(matches!(wb.insert_sheet(Sheet::new(0)), Err(SheetError::InvalidSheetNumber(0))));
        assert!(matches!(wb.insert_sheet(Sheet::new(1)), Err(SheetError::DuplicateSheet(1))));
    }

    #[test]
    fn test_switch_to() {
        let mut wb = Workbook::default();
        let second = wb.add_sheet(Uuid::new_v4());
        wb.switch_to(second).unwrap();
        assert_eq!(wb.active_sheet().unwrap().title(), "Sheet2");
        assert!(wb.switch_to(9).is_err());
        assert_eq!(wb.active_number(), 2);
    }

    #[test]
    fn test_from_sheets_sorts_and_requires_one() {
        let wb = Workbook::from_sheets(Uuid::new_v4(), "t", vec![Sheet::new(3), Sheet::new(1)]).unwrap();
        assert_eq!(wb.sheets()[0].sheet_number, 1);
        assert_eq!(wb.active_number(), 1);
        assert!(matches!(
            Workbook::from_sheets(Uuid::new_v4(), "t", vec![]),
            Err(SheetError::NoSheets)
        ));
    }
}
