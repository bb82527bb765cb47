use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::editing::ids::{IdSource, fresh_id};

/// Requested grid dimensions. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSize {
    pub rows: usize,
    pub columns: usize,
}

impl TableSize {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows: rows.max(1),
            columns: columns.max(1),
        }
    }

    /// Cap both dimensions at `max` (itself at least 1).
    pub fn capped(self, max: usize) -> Self {
        let max = max.max(1);
        Self {
            rows: self.rows.min(max),
            columns: self.columns.min(max),
        }
    }
}

impl Default for TableSize {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

/// Rectangular grid of plain-text cells.
///
/// Every mutation keeps all rows at the same cell count and keeps row and cell
/// ids unique within the table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

impl TableData {
    /// Fresh grid of empty cells.
    pub fn new(size: TableSize, ids: &mut dyn IdSource) -> Self {
        let size = TableSize::new(size.rows, size.columns);
        let mut taken = HashSet::new();
        let rows = (0..size.rows)
            .map(|_| new_row(size.columns, ids, &mut taken))
            .collect();
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, |row| row.cells.len())
    }

    pub fn is_rectangular(&self) -> bool {
        let columns = self.column_count();
        self.rows.iter().all(|row| row.cells.len() == columns)
    }

    pub fn first_cell_content(&self) -> Option<&str> {
        self.rows
            .first()
            .and_then(|row| row.cells.first())
            .map(|cell| cell.content.as_str())
    }

    pub fn cell(&self, cell_id: &str) -> Option<&TableCell> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find(|cell| cell.id == cell_id)
    }

    /// Repair a grid read from storage.
    ///
    /// Empty grids, or grids containing an empty row, are replaced by a fresh
    /// `fallback` grid. Ragged rows are padded to the widest row and missing or
    /// duplicated ids are regenerated.
    pub fn normalized(mut self, fallback: TableSize, ids: &mut dyn IdSource) -> Self {
        if self.rows.is_empty() || self.rows.iter().any(|row| row.cells.is_empty()) {
            return Self::new(fallback, ids);
        }

        let mut taken = HashSet::new();
        let width = self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(1);
        for row in &mut self.rows {
            if row.id.is_empty() || !taken.insert(row.id.clone()) {
                row.id = claim(ids, &mut taken);
            }
            for cell in &mut row.cells {
                if cell.id.is_empty() || !taken.insert(cell.id.clone()) {
                    cell.id = claim(ids, &mut taken);
                }
            }
            while row.cells.len() < width {
                let id = claim(ids, &mut taken);
                row.cells.push(TableCell {
                    id,
                    content: String::new(),
                });
            }
        }
        self
    }

    pub fn add_row(&mut self, ids: &mut dyn IdSource) {
        let columns = self.column_count().max(1);
        let mut taken = self.ids();
        let row = new_row(columns, ids, &mut taken);
        self.rows.push(row);
    }

    pub fn add_column(&mut self, ids: &mut dyn IdSource) {
        let mut taken = self.ids();
        for row in &mut self.rows {
            let id = claim(ids, &mut taken);
            row.cells.push(TableCell {
                id,
                content: String::new(),
            });
        }
    }

    /// Drop the last row. Refused when only one row is left.
    pub fn remove_row(&mut self) -> bool {
        if self.rows.len() <= 1 {
            return false;
        }
        self.rows.pop();
        true
    }

    /// Drop the last column. Refused when only one column is left.
    pub fn remove_column(&mut self) -> bool {
        if self.column_count() <= 1 {
            return false;
        }
        for row in &mut self.rows {
            row.cells.pop();
        }
        true
    }

    /// Returns whether a cell with `cell_id` exists and its content changed.
    pub fn update_cell(&mut self, cell_id: &str, content: &str) -> bool {
        let Some(cell) = self
            .rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .find(|cell| cell.id == cell_id)
        else {
            return false;
        };
        if cell.content == content {
            return false;
        }
        cell.content = content.to_string();
        true
    }

    fn ids(&self) -> HashSet<String> {
        self.rows
            .iter()
            .flat_map(|row| std::iter::once(row.id.clone()).chain(row.cells.iter().map(|c| c.id.clone())))
            .collect()
    }
}

fn claim(ids: &mut dyn IdSource, taken: &mut HashSet<String>) -> String {
    let id = fresh_id(ids, |candidate| taken.contains(candidate));
    taken.insert(id.clone());
    id
}

fn new_row(columns: usize, ids: &mut dyn IdSource, taken: &mut HashSet<String>) -> TableRow {
    let id = claim(ids, taken);
    let cells = (0..columns)
        .map(|_| TableCell {
            id: claim(ids, taken),
            content: String::new(),
        })
        .collect();
    TableRow { id, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::ids::SequentialIds;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn grid(rows: usize, columns: usize) -> TableData {
        TableData::new(TableSize::new(rows, columns), &mut SequentialIds::new("t"))
    }

    #[rstest]
    #[case(3, 3, 3, 3)]
    #[case(0, 0, 1, 1)]
    #[case(4, 2, 4, 2)]
    fn test_new_grid_dimensions(
        #[case] rows: usize,
        #[case] columns: usize,
        #[case] expected_rows: usize,
        #[case] expected_columns: usize,
    ) {
        let table = grid(rows, columns);
        assert_eq!(table.row_count(), expected_rows);
        assert_eq!(table.column_count(), expected_columns);
        assert!(table.is_rectangular());
        assert!(table.rows.iter().flat_map(|r| &r.cells).all(|c| c.content.is_empty()));
    }

    #[test]
    fn test_size_capped() {
        assert_eq!(TableSize::new(500, 2).capped(100), TableSize::new(100, 2));
    }

    #[test]
    fn test_add_row_and_column_keep_grid_rectangular() {
        let mut ids = SequentialIds::new("t");
        let mut table = TableData::new(TableSize::new(2, 2), &mut ids);
        table.add_row(&mut ids);
        table.add_column(&mut ids);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 3);
        assert!(table.is_rectangular());

        let ids = table.ids();
        assert_eq!(ids.len(), 3 + 9);
    }

    #[test]
    fn test_remove_refused_at_one() {
        let mut table = grid(1, 1);
        assert!(!table.remove_row());
        assert!(!table.remove_column());
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_remove_drops_last() {
        let mut table = grid(2, 3);
        let first_row = table.rows[0].id.clone();
        assert!(table.remove_row());
        assert!(table.remove_column());
        assert_eq!(table.rows[0].id, first_row);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_update_cell() {
        let mut table = grid(2, 2);
        let cell_id = table.rows[1].cells[0].id.clone();
        assert!(table.update_cell(&cell_id, "x"));
        assert!(!table.update_cell(&cell_id, "x"));
        assert!(!table.update_cell("missing", "y"));
        assert_eq!(table.cell(&cell_id).map(|c| c.content.as_str()), Some("x"));
    }

    #[test]
    fn test_normalized_pads_ragged_rows_and_fixes_ids() {
        let table = TableData {
            rows: vec![
                TableRow {
                    id: "r".into(),
                    cells: vec![
                        TableCell { id: "c".into(), content: "a".into() },
                        TableCell { id: "c".into(), content: "b".into() },
                    ],
                },
                TableRow {
                    id: String::new(),
                    cells: vec![TableCell { id: "d".into(), content: "c".into() }],
                },
            ],
        };
        let fixed = table.normalized(TableSize::default(), &mut SequentialIds::new("n"));
        assert!(fixed.is_rectangular());
        assert_eq!(fixed.column_count(), 2);
        assert_eq!(fixed.rows[0].cells[1].content, "b");
        assert_ne!(fixed.rows[0].cells[0].id, fixed.rows[0].cells[1].id);
        assert!(!fixed.rows[1].id.is_empty());
    }

    #[test]
    fn test_normalized_replaces_empty_grid() {
        let fixed = TableData::default().normalized(TableSize::default(), &mut SequentialIds::new("n"));
        assert_eq!((fixed.row_count(), fixed.column_count()), (3, 3));
    }
}
