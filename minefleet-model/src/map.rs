//! Mine map grid as published on the `map-data` topic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapCell {
    Wall,
    Open,
    Start,
    Goal,
    Other(char),
}

impl MapCell {
    pub fn from_char(code: char) -> Self {
        match code {
            '1' => MapCell::Wall,
            '0' => MapCell::Open,
            'A' => MapCell::Start,
            'B' => MapCell::Goal,
            other => MapCell::Other(other),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            MapCell::Wall => '1',
            MapCell::Open => '0',
            MapCell::Start => 'A',
            MapCell::Goal => 'B',
            MapCell::Other(other) => other,
        }
    }

    pub fn is_passable(self) -> bool {
        !matches!(self, MapCell::Wall)
    }
}

/// Row-major grid of cells; `rows[y][x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGrid {
    rows: Vec<Vec<MapCell>>,
}

impl MapGrid {
    pub fn new(rows: Vec<Vec<MapCell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from the JSON rows of a map payload.
    ///
    /// A row is either a string (`"0011A"`) or an array whose items are
    /// one-character strings or integer character codes (`[49, 48]`).
    pub fn from_json_rows(value: &Value) -> Result<Self> {
        let rows = value.as_array().ok_or(ModelError::MapNotArray)?;
        let rows = rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| parse_row(row_idx, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<MapCell>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row. Rows may be ragged.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<MapCell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    pub fn find(&self, wanted: MapCell) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(y, row)| {
            row.iter().position(|cell| *cell == wanted).map(|x| (x, y))
        })
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_char()).collect())
            .collect()
    }
}

fn parse_row(row_idx: usize, row: &Value) -> Result<Vec<MapCell>> {
    match row {
        Value::String(line) => Ok(line.chars().map(MapCell::from_char).collect()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(column, item)| {
                parse_cell(item).ok_or(ModelError::InvalidMapCell {
                    row: row_idx,
                    column,
                })
            })
            .collect(),
        _ => Err(ModelError::InvalidMapRow { row: row_idx }),
    }
}

fn parse_cell(item: &Value) -> Option<MapCell> {
    match item {
        Value::String(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(code), None) => Some(MapCell::from_char(code)),
                _ => None,
            }
        }
        Value::Number(number) => number
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .and_then(char::from_u32)
            .map(MapCell::from_char),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_rows_and_char_codes_agree() {
        let from_strings =
            MapGrid::from_json_rows(&json!(["10A", "0B1"])).unwrap();
        let from_codes =
            MapGrid::from_json_rows(&json!([[49, 48, 65], [48, 66, 49]]))
                .unwrap();
        let from_chars = MapGrid::from_json_rows(&json!([
            ["1", "0", "A"],
            ["0", "B", "1"]
        ]))
        .unwrap();

        assert_eq!(from_strings, from_codes);
        assert_eq!(from_strings, from_chars);
        assert_eq!(from_strings.cell(0, 0), Some(MapCell::Wall));
        assert_eq!(from_strings.find(MapCell::Start), Some((2, 0)));
        assert_eq!(from_strings.find(MapCell::Goal), Some((1, 1)));
        assert_eq!(from_strings.to_lines(), vec!["10A", "0B1"]);
    }

    #[test]
    fn rejects_non_character_cells() {
        let err = MapGrid::from_json_rows(&json!([["10"]])).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidMapCell { row: 0, column: 0 }
        ));

        let err = MapGrid::from_json_rows(&json!([true])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidMapRow { row: 0 }));

        assert!(matches!(
            MapGrid::from_json_rows(&json!({"rows": []})),
            Err(ModelError::MapNotArray)
        ));
    }

    #[test]
    fn ragged_rows_report_widest_width() {
        let grid = MapGrid::from_json_rows(&json!(["0", "000"])).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.cell(2, 0), None);
    }
}
