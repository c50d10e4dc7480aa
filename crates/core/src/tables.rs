use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RawGrid = Vec<Vec<Option<String>>>;

/// One table row with every cell coerced to a string. Serialized as a map
/// keyed by column position (`"0"`, `"1"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (String, &str)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(column, value)| (column.to_string(), value.as_str()))
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in self.entries() {
            map.serialize_entry(&key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = TableRow;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of column index to cell text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TableRow, A::Error> {
                let mut keyed = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    let column = key.parse::<usize>().map_err(serde::de::Error::custom)?;
                    keyed.push((column, value));
                }
                keyed.sort_by_key(|(column, _)| *column);
                Ok(TableRow {
                    cells: keyed.into_iter().map(|(_, value)| value).collect(),
                })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn from_grid(grid: RawGrid) -> Self {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let rows = grid
            .into_iter()
            .map(|row| {
                let mut cells = row
                    .into_iter()
                    .map(|cell| cell.unwrap_or_default())
                    .collect::<Vec<_>>();
                cells.resize(width, String::new());
                TableRow { cells }
            })
            .collect();

        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |row| row.cells.len())
    }
}

pub fn format_table_as_text(table: &Table) -> String {
    table
        .rows
        .iter()
        .map(|row| {
            row.entries()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn group_grids<I>(rows: I) -> Vec<RawGrid>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut grids = Vec::new();
    let mut current: RawGrid = Vec::new();

    for cells in rows {
        if cells.len() >= 2 {
            current.push(cells);
            continue;
        }

        if current.len() >= 2 {
            grids.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }

    if current.len() >= 2 {
        grids.push(current);
    }

    grids
}
