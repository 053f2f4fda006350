//! Spreadsheet parsing for inventory uploads.
//!
//! The input is one header row followed by one row per product. `ID`,
//! `Product Name` and `Opening Inventory` are required; day groups
//! (`Procurement Qty (Day N)`, `Procurement Price (Day N)`, `Sales Qty (Day N)`,
//! `Sales Price (Day N)`) are discovered from N = 1 upward and stop at the first
//! group with a missing column. Closing inventory is a running total that is
//! never clamped, so negative values reach storage unchanged.

use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const ID_COLUMN: &str = "ID";
pub const NAME_COLUMN: &str = "Product Name";
pub const OPENING_INVENTORY_COLUMN: &str = "Opening Inventory";
/// Longest product ID the products table accepts
pub const MAX_PRODUCT_ID_CHARS: usize = 255;

/// Failure while turning an upload into products.
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row}, column '{column}': {reason}")]
    InvalidCell {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Unable to read spreadsheet: {0}")]
    Unreadable(String),
}

impl From<ImportError> for crate::errors::ServiceError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingColumn(_) => Self::SchemaError(err.to_string()),
            _ => Self::ParseError(format!("Error parsing spreadsheet: {}", err)),
        }
    }
}

/// File formats accepted for upload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SpreadsheetFormat {
    pub const ACCEPTED: &'static str = ".xlsx, .xls, .csv";

    /// Detects the format from a file name's extension, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
        }
    }
}

/// A single cell value, independent of the source format
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
}

impl Cell {
    /// Builds a cell from raw text; whitespace-only text is blank.
    pub fn text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Renders the cell as a trimmed string. Whole numbers lose the ".0".
    fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Number(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            Cell::Number(f) => Some(f.to_string()),
        }
    }

    /// Reads a whole quantity. Fractional numbers truncate toward zero.
    fn as_quantity(&self) -> Result<Option<i64>, String> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Int(i) => Ok(Some(*i)),
            Cell::Number(f) => float_to_quantity(*f).map(Some),
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return Ok(None);
                }
                if let Ok(value) = cleaned.parse::<i64>() {
                    return Ok(Some(value));
                }
                match cleaned.parse::<f64>() {
                    Ok(value) => float_to_quantity(value).map(Some),
                    Err(_) => Err(format!("'{}' is not a whole number", s.trim())),
                }
            }
        }
    }

    /// Reads a unit price; blank cells are 0.0.
    fn as_price(&self) -> Result<f64, String> {
        match self {
            Cell::Empty => Ok(0.0),
            Cell::Int(i) => Ok(*i as f64),
            Cell::Number(f) if f.is_finite() => Ok(*f),
            Cell::Number(f) => Err(format!("'{}' is not a valid price", f)),
            Cell::Text(s) => parse_price(s),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::text(s),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
            Data::Error(e) => Cell::Text(format!("{:?}", e)),
        }
    }
}

fn float_to_quantity(value: f64) -> Result<i64, String> {
    if value.is_finite() && value.abs() < 9.0e15 {
        Ok(value.trunc() as i64)
    } else {
        Err(format!("'{}' is not a whole number", value))
    }
}

/// Parses a money string such as "$1,234.56".
///
/// Only digits, '.' and '-' are kept; an empty remainder is 0.0.
/// Accounting negatives like "(1.00)" are read as -1.00.
pub fn parse_price(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        if inner.contains(&['(', ')', '-'][..]) {
            return Err(format!("'{}' is not a valid price", trimmed));
        }
        return parse_price(inner).map(|value| -value);
    }
    if trimmed.contains(&['(', ')'][..]) {
        return Err(format!("'{}' is not a valid price", trimmed));
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return Ok(0.0);
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("'{}' is not a valid price", raw.trim()))
}

/// Header names plus data rows of the first sheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Maps trimmed header names to column positions; the first duplicate wins.
    fn column_index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.headers.len());
        for (position, name) in self.headers.iter().enumerate() {
            index.entry(name.trim()).or_insert(position);
        }
        index
    }
}

/// One day of parsed activity
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedDay {
    pub day: i32,
    pub inventory: i64,
    pub procurement_qty: i64,
    pub procurement_price: f64,
    pub sales_qty: i64,
    pub sales_price: f64,
}

/// One product row with its computed day sequence
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedProduct {
    pub id: String,
    pub name: String,
    pub opening_inventory: i64,
    pub days: Vec<ParsedDay>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParsedWorkbook {
    pub products: Vec<ParsedProduct>,
    /// Longest day sequence of any product, 0 when there are no products
    pub max_days: usize,
}

/// Column names of one day group
pub fn day_column_names(day: usize) -> [String; 4] {
    [
        format!("Procurement Qty (Day {})", day),
        format!("Procurement Price (Day {})", day),
        format!("Sales Qty (Day {})", day),
        format!("Sales Price (Day {})", day),
    ]
}

struct DayColumns {
    day: usize,
    names: [String; 4],
    positions: [usize; 4],
}

fn discover_day_columns(index: &HashMap<&str, usize>) -> Vec<DayColumns> {
    let mut groups = Vec::new();
    for day in 1.. {
        let names = day_column_names(day);
        let positions = match (
            index.get(names[0].as_str()),
            index.get(names[1].as_str()),
            index.get(names[2].as_str()),
            index.get(names[3].as_str()),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => [*a, *b, *c, *d],
            _ => break,
        };
        groups.push(DayColumns {
            day,
            names,
            positions,
        });
    }
    groups
}

fn required_column(index: &HashMap<&str, usize>, name: &str) -> Result<usize, ImportError> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
}

fn cell_at(row: &[Cell], position: usize) -> &Cell {
    row.get(position).unwrap_or(&Cell::Empty)
}

fn invalid(row: usize, column: &str, reason: impl Into<String>) -> ImportError {
    ImportError::InvalidCell {
        row,
        column: column.to_string(),
        reason: reason.into(),
    }
}

/// Converts a table into products with running inventory.
pub fn parse_table(table: &SheetTable) -> Result<ParsedWorkbook, ImportError> {
    let index = table.column_index();
    let id_col = required_column(&index, ID_COLUMN)?;
    let name_col = required_column(&index, NAME_COLUMN)?;
    let opening_col = required_column(&index, OPENING_INVENTORY_COLUMN)?;
    let day_groups = discover_day_columns(&index);

    let mut products = Vec::with_capacity(table.rows.len());
    for (offset, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        // Header is row 1
        let row_number = offset + 2;

        let id = cell_at(row, id_col)
            .as_label()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid(row_number, ID_COLUMN, "product ID is blank"))?;
        if id.chars().count() > MAX_PRODUCT_ID_CHARS {
            return Err(invalid(
                row_number,
                ID_COLUMN,
                format!("product ID is longer than {} characters", MAX_PRODUCT_ID_CHARS),
            ));
        }
        let name = cell_at(row, name_col).as_label().unwrap_or_default();
        let opening_inventory = cell_at(row, opening_col)
            .as_quantity()
            .map_err(|reason| invalid(row_number, OPENING_INVENTORY_COLUMN, reason))?
            .ok_or_else(|| {
                invalid(row_number, OPENING_INVENTORY_COLUMN, "opening inventory is blank")
            })?;

        let mut days = Vec::with_capacity(day_groups.len());
        let mut inventory = opening_inventory;
        for group in &day_groups {
            let [proc_qty_col, proc_price_col, sales_qty_col, sales_price_col] = group.positions;

            let procurement_qty = cell_at(row, proc_qty_col)
                .as_quantity()
                .map_err(|reason| invalid(row_number, &group.names[0], reason))?
                .unwrap_or(0);
            let procurement_price = cell_at(row, proc_price_col)
                .as_price()
                .map_err(|reason| invalid(row_number, &group.names[1], reason))?;
            let sales_qty = cell_at(row, sales_qty_col)
                .as_quantity()
                .map_err(|reason| invalid(row_number, &group.names[2], reason))?
                .unwrap_or(0);
            let sales_price = cell_at(row, sales_price_col)
                .as_price()
                .map_err(|reason| invalid(row_number, &group.names[3], reason))?;

            inventory = inventory
                .checked_add(procurement_qty)
                .and_then(|value| value.checked_sub(sales_qty))
                .ok_or_else(|| {
                    invalid(row_number, &group.names[0], "inventory total overflows")
                })?;

            days.push(ParsedDay {
                day: group.day as i32,
                inventory,
                procurement_qty,
                procurement_price,
                sales_qty,
                sales_price,
            });
        }

        products.push(ParsedProduct {
            id,
            name,
            opening_inventory,
            days,
        });
    }

    let max_days = products.iter().map(|p| p.days.len()).max().unwrap_or(0);
    Ok(ParsedWorkbook { products, max_days })
}

/// Reads the first sheet of a workbook, or a CSV file.
pub fn read_table(path: &Path, format: SpreadsheetFormat) -> Result<SheetTable, ImportError> {
    match format {
        SpreadsheetFormat::Csv => read_csv_table(path),
        SpreadsheetFormat::Xlsx | SpreadsheetFormat::Xls => read_workbook_table(path),
    }
}

fn read_workbook_table(path: &Path) -> Result<SheetTable, ImportError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ImportError::Unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Unreadable("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| Cell::from(cell).as_label().unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    Ok(SheetTable::new(headers, rows))
}

fn read_csv_table(path: &Path) -> Result<SheetTable, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Unreadable(e.to_string()))?
        .iter()
        // Excel CSV exports start with a byte order mark
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Unreadable(e.to_string()))?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(SheetTable::new(headers, rows))
}

/// Reads and parses an uploaded file in one step.
pub fn parse_file(path: &Path, format: SpreadsheetFormat) -> Result<ParsedWorkbook, ImportError> {
    let table = read_table(path, format)?;
    parse_table(&table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::io::Write;

    fn headers(days: usize) -> Vec<String> {
        let mut headers = vec![
            ID_COLUMN.to_string(),
            NAME_COLUMN.to_string(),
            OPENING_INVENTORY_COLUMN.to_string(),
        ];
        for day in 1..=days {
            headers.extend(day_column_names(day));
        }
        headers
    }

    fn product_row(id: &str, opening: i64, days: &[(i64, &str, i64, &str)]) -> Vec<Cell> {
        let mut row = vec![
            Cell::text(id),
            Cell::text(&format!("Product {}", id)),
            Cell::Int(opening),
        ];
        for (proc_qty, proc_price, sales_qty, sales_price) in days {
            row.push(Cell::Int(*proc_qty));
            row.push(Cell::text(proc_price));
            row.push(Cell::Int(*sales_qty));
            row.push(Cell::text(sales_price));
        }
        row
    }

    #[test]
    fn computes_running_inventory_for_each_product() {
        let table = SheetTable::new(
            headers(1),
            vec![
                product_row("P1", 100, &[(10, "$2.00", 5, "$3.00")]),
                product_row("P2", 50, &[(10, "$2.00", 5, "$3.00")]),
            ],
        );

        let parsed = parse_table(&table).unwrap();
        assert_eq!(parsed.products.len(), 2);
        assert_eq!(parsed.max_days, 1);

        let p1 = &parsed.products[0];
        assert_eq!(p1.id, "P1");
        assert_eq!(p1.opening_inventory, 100);
        assert_eq!(
            p1.days,
            vec![ParsedDay {
                day: 1,
                inventory: 105,
                procurement_qty: 10,
                procurement_price: 2.0,
                sales_qty: 5,
                sales_price: 3.0,
            }]
        );
        assert_eq!(parsed.products[1].days[0].inventory, 55);
    }

    #[test]
    fn inventory_may_go_negative() {
        let table = SheetTable::new(
            headers(2),
            vec![product_row(
                "P1",
                3,
                &[(0, "", 5, "$1.00"), (1, "", 4, "$1.00")],
            )],
        );

        let parsed = parse_table(&table).unwrap();
        let inventories: Vec<i64> = parsed.products[0].days.iter().map(|d| d.inventory).collect();
        assert_eq!(inventories, vec![-2, -5]);
    }

    #[rstest]
    #[case(ID_COLUMN)]
    #[case(NAME_COLUMN)]
    #[case(OPENING_INVENTORY_COLUMN)]
    fn missing_required_column_is_a_schema_error(#[case] missing: &str) {
        let headers: Vec<String> = headers(1).into_iter().filter(|h| h != missing).collect();
        let table = SheetTable::new(headers, vec![]);

        assert_eq!(
            parse_table(&table),
            Err(ImportError::MissingColumn(missing.to_string()))
        );
    }

    #[test]
    fn day_discovery_stops_at_first_incomplete_group() {
        let mut headers = headers(2);
        // Day 3 lacks its sales price, day 4 is complete but unreachable
        headers.extend(day_column_names(3).into_iter().take(3));
        headers.extend(day_column_names(4));
        let table = SheetTable::new(headers, vec![product_row("P1", 10, &[])]);

        let parsed = parse_table(&table).unwrap();
        assert_eq!(parsed.max_days, 2);
        let days: Vec<i32> = parsed.products[0].days.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![1, 2]);
        // Blank cells default to zero activity
        assert!(parsed.products[0].days.iter().all(|d| d.inventory == 10));
    }

    #[test]
    fn no_day_columns_yields_no_records() {
        let table = SheetTable::new(headers(0), vec![product_row("P1", 10, &[])]);
        let parsed = parse_table(&table).unwrap();
        assert_eq!(parsed.max_days, 0);
        assert!(parsed.products[0].days.is_empty());
    }

    #[test]
    fn empty_table_has_no_products() {
        let parsed = parse_table(&SheetTable::new(headers(3), vec![])).unwrap();
        assert!(parsed.products.is_empty());
        assert_eq!(parsed.max_days, 0);
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = SheetTable::new(
            headers(1),
            vec![
                product_row("P1", 1, &[(0, "", 0, "")]),
                vec![Cell::Empty; 7],
                vec![],
            ],
        );
        assert_eq!(parse_table(&table).unwrap().products.len(), 1);
    }

    #[test]
    fn non_numeric_opening_inventory_cites_row_and_column() {
        let mut row = product_row("P1", 0, &[]);
        row[2] = Cell::text("lots");
        let table = SheetTable::new(headers(0), vec![product_row("P0", 1, &[]), row]);

        assert_matches!(
            parse_table(&table),
            Err(ImportError::InvalidCell { row: 3, ref column, .. }) if column == OPENING_INVENTORY_COLUMN
        );
    }

    #[test]
    fn overlong_id_cites_row_and_column() {
        let table = SheetTable::new(
            headers(0),
            vec![
                product_row(&"A".repeat(MAX_PRODUCT_ID_CHARS), 1, &[]),
                product_row(&"B".repeat(MAX_PRODUCT_ID_CHARS + 1), 1, &[]),
            ],
        );

        assert_matches!(
            parse_table(&table),
            Err(ImportError::InvalidCell { row: 3, ref column, .. }) if column == ID_COLUMN
        );
    }

    #[test]
    fn blank_opening_inventory_is_rejected() {
        let mut row = product_row("P1", 0, &[]);
        row[2] = Cell::Empty;
        let table = SheetTable::new(headers(0), vec![row]);
        assert_matches!(parse_table(&table), Err(ImportError::InvalidCell { row: 2, .. }));
    }

    #[test]
    fn bad_price_aborts_whole_file() {
        let table = SheetTable::new(
            headers(1),
            vec![
                product_row("P1", 1, &[(1, "$1.00", 0, "$1.00")]),
                product_row("P2", 1, &[(1, "1.2.3", 0, "$1.00")]),
            ],
        );
        assert_matches!(
            parse_table(&table),
            Err(ImportError::InvalidCell { ref column, .. }) if column == "Procurement Price (Day 1)"
        );
    }

    #[test]
    fn numeric_ids_render_without_fraction() {
        let mut row = product_row("x", 5, &[]);
        row[0] = Cell::Number(1.0);
        let table = SheetTable::new(headers(0), vec![row]);
        assert_eq!(parse_table(&table).unwrap().products[0].id, "1");
    }

    #[test]
    fn headers_are_trimmed() {
        let headers: Vec<String> = headers(1).into_iter().map(|h| format!(" {} ", h)).collect();
        let table = SheetTable::new(headers, vec![product_row("P1", 1, &[(2, "", 1, "")])]);
        assert_eq!(parse_table(&table).unwrap().products[0].days[0].inventory, 2);
    }

    #[rstest]
    #[case("$1,234.56", 1234.56)]
    #[case("1234.56", 1234.56)]
    #[case("$0.53", 0.53)]
    #[case("", 0.0)]
    #[case("   ", 0.0)]
    #[case("$", 0.0)]
    #[case("-$4.50", -4.5)]
    #[case("(1.00)", -1.0)]
    #[case(" ($1,234.56) ", -1234.56)]
    fn price_strings(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(parse_price(raw).unwrap(), expected);
    }

    #[test]
    fn malformed_price_is_an_error() {
        assert!(parse_price("1.2.3").is_err());
        assert!(parse_price("(1.00").is_err());
        assert!(parse_price("1.00)").is_err());
        assert!(parse_price("(-1.00)").is_err());
    }

    #[rstest]
    #[case(Cell::Empty, None)]
    #[case(Cell::Int(7), Some(7))]
    #[case(Cell::Number(7.9), Some(7))]
    #[case(Cell::text("1,200"), Some(1200))]
    #[case(Cell::text(" 12 "), Some(12))]
    fn quantities(#[case] cell: Cell, #[case] expected: Option<i64>) {
        assert_eq!(cell.as_quantity().unwrap(), expected);
    }

    #[rstest]
    #[case("report.xlsx", Some(SpreadsheetFormat::Xlsx))]
    #[case("REPORT.XLS", Some(SpreadsheetFormat::Xls))]
    #[case("data.csv", Some(SpreadsheetFormat::Csv))]
    #[case("notes.txt", None)]
    #[case("xlsx", None)]
    fn formats_from_filename(#[case] name: &str, #[case] expected: Option<SpreadsheetFormat>) {
        assert_eq!(SpreadsheetFormat::from_filename(name), expected);
    }

    #[test]
    fn import_errors_map_to_taxonomy() {
        use crate::errors::ServiceError;

        let schema: ServiceError = ImportError::MissingColumn("ID".into()).into();
        assert_matches!(schema, ServiceError::SchemaError(ref m) if m == "Missing required column: ID");

        let parse: ServiceError = ImportError::Unreadable("zip".into()).into();
        assert_matches!(parse, ServiceError::ParseError(_));
    }

    #[test]
    fn reads_csv_files() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            file,
            "\u{feff}ID,Product Name,Opening Inventory,Procurement Qty (Day 1),Procurement Price (Day 1),Sales Qty (Day 1),Sales Price (Day 1)\n\
             0000001,CHERRY 1PACK,117,0,$0.00,22,\"$1,001.99\"\n"
        )
        .unwrap();

        let parsed = parse_file(file.path(), SpreadsheetFormat::Csv).unwrap();
        let product = &parsed.products[0];
        assert_eq!(product.id, "0000001");
        assert_eq!(product.name, "CHERRY 1PACK");
        assert_eq!(product.days[0].inventory, 95);
        assert_eq!(product.days[0].sales_price, 1001.99);
    }

    #[test]
    fn reads_first_sheet_of_xlsx_workbooks() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in headers(2).iter().enumerate() {
            sheet.write_string(0, col as u16, name.as_str()).unwrap();
        }
        // Text ID with leading zeros, numeric prices, a "$" text price
        sheet.write_string(1, 0, "0000001").unwrap();
        sheet.write_string(1, 1, "CHERRY 1PACK").unwrap();
        sheet.write_number(1, 2, 100.0).unwrap();
        sheet.write_number(1, 3, 20.0).unwrap();
        sheet.write_string(1, 4, "$1,234.56").unwrap();
        sheet.write_number(1, 5, 10.0).unwrap();
        sheet.write_number(1, 6, 2.5).unwrap();
        sheet.write_number(1, 7, 3.0).unwrap();
        sheet.write_number(1, 8, 0.75).unwrap();
        sheet.write_number(1, 9, 8.0).unwrap();
        sheet.write_string(1, 10, "$0.99").unwrap();
        // Numeric ID, blank name and blank day cells
        sheet.write_number(2, 0, 42.0).unwrap();
        sheet.write_number(2, 2, 7.0).unwrap();
        sheet.write_number(2, 7, 1.0).unwrap();
        workbook.add_worksheet().write_string(0, 0, "ignored").unwrap();

        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        workbook.save(file.path()).unwrap();

        let parsed = parse_file(file.path(), SpreadsheetFormat::Xlsx).unwrap();
        assert_eq!(parsed.max_days, 2);
        assert_eq!(parsed.products.len(), 2);

        let cherry = &parsed.products[0];
        assert_eq!(cherry.id, "0000001");
        assert_eq!(cherry.name, "CHERRY 1PACK");
        assert_eq!(cherry.opening_inventory, 100);
        assert_eq!(cherry.days[0].inventory, 110);
        assert_eq!(cherry.days[0].procurement_price, 1234.56);
        assert_eq!(cherry.days[0].sales_price, 2.5);
        assert_eq!(cherry.days[1].inventory, 105);
        assert_eq!(cherry.days[1].procurement_price, 0.75);
        assert_eq!(cherry.days[1].sales_price, 0.99);

        let numeric = &parsed.products[1];
        assert_eq!(numeric.id, "42");
        assert_eq!(numeric.name, "");
        assert_eq!(numeric.days[0].inventory, 7);
        assert_eq!(numeric.days[0].procurement_price, 0.0);
        assert_eq!(numeric.days[1].inventory, 8);
    }

    #[test]
    fn garbage_workbook_is_unreadable() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"definitely not a zip archive").unwrap();

        assert_matches!(
            parse_file(file.path(), SpreadsheetFormat::Xlsx),
            Err(ImportError::Unreadable(_))
        );
    }

    proptest! {
        #[test]
        fn inventory_recurrence_holds(
            opening in -10_000i64..10_000,
            moves in proptest::collection::vec((0i64..1_000, 0i64..1_000), 0..8),
        ) {
            let days: Vec<(i64, &str, i64, &str)> =
                moves.iter().map(|(p, s)| (*p, "$1.00", *s, "$2.00")).collect();
            let table = SheetTable::new(headers(moves.len()), vec![product_row("P", opening, &days)]);
            let parsed = parse_table(&table).unwrap();
            let product = &parsed.products[0];

            prop_assert_eq!(product.days.len(), moves.len());
            let mut previous = opening;
            for (index, day) in product.days.iter().enumerate() {
                prop_assert_eq!(day.day as usize, index + 1);
                prop_assert_eq!(day.inventory, previous + day.procurement_qty - day.sales_qty);
                previous = day.inventory;
            }
        }

        #[test]
        fn formatted_prices_round_trip(cents in 0u64..100_000_000) {
            let whole = cents / 100;
            let mut grouped = String::new();
            for (i, ch) in whole.to_string().chars().rev().enumerate() {
                if i > 0 && i % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(ch);
            }
            let grouped: String = grouped.chars().rev().collect();
            let raw = format!("${}.{:02}", grouped, cents % 100);

            let parsed = parse_price(&raw).unwrap();
            prop_assert!((parsed - cents as f64 / 100.0).abs() < 1e-6);
        }
    }
}
