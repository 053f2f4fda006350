// Spreadsheet import
pub mod ingestion;
pub mod spreadsheet;

// Read-side queries
pub mod products;
