//! Serde round trip through the Ion binary format, with and without a shared symbol table.
//!
//! Run with: cargo run --example simple

use ion_binary::{
    from_slice, from_slice_with_options, to_vec, to_vec_with_options, Catalog, Import,
    ReaderOptions, SharedSymbolTable, WriterOptions,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sensor {
    id: u32,
    name: String,
    readings: Vec<f64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let sensors = vec![
        Sensor {
            id: 1,
            name: "north".to_string(),
            readings: vec![20.5, 21.0],
        },
        Sensor {
            id: 2,
            name: "south".to_string(),
            readings: vec![18.25],
        },
    ];

    // Field names travel in a local symbol table
    let bytes = to_vec(&sensors)?;
    println!("Local symbols: {} bytes\n{:02X?}\n", bytes.len(), bytes);
    let back: Vec<Sensor> = from_slice(&bytes)?;
    assert_eq!(sensors, back);

    // Field names come from a shared table both sides know
    let shared = Arc::new(SharedSymbolTable::new(
        "sensors",
        1,
        ["id", "name", "readings"],
    ));
    let options = WriterOptions::new().with_imports(vec![Import::new(Arc::clone(&shared))]);
    let compact = to_vec_with_options(&sensors, options)?;
    println!("Shared symbols: {} bytes", compact.len());

    let mut catalog = Catalog::new();
    catalog.register(shared);
    let back: Vec<Sensor> =
        from_slice_with_options(&compact, ReaderOptions::new().with_catalog(catalog))?;
    assert_eq!(sensors, back);
    println!("✓ Round-trip successful");

    Ok(())
}
