//! Feeding a reader in small chunks while oversized values are skipped unbuffered.
//!
//! Run with: cargo run --example streaming

use ion_binary::{
    BinaryReader, BinaryWriter, BufferConfiguration, Event, IonType, ReaderOptions,
    SkipOversized,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_string("header")?;
    writer.write_blob(&vec![0xAB; 4096])?;
    writer.set_annotations(["reading"])?;
    writer.write_f64(21.5)?;
    writer.write_symbol("done")?;
    let bytes = writer.into_inner()?;

    let buffer = BufferConfiguration::new()
        .with_max_value_size(256)
        .with_oversized_handler(SkipOversized);
    let mut reader = BinaryReader::streaming_with_options(
        ReaderOptions::new().with_buffer_configuration(buffer),
    );

    let mut chunks = bytes.chunks(16);
    loop {
        match reader.next_value()? {
            Event::NeedsData => match chunks.next() {
                Some(chunk) => reader.append(chunk)?,
                None => break,
            },
            Event::StartScalar => {
                while reader.fill_value()? == Event::NeedsData {
                    match chunks.next() {
                        Some(chunk) => reader.append(chunk)?,
                        None => reader.end_of_stream(),
                    }
                }
                let annotations: Vec<String> = reader
                    .annotations()?
                    .iter()
                    .filter_map(|a| a.text().map(str::to_string))
                    .collect();
                match reader.ion_type() {
                    Some(IonType::String) => println!("string {:?}", reader.string_value()?),
                    Some(IonType::Float) => {
                        println!("float {} {:?}", reader.f64_value()?, annotations)
                    }
                    Some(IonType::Symbol) => println!("symbol {:?}", reader.symbol_value()?.text()),
                    other => println!("other {:?}", other),
                }
            }
            other => println!("event {:?}", other),
        }
    }
    reader.end_of_stream();

    let stats = reader.stats();
    println!(
        "consumed {} bytes, skipped {} oversized value(s), discarded {} bytes",
        stats.bytes_consumed, stats.oversized_skipped, stats.bytes_discarded
    );
    Ok(())
}
