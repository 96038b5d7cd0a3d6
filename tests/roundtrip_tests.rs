use std::sync::Arc;

use ion_binary::{
    BinaryReader, BinaryWriter, Decimal, Error, Event, IonType, LocalSymbolTable,
    SymbolTableError, Timestamp, WriterOptions,
};
use num_bigint::BigInt;

fn write_with<F>(options: WriterOptions, body: F) -> Vec<u8>
where
    F: FnOnce(&mut BinaryWriter<Vec<u8>>),
{
    let mut writer = BinaryWriter::with_options(Vec::new(), options);
    body(&mut writer);
    writer.into_inner().unwrap()
}

fn write<F>(body: F) -> Vec<u8>
where
    F: FnOnce(&mut BinaryWriter<Vec<u8>>),
{
    write_with(WriterOptions::default(), body)
}

fn next_scalar(reader: &mut BinaryReader) {
    assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
}

/// Feeds `bytes` one at a time and collects every top-level symbol or string.
fn stream_texts(bytes: &[u8]) -> Vec<String> {
    let mut reader = BinaryReader::streaming();
    let mut input = bytes.iter();
    let mut texts = Vec::new();
    loop {
        match reader.next_value().unwrap() {
            Event::NeedsData => match input.next() {
                Some(byte) => reader.append(&[*byte]).unwrap(),
                None => break,
            },
            Event::StartScalar => {
                while reader.fill_value().unwrap() == Event::NeedsData {
                    let byte = input.next().expect("value body was truncated");
                    reader.append(&[*byte]).unwrap();
                }
                let text = if reader.ion_type() == Some(IonType::Symbol) {
                    reader.symbol_value().unwrap().text().unwrap().to_string()
                } else {
                    reader.string_value().unwrap().to_string()
                };
                texts.push(text);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    reader.end_of_stream();
    assert_eq!(reader.next_value().unwrap(), Event::NeedsData);
    texts
}

#[test]
fn test_scalar_roundtrip() {
    let big = BigInt::from(1u8) << 70;
    let decimals: Vec<Decimal> = ["0", "-0", "0.00", "1.50", "-12345678901234567890.123"]
        .iter()
        .map(|s| s.parse::<Decimal>().unwrap())
        .chain([Decimal::new(7, 3)])
        .collect();
    let timestamps = vec![
        Timestamp::for_year(2020).unwrap(),
        Timestamp::for_month(2020, 2).unwrap(),
        Timestamp::for_day(2020, 2, 29).unwrap(),
        Timestamp::for_minute(2000, 1, 1, 2, 30, Some(-300)).unwrap(),
        Timestamp::for_second(1999, 12, 31, 23, 59, 59, None)
            .unwrap()
            .with_fraction(Decimal::new(125, -3))
            .unwrap(),
    ];

    let bytes = write(|w| {
        w.write_null(IonType::Null).unwrap();
        w.write_null(IonType::Int).unwrap();
        w.write_bool(true).unwrap();
        w.write_bool(false).unwrap();
        for value in [0, -1, i64::MAX, i64::MIN] {
            w.write_i64(value).unwrap();
        }
        w.write_big_int(&big).unwrap();
        w.write_big_int(&-big.clone()).unwrap();
        for value in [0.0, -0.0, 1.5, f64::INFINITY, f64::NAN] {
            w.write_f64(value).unwrap();
        }
        for decimal in &decimals {
            w.write_decimal(decimal).unwrap();
        }
        for timestamp in &timestamps {
            w.write_timestamp(timestamp).unwrap();
        }
        w.write_symbol("sym").unwrap();
        w.write_symbol_id(4).unwrap();
        w.write_string("").unwrap();
        w.write_string("h\u{e9}llo").unwrap();
        w.write_blob(&[0, 1, 2, 255]).unwrap();
        w.write_clob(b"text").unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);

    next_scalar(&mut reader);
    assert_eq!(reader.ion_type(), Some(IonType::Null));
    assert!(reader.is_null());
    next_scalar(&mut reader);
    assert_eq!(reader.ion_type(), Some(IonType::Int));
    assert!(reader.is_null());
    assert!(matches!(
        reader.i64_value().unwrap_err(),
        Error::TypeMismatch { .. }
    ));

    next_scalar(&mut reader);
    assert!(reader.bool_value().unwrap());
    next_scalar(&mut reader);
    assert!(!reader.bool_value().unwrap());

    for expected in [0, -1, i64::MAX, i64::MIN] {
        next_scalar(&mut reader);
        assert_eq!(reader.i64_value().unwrap(), expected);
    }
    next_scalar(&mut reader);
    assert!(matches!(
        reader.i64_value().unwrap_err(),
        Error::Overflow { .. }
    ));
    assert_eq!(reader.big_int_value().unwrap(), big);
    next_scalar(&mut reader);
    assert_eq!(reader.big_int_value().unwrap(), -big);

    next_scalar(&mut reader);
    let zero = reader.f64_value().unwrap();
    assert!(zero == 0.0 && zero.is_sign_positive());
    next_scalar(&mut reader);
    let negative_zero = reader.f64_value().unwrap();
    assert!(negative_zero == 0.0 && negative_zero.is_sign_negative());
    next_scalar(&mut reader);
    assert_eq!(reader.f64_value().unwrap(), 1.5);
    next_scalar(&mut reader);
    assert_eq!(reader.f64_value().unwrap(), f64::INFINITY);
    next_scalar(&mut reader);
    assert!(reader.f64_value().unwrap().is_nan());

    for expected in &decimals {
        next_scalar(&mut reader);
        assert_eq!(&reader.decimal_value().unwrap(), expected);
    }
    for expected in &timestamps {
        next_scalar(&mut reader);
        assert_eq!(&reader.timestamp_value().unwrap(), expected);
    }

    next_scalar(&mut reader);
    assert_eq!(reader.symbol_value().unwrap().text(), Some("sym"));
    next_scalar(&mut reader);
    assert_eq!(reader.symbol_value().unwrap().text(), Some("name"));
    next_scalar(&mut reader);
    assert_eq!(reader.string_value().unwrap(), "");
    next_scalar(&mut reader);
    assert_eq!(reader.string_value().unwrap(), "h\u{e9}llo");
    next_scalar(&mut reader);
    assert_eq!(reader.blob_value().unwrap(), &[0, 1, 2, 255]);
    next_scalar(&mut reader);
    assert_eq!(reader.clob_value().unwrap(), b"text");

    assert_eq!(reader.next_value().unwrap(), Event::NeedsData);
}

#[test]
fn test_nested_containers() {
    let bytes = write(|w| {
        w.step_in(IonType::Struct).unwrap();
        w.set_field_name("name").unwrap();
        w.write_string("n").unwrap();
        w.set_field_name("items").unwrap();
        w.add_annotation("list_of").unwrap();
        w.step_in(IonType::List).unwrap();
        w.write_i64(1).unwrap();
        w.step_in(IonType::SExp).unwrap();
        w.write_i64(2).unwrap();
        w.step_out().unwrap();
        w.step_out().unwrap();
        w.set_field_name("empty").unwrap();
        w.step_in(IonType::Struct).unwrap();
        w.step_out().unwrap();
        w.step_out().unwrap();
        w.write_i64(99).unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);
    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    assert_eq!(reader.ion_type(), Some(IonType::Struct));
    reader.step_into_container().unwrap();

    next_scalar(&mut reader);
    assert_eq!(reader.field_name().unwrap().unwrap().text(), Some("name"));
    assert_eq!(reader.string_value().unwrap(), "n");

    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    assert_eq!(reader.field_name().unwrap().unwrap().text(), Some("items"));
    let annotations = reader.annotations().unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].text(), Some("list_of"));
    reader.step_into_container().unwrap();
    assert_eq!(reader.depth(), 2);
    next_scalar(&mut reader);
    assert_eq!(reader.i64_value().unwrap(), 1);
    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    assert_eq!(reader.ion_type(), Some(IonType::SExp));
    reader.step_into_container().unwrap();
    next_scalar(&mut reader);
    assert_eq!(reader.i64_value().unwrap(), 2);
    assert_eq!(reader.next_value().unwrap(), Event::EndContainer);
    reader.step_out_of_container().unwrap();
    assert_eq!(reader.next_value().unwrap(), Event::EndContainer);
    reader.step_out_of_container().unwrap();

    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    assert_eq!(reader.field_name().unwrap().unwrap().text(), Some("empty"));
    reader.step_into_container().unwrap();
    assert_eq!(reader.next_value().unwrap(), Event::EndContainer);
    reader.step_out_of_container().unwrap();
    assert_eq!(reader.next_value().unwrap(), Event::EndContainer);
    reader.step_out_of_container().unwrap();

    next_scalar(&mut reader);
    assert_eq!(reader.i64_value().unwrap(), 99);
    assert_eq!(reader.depth(), 0);
}

#[test]
fn test_step_out_skips_unread_children() {
    let bytes = write(|w| {
        w.step_in(IonType::List).unwrap();
        for i in 0..10 {
            w.write_string(&format!("item {i}")).unwrap();
        }
        w.step_out().unwrap();
        w.write_bool(true).unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);
    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    reader.step_into_container().unwrap();
    next_scalar(&mut reader);
    assert_eq!(reader.string_value().unwrap(), "item 0");
    next_scalar(&mut reader);
    assert_eq!(
        reader.step_out_of_container().unwrap(),
        Event::NeedsInstruction
    );
    next_scalar(&mut reader);
    assert!(reader.bool_value().unwrap());
}

#[test]
fn test_stacked_annotations_keep_order() {
    let bytes = write(|w| {
        w.set_annotations(std::iter::repeat("same").take(15)).unwrap();
        w.write_i64(1).unwrap();
        w.set_annotations(["z", "a", "m", "a"]).unwrap();
        w.step_in(IonType::List).unwrap();
        w.step_out().unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);
    next_scalar(&mut reader);
    let annotations = reader.annotations().unwrap();
    assert_eq!(annotations.len(), 15);
    assert!(annotations.iter().all(|a| a.text() == Some("same")));
    assert_eq!(reader.i64_value().unwrap(), 1);

    assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
    let texts: Vec<_> = reader
        .annotations()
        .unwrap()
        .into_iter()
        .map(|a| a.text().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["z", "a", "m", "a"]);
}

#[test]
fn test_repeated_annotation_counts() {
    for count in [13, 14, 15] {
        let bytes = write(|w| {
            w.set_annotations(std::iter::repeat("a").take(count)).unwrap();
            w.write_string("v").unwrap();
        });

        let mut reader = BinaryReader::from_slice(&bytes);
        next_scalar(&mut reader);
        let annotations = reader.annotations().unwrap();
        assert_eq!(annotations.len(), count);
        assert!(annotations.iter().all(|a| a.text() == Some("a")));
        assert_eq!(reader.string_value().unwrap(), "v");
        assert_eq!(reader.next_value().unwrap(), Event::NeedsData);
    }
}

#[test]
fn test_flushed_symbols_read_back() {
    let bytes = write(|w| {
        w.write_symbol("first").unwrap();
        w.flush().unwrap();
        w.write_symbol("second").unwrap();
        w.write_symbol("first").unwrap();
        w.flush().unwrap();
        w.write_string("plain").unwrap();
        w.flush().unwrap();
        w.write_symbol("third").unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);
    let mut texts = Vec::new();
    while reader.next_value().unwrap() == Event::StartScalar {
        let text = match reader.ion_type() {
            Some(IonType::Symbol) => reader.symbol_value().unwrap().text().unwrap().to_string(),
            _ => reader.string_value().unwrap().to_string(),
        };
        texts.push(text);
    }
    assert_eq!(texts, ["first", "second", "first", "plain", "third"]);
    assert_eq!(reader.symbol_table().max_id(), 12);

    assert_eq!(stream_texts(&bytes), texts);
}

#[test]
fn test_version_marker_resets_symbols() {
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_symbol("x").unwrap();
    writer.finish().unwrap();
    writer.write_symbol("y").unwrap();
    writer.finish().unwrap();
    let bytes = writer.into_inner().unwrap();

    // Both streams assign SID 10; the second marker discards the first table.
    let mut reader = BinaryReader::from_slice(&bytes);
    next_scalar(&mut reader);
    let first = reader.symbol_value().unwrap();
    next_scalar(&mut reader);
    let second = reader.symbol_value().unwrap();
    assert_eq!(first.text(), Some("x"));
    assert_eq!(second.text(), Some("y"));
    assert_eq!(reader.stats().ivms_seen, 2);

    assert_eq!(stream_texts(&bytes), ["x", "y"]);
}

#[test]
fn test_finish_cycles_are_identical() {
    let mut writer = BinaryWriter::new(Vec::new());
    let write_cycle = |writer: &mut BinaryWriter<Vec<u8>>| {
        writer.step_in(IonType::Struct).unwrap();
        writer.set_field_name("id").unwrap();
        writer.write_symbol("active").unwrap();
        writer.step_out().unwrap();
        writer.finish().unwrap();
    };
    write_cycle(&mut writer);
    let first = writer.get_ref().clone();
    write_cycle(&mut writer);
    let both = writer.get_ref();
    assert_eq!(both.len(), first.len() * 2);
    assert_eq!(&both[first.len()..], &first[..]);
}

#[test]
fn test_frozen_writer_table() {
    let mut table = LocalSymbolTable::new();
    table.intern("known").unwrap();
    let frozen = Arc::new(table.freeze());

    let mut writer =
        BinaryWriter::with_options(Vec::new(), WriterOptions::new().with_symbol_table(frozen));
    writer.write_symbol("known").unwrap();
    assert!(matches!(
        writer.write_symbol("unknown").unwrap_err(),
        Error::SymbolTable(SymbolTableError::ReadOnly { .. })
    ));
    let bytes = writer.into_inner().unwrap();

    let mut reader = BinaryReader::from_slice(&bytes);
    next_scalar(&mut reader);
    assert_eq!(reader.symbol_value().unwrap().text(), Some("known"));
}

#[test]
fn test_local_symbols_option() {
    let options = WriterOptions::new().with_local_symbols(["pre", "declared"]);
    let bytes = write_with(options, |w| {
        w.write_symbol_id(11).unwrap();
        w.write_symbol("pre").unwrap();
    });

    let mut reader = BinaryReader::from_slice(&bytes);
    next_scalar(&mut reader);
    assert_eq!(reader.symbol_value().unwrap().text(), Some("declared"));
    next_scalar(&mut reader);
    assert_eq!(reader.symbol_value().unwrap().text(), Some("pre"));
}

#[test]
fn test_accessor_type_mismatch() {
    let bytes = write(|w| w.write_string("text").unwrap());
    let mut reader = BinaryReader::from_slice(&bytes);
    next_scalar(&mut reader);
    assert!(matches!(
        reader.i64_value().unwrap_err(),
        Error::TypeMismatch { .. }
    ));
    assert_eq!(reader.string_value().unwrap(), "text");
}
