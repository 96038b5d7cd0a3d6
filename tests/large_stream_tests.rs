use ion_binary::format::IVM;
use ion_binary::{BinaryReader, BinaryWriter, Decimal, Event, IonType, Timestamp, WriterOptions};

const STRING_LEN: usize = 1 << 20;
const BATCHES: u64 = 2056;
const FILL_EVERY: u64 = 257;
const HEAD: usize = 64;

fn batch_decimal(i: u64) -> Decimal {
    Decimal::new(i as i64 * 7 - 3, -2)
}

fn batch_timestamp(i: u64) -> Timestamp {
    Timestamp::for_second(
        2000 + (i % 100) as u16,
        1 + (i % 12) as u8,
        1 + (i % 28) as u8,
        (i % 24) as u8,
        (i % 60) as u8,
        ((i * 7) % 60) as u8,
        Some(((i % 10) as i32 - 5) * 60),
    )
    .unwrap()
}

fn batch_letter(i: u64) -> u8 {
    b'a' + (i % 26) as u8
}

fn encode_batch(i: u64) -> Vec<u8> {
    let text = String::from_utf8(vec![batch_letter(i); STRING_LEN]).unwrap();
    let options = WriterOptions::new().with_version_marker(false);
    let mut writer = BinaryWriter::with_options(Vec::with_capacity(STRING_LEN + 64), options);
    writer.write_string(&text).unwrap();
    writer.write_decimal(&batch_decimal(i)).unwrap();
    writer.write_timestamp(&batch_timestamp(i)).unwrap();
    writer.into_inner().unwrap()
}

#[test]
fn test_stream_beyond_two_gibibytes() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut reader = BinaryReader::streaming();
    reader.append(&IVM).unwrap();
    let mut total = IVM.len() as u64;
    let mut filled = 0u64;

    for i in 0..BATCHES {
        let bytes = encode_batch(i);
        total += bytes.len() as u64;

        reader.append(&bytes[..HEAD]).unwrap();
        assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
        assert_eq!(reader.ion_type(), Some(IonType::String));

        if i % FILL_EVERY == 0 {
            assert_eq!(reader.fill_value().unwrap(), Event::NeedsData);
            reader.append(&bytes[HEAD..]).unwrap();
            assert_eq!(reader.fill_value().unwrap(), Event::ValueReady);
            let text = reader.string_value().unwrap();
            assert_eq!(text.len(), STRING_LEN);
            assert!(text.bytes().all(|b| b == batch_letter(i)));
            filled += 1;
        } else {
            assert_eq!(reader.next_value().unwrap(), Event::NeedsData);
            reader.append(&bytes[HEAD..]).unwrap();
        }

        assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
        assert_eq!(reader.decimal_value().unwrap(), batch_decimal(i));
        assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
        assert_eq!(reader.timestamp_value().unwrap(), batch_timestamp(i));

        // Skipped strings never reach the buffer.
        if i % FILL_EVERY != 0 {
            assert!(reader.cursor().buffered_len() < 2 * HEAD);
        }
    }

    assert_eq!(reader.next_value().unwrap(), Event::NeedsData);
    reader.end_of_stream();
    assert_eq!(reader.next_value().unwrap(), Event::NeedsData);

    let stats = reader.stats();
    assert!(total > i32::MAX as u64);
    assert_eq!(stats.bytes_consumed, total);
    assert_eq!(stats.values_skipped, BATCHES - filled);
    assert_eq!(stats.bytes_discarded, (BATCHES - filled) * STRING_LEN as u64);
    assert_eq!(stats.ivms_seen, 1);
}
