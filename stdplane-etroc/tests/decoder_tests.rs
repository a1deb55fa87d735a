#![allow(clippy::uninlined_format_args, clippy::cast_possible_truncation)]
use proptest::prelude::*;
use stdplane_core::{DataBlock, Error as CoreError, ErrorKind, PixelCoord, SensorType};
use stdplane_etroc::frame::{EVENT_HEADER_MAGIC, EVENT_TRAILER_MAGIC, FRAME_MARKER};
use stdplane_etroc::{ByteOrder, EtrocConfig, EtrocDecoder, Error, WordRepacker};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_data(col: u64, row: u64, toa: u64, tot: u64) -> u64 {
    (1 << 39) | (col << 33) | (row << 29) | (toa << 19) | (tot << 10)
}

fn make_frame_header(l1: u64) -> u64 {
    (FRAME_MARKER << 24) | (l1 << 14)
}

fn make_filler() -> u64 {
    (FRAME_MARKER << 24) | (0b10 << 22)
}

fn make_chip_trailer(chip_id: u64, hits: u64) -> u64 {
    (chip_id << 22) | (hits << 8) | 0x5A
}

/// Header, packed payload and trailer as container words.
fn make_containers(payload: &[u64], trailer_hits: u32) -> Vec<u32> {
    let mut containers = vec![
        (EVENT_HEADER_MAGIC << 4) | 0b0011,
        (2 << 28) | (7 << 12) | ((payload.len() as u32) << 2),
    ];
    let packed = WordRepacker::new(40, 32).unwrap().repack(payload);
    containers.extend(packed.into_iter().map(|w| w as u32));
    containers.push((EVENT_TRAILER_MAGIC << 26) | (trailer_hits << 14));
    containers
}

fn to_bytes(containers: &[u32], order: ByteOrder) -> Vec<u8> {
    containers
        .iter()
        .flat_map(|w| match order {
            ByteOrder::Little => w.to_le_bytes(),
            ByteOrder::Big => w.to_be_bytes(),
        })
        .collect()
}

fn two_chip_payload() -> Vec<u64> {
    vec![
        make_frame_header(11),
        make_data(0, 0, 10, 20),
        make_data(0, 1, 11, 21),
        make_chip_trailer(5, 2),
        make_filler(),
        make_frame_header(12),
        make_data(15, 15, 12, 22),
        make_chip_trailer(2, 1),
    ]
}

#[test]
fn test_multi_chip_block() {
    init_logging();
    let bytes = to_bytes(&make_containers(&two_chip_payload(), 3), ByteOrder::Little);
    let planes = EtrocDecoder::new().decode_planes(&bytes).unwrap();

    assert_eq!(planes.len(), 2);
    let ids: Vec<u32> = planes.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![2, 5]);

    for plane in &planes {
        assert_eq!(plane.name(), "ETROC");
        assert_eq!(plane.sensor(), SensorType::Etroc);
        assert_eq!((plane.max_x(), plane.max_y()), (16, 16));
        assert!(plane.bad_hits().is_empty());
    }

    let chip2 = &planes[0];
    assert_eq!(chip2.n_hits(), 1);
    assert_eq!(chip2.hits()[0].coord, PixelCoord::new(15, 15));
    assert_eq!(chip2.hits()[0].level_one_id, Some(12));

    let chip5 = &planes[1];
    let coords: Vec<PixelCoord> = chip5.hits().iter().map(|h| h.coord).collect();
    assert_eq!(coords, vec![PixelCoord::new(0, 0), PixelCoord::new(0, 1)]);
    assert_eq!(chip5.hits()[1].tot, Some(21));
    assert_eq!(chip5.hits()[1].toa, Some(11));
    assert_eq!(chip5.hits()[1].level_one_id, Some(11));
}

#[test]
fn test_chip_trailers_counted() {
    let bytes = to_bytes(&make_containers(&two_chip_payload(), 3), ByteOrder::Little);
    let event = EtrocDecoder::new().decode_block(&bytes).unwrap();
    assert_eq!(event.header.chip_mask, 0b0011);
    assert_eq!(event.header.version, 2);
    assert_eq!(event.chip_trailers.len(), 2);
    assert_eq!(event.chip_trailers[0].crc, 0x5A);
    assert_eq!(event.n_data_words, 3);
    assert!(event.trailer_consistent());
}

#[test]
fn test_big_endian_containers() {
    let containers = make_containers(&two_chip_payload(), 3);
    let decoder =
        EtrocDecoder::with_config(EtrocConfig::new().with_byte_order(ByteOrder::Big)).unwrap();

    let planes = decoder
        .decode_planes(&to_bytes(&containers, ByteOrder::Big))
        .unwrap();
    assert_eq!(planes.len(), 2);

    // The same bytes read with the other byte order lose the header magic.
    let err = EtrocDecoder::new()
        .decode_planes(&to_bytes(&containers, ByteOrder::Big))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Framing);
}

#[test]
fn test_every_header_magic_bit_flip_rejected() {
    init_logging();
    let containers = make_containers(&two_chip_payload(), 3);
    let decoder = EtrocDecoder::new();

    for bit in 4..32 {
        let mut corrupted = containers.clone();
        corrupted[0] ^= 1 << bit;
        let result = decoder.decode_planes(&to_bytes(&corrupted, ByteOrder::Little));
        match result {
            Err(Error::CoreError(CoreError::CorruptHeader(_))) => {}
            other => panic!("bit {} flip accepted: {:?}", bit, other.map(|p| p.len())),
        }
    }
}

#[test]
fn test_chip_mask_bits_are_not_magic() {
    let mut containers = make_containers(&two_chip_payload(), 3);
    containers[0] ^= 0b1000;
    let event = EtrocDecoder::new()
        .decode_block(&to_bytes(&containers, ByteOrder::Little))
        .unwrap();
    assert_eq!(event.header.chip_mask, 0b1011);
}

#[test]
fn test_corrupt_event_trailer_rejected() {
    let mut containers = make_containers(&two_chip_payload(), 3);
    let last = containers.len() - 1;
    containers[last] ^= 1 << 30;

    let err = EtrocDecoder::new()
        .decode_planes(&to_bytes(&containers, ByteOrder::Little))
        .unwrap_err();
    assert!(matches!(err, Error::CoreError(CoreError::CorruptTrailer(_))));
    assert_eq!(err.kind(), ErrorKind::Framing);
}

#[test]
fn test_word_count_mismatch_rejected() {
    let decoder = EtrocDecoder::new();

    for declared in [7u32, 9, 12] {
        let mut containers = make_containers(&two_chip_payload(), 3);
        containers[1] = (containers[1] & !(0x3FF << 2)) | (declared << 2);
        let err = decoder
            .decode_block(&to_bytes(&containers, ByteOrder::Little))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::CoreError(CoreError::WordCountMismatch { declared: d, available_bits: 320 })
                    if d == declared as usize
            ),
            "declared {}: {:?}",
            declared,
            err
        );
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }
}

#[test]
fn test_hit_count_mismatch_keeps_hits() {
    init_logging();
    let payload = vec![
        make_frame_header(1),
        make_data(1, 2, 0, 5),
        make_data(2, 2, 0, 6),
        make_chip_trailer(9, 3),
    ];
    let bytes = to_bytes(&make_containers(&payload, 2), ByteOrder::Little);

    let event = EtrocDecoder::new().decode_block(&bytes).unwrap();
    assert_eq!(event.mismatches.len(), 1);
    assert_eq!(event.mismatches[0].chip_id, 9);
    assert_eq!(event.mismatches[0].declared, 3);
    assert_eq!(event.mismatches[0].decoded, 2);

    let planes = EtrocDecoder::new().decode_planes(&bytes).unwrap();
    assert_eq!(planes.len(), 1);
    assert_eq!(planes[0].n_hits(), 2);
}

#[test]
fn test_event_trailer_count_mismatch_is_not_fatal() {
    let bytes = to_bytes(&make_containers(&two_chip_payload(), 40), ByteOrder::Little);
    let event = EtrocDecoder::new().decode_block(&bytes).unwrap();
    assert!(!event.trailer_consistent());
    assert_eq!(event.n_hits(), 3);
}

#[test]
fn test_misaligned_block() {
    let mut bytes = to_bytes(&make_containers(&two_chip_payload(), 3), ByteOrder::Little);
    bytes.pop();
    let err = EtrocDecoder::new().decode_block(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

#[test]
fn test_custom_grid_flags_bad_hits() {
    let decoder = EtrocDecoder::with_config(EtrocConfig::new().with_grid(8, 8)).unwrap();
    let bytes = to_bytes(&make_containers(&two_chip_payload(), 3), ByteOrder::Little);
    let planes = decoder.decode_planes(&bytes).unwrap();
    assert_eq!(planes[0].bad_hits().len(), 1);
    assert!(planes[1].bad_hits().is_empty());
}

#[test]
fn test_decode_event_in_parallel() {
    let good = to_bytes(&make_containers(&two_chip_payload(), 3), ByteOrder::Little);
    let single = to_bytes(
        &make_containers(&[make_data(4, 4, 0, 1), make_chip_trailer(30, 1)], 1),
        ByteOrder::Little,
    );
    let blocks = vec![DataBlock::new(0, good.clone()), DataBlock::new(1, single)];

    let planes = EtrocDecoder::new().decode_event(&blocks).unwrap();
    let ids: Vec<u32> = planes.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![2, 5, 30]);

    let mut broken = good;
    broken[0] ^= 0xFF;
    let blocks = vec![DataBlock::new(0, broken)];
    assert!(EtrocDecoder::new().decode_event(&blocks).is_err());
}

proptest! {
    #[test]
    fn test_repack_round_trip(words in prop::collection::vec(any::<u32>(), 0..40)) {
        let wide = WordRepacker::etroc().repack_containers(&words);
        prop_assert_eq!(wide.len(), (words.len() * 32).div_ceil(40));

        let back = WordRepacker::new(40, 32).unwrap().repack(&wide);
        prop_assert!(back.len() >= words.len());
        for (i, word) in words.iter().enumerate() {
            prop_assert_eq!(back[i], u64::from(*word));
        }
        for extra in &back[words.len()..] {
            prop_assert_eq!(*extra, 0);
        }
    }

    #[test]
    fn test_repack_preserves_bit_count(
        words in prop::collection::vec(any::<u64>(), 1..20),
        input_width in 1u32..=64,
        output_width in 1u32..=64,
    ) {
        let repacker = WordRepacker::new(input_width, output_width).unwrap();
        let out = repacker.repack(&words);
        let total = words.len() * input_width as usize;
        prop_assert_eq!(out.len(), total.div_ceil(output_width as usize));
        for word in &out {
            if output_width < 64 {
                prop_assert!(*word < (1u64 << output_width));
            }
        }
    }
}
