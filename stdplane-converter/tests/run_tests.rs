#![allow(clippy::uninlined_format_args, clippy::cast_possible_truncation)]
use std::sync::Arc;
use std::thread;

use stdplane_algorithms::Algorithm;
use stdplane_converter::{DeviceDecoder, Error, Protocol, RawEvent, RunContext, RunSetup};
use stdplane_core::{ClusteringConfig, DataBlock, ErrorKind, Plane, TagMap};
use stdplane_etroc::frame::{EVENT_HEADER_MAGIC, EVENT_TRAILER_MAGIC, FRAME_MARKER};
use stdplane_etroc::WordRepacker;

const ETROC_DEVICE: u32 = 1;
const DIGITIZER_DEVICE: u32 = 2;
const N_SAMPLES: usize = 32;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_data(col: u64, row: u64) -> u64 {
    (1 << 39) | (col << 33) | (row << 29) | (5 << 19) | (7 << 10)
}

fn make_chip_trailer(chip_id: u64, hits: u64) -> u64 {
    (chip_id << 22) | (hits << 8)
}

/// One ETROC block with a single chip holding `pixels`.
fn make_etroc_block(chip_id: u64, pixels: &[(u64, u64)]) -> DataBlock {
    let mut payload = vec![FRAME_MARKER << 24];
    payload.extend(pixels.iter().map(|&(col, row)| make_data(col, row)));
    payload.push(make_chip_trailer(chip_id, pixels.len() as u64));

    let mut containers = vec![
        (EVENT_HEADER_MAGIC << 4) | 0b0001,
        (1 << 28) | ((payload.len() as u32) << 2),
    ];
    let packed = WordRepacker::new(40, 32).unwrap().repack(&payload);
    containers.extend(packed.into_iter().map(|w| w as u32));
    containers.push((EVENT_TRAILER_MAGIC << 26) | ((pixels.len() as u32) << 14));

    let bytes: Vec<u8> = containers.iter().flat_map(|w| w.to_le_bytes()).collect();
    DataBlock::new(0, bytes)
}

fn make_waveform(pulse: f32) -> Vec<u8> {
    let mut samples = vec![0.0_f32; N_SAMPLES];
    samples[N_SAMPLES / 2] = pulse;
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn digitizer_bore() -> RawEvent {
    let tags = TagMap::new()
        .with("n_samples_per_waveform", N_SAMPLES.to_string())
        .with("sampling_frequency_MHz", "5000")
        .with("dut_names", "['LGAD']")
        .with("LGAD", "CH0: [(0,0)], CH1: [(1,0)], trigger_group_0");
    RawEvent::begin_of_run(DIGITIZER_DEVICE, "CAENDT5742", tags)
}

fn etroc_bore() -> RawEvent {
    RawEvent::begin_of_run(ETROC_DEVICE, "etroc", TagMap::new().with("chip_columns", "8"))
}

fn make_context(setup: RunSetup) -> Arc<RunContext> {
    let mut setup = setup;
    setup.register_bore(&etroc_bore()).unwrap();
    setup.register_bore(&digitizer_bore()).unwrap();
    setup.freeze()
}

fn make_events(n: u64) -> Vec<RawEvent> {
    (1..=n)
        .map(|i| {
            if i % 2 == 0 {
                let col = i % 8;
                RawEvent::data(
                    ETROC_DEVICE,
                    i,
                    "ETROC",
                    vec![make_etroc_block(3, &[(col, 0), (col, 1), (7, 15)])],
                )
            } else {
                RawEvent::data(
                    DIGITIZER_DEVICE,
                    i,
                    "CAENDT5742",
                    vec![
                        DataBlock::new(0, make_waveform(50.0 + i as f32)),
                        DataBlock::new(1, make_waveform(-30.0)),
                        DataBlock::new(16, make_waveform(0.0)),
                    ],
                )
            }
        })
        .collect()
}

#[test]
fn test_registered_devices() {
    init_logging();
    let context = make_context(RunSetup::new());

    let ids: Vec<u32> = context.device_ids().collect();
    assert_eq!(ids, vec![ETROC_DEVICE, DIGITIZER_DEVICE]);

    let etroc = context.decoder(ETROC_DEVICE).unwrap();
    assert_eq!(etroc.protocol(), Protocol::Etroc);
    if let DeviceDecoder::Etroc(decoder) = etroc {
        assert_eq!(decoder.config().chip_columns, 8);
        assert_eq!(decoder.config().chip_rows, 16);
    }

    let digitizer = context.decoder(DIGITIZER_DEVICE).unwrap();
    assert_eq!(digitizer.protocol(), Protocol::Digitizer);
    if let DeviceDecoder::Digitizer(decoder) = digitizer {
        assert_eq!(decoder.topology().channels(), vec![0, 1, 16]);
    }
}

#[test]
fn test_convert_each_protocol() {
    let context = make_context(RunSetup::new());
    let events = make_events(2);

    let digitizer = context.convert(&events[0]).unwrap();
    assert_eq!(digitizer.len(), 1);
    assert_eq!(digitizer[0].name(), "LGAD");
    assert_eq!(digitizer[0].n_hits(), 3);
    assert!((digitizer[0].hits()[0].amplitude - 51.0).abs() < 1e-9);

    let etroc = context.convert(&events[1]).unwrap();
    assert_eq!(etroc.len(), 1);
    assert_eq!(etroc[0].id(), 3);
    assert_eq!(etroc[0].max_x(), 8);
    assert_eq!(etroc[0].n_hits(), 3);
    // Column 7 is the last column of an 8-column chip.
    assert!(etroc[0].bad_hits().is_empty());
}

#[test]
fn test_concurrent_matches_sequential() {
    init_logging();
    let context = make_context(RunSetup::new());
    let events = make_events(40);

    let sequential: Vec<Vec<Plane>> = events
        .iter()
        .map(|event| context.convert(event).unwrap())
        .collect();

    let parallel: Vec<Vec<Plane>> = context
        .convert_all(&events)
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(parallel, sequential);

    let handles: Vec<_> = events
        .chunks(10)
        .map(|chunk| {
            let context = Arc::clone(&context);
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                chunk
                    .iter()
                    .map(|event| context.convert(event).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let threaded: Vec<Vec<Plane>> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(threaded, sequential);
}

#[test]
fn test_clustering_after_conversion() {
    let setup = RunSetup::new().with_clustering(Algorithm::ForwardScan, ClusteringConfig::default());
    let context = make_context(setup);

    let etroc = context.convert(&make_events(2)[1]).unwrap();
    let clusters = etroc[0].clusters();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].len(), 2);

    let unclustered = make_context(RunSetup::new());
    assert!(unclustered.convert(&make_events(2)[1]).unwrap()[0]
        .clusters()
        .is_empty());
}

#[test]
fn test_device_not_initialized() {
    let context = make_context(RunSetup::new());
    let event = RawEvent::data(99, 1, "ETROC", vec![make_etroc_block(0, &[(0, 0)])]);

    let err = context.convert(&event).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Topology);
    assert!(err.to_string().contains("99"));
}

#[test]
fn test_unknown_protocol() {
    let mut setup = RunSetup::new();
    let err = setup
        .register_bore(&RawEvent::begin_of_run(5, "TLU", TagMap::new()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(setup.n_devices(), 0);
}

#[test]
fn test_incomplete_digitizer_bore() {
    let mut setup = RunSetup::new();
    let tags = TagMap::new().with("dut_names", "['LGAD']");
    let err = setup
        .register_bore(&RawEvent::begin_of_run(2, "CAEN_DT5748", tags))
        .unwrap_err();
    assert!(matches!(err, Error::CaenError(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_rejected_events_do_not_stop_the_run() {
    let context = make_context(RunSetup::new());
    let mut events = make_events(4);
    // Drop one channel block: the digitizer event count check fails.
    if let stdplane_converter::Payload::Data(blocks) = &mut events[0].payload {
        blocks.pop();
    }

    let results = context.convert_all(&events);
    assert_eq!(results.len(), 4);
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(results[1..].iter().all(Result::is_ok));
}
