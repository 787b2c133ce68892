//! Library-level pipeline scenarios on synthetic binaries.

mod util;

use sjismine::core::codec::Dialect;
use sjismine::core::exclusion::ExclusionReason;
use sjismine::core::heuristics::HeuristicsConfig;
use sjismine::core::pipeline::{Pipeline, Stage};
use sjismine::core::tally::TallyKind;
use sjismine::infra::config::ScanConfig;
use sjismine::infra::store::{CandidateStore, MemoryStore};

use util::{KEEPERS, encode_binary};

fn pipeline(
    dialect: Dialect,
    heuristics: HeuristicsConfig,
) -> Pipeline
{
    let scan = ScanConfig { dialect, ..Default::default() };
    Pipeline::new(&scan, &heuristics).expect("valid config")
}

#[test]
fn minimal_two_pair_input_survives()
{
    // Two characters only pass with min_length lowered to 2
    let p = pipeline(Dialect::ShiftJis, HeuristicsConfig { min_length: 2, ..Default::default() });
    let mut store = MemoryStore::new();

    let report = p
        .run(&[0x82, 0xA0, 0x82, 0xA2], &mut store)
        .expect("run");

    assert_eq!(report.translation_candidates(), vec!["あい"]);
    assert_eq!(store.pending().len(), 1);
}

#[test]
fn survivors_round_trip_for_every_dialect()
{
    let source = encode_binary(&KEEPERS);

    for dialect in Dialect::ALL
    {
        let p = pipeline(dialect, HeuristicsConfig::default());
        let mut store = MemoryStore::new();
        let report = p
            .run(&source, &mut store)
            .expect("run");

        let survivors = report.translation_candidates();
        assert_eq!(survivors, KEEPERS.to_vec(), "{dialect}");
        for text in survivors
        {
            let needle = dialect
                .encode(text)
                .expect("encodable");
            assert!(
                memchr::memmem::find(&source, &needle).is_some(),
                "{text} must be in the source under {dialect}"
            );
        }
    }
}

#[test]
fn min_length_boundary()
{
    let source = encode_binary(&["あいうえ", "かきく"]);
    let p = pipeline(Dialect::ShiftJis, HeuristicsConfig { min_length: 4, ..Default::default() });
    let report = p
        .run(&source, &mut MemoryStore::new())
        .expect("run");

    assert_eq!(report.translation_candidates(), vec!["あいうえ"]);
    assert_eq!(report.ledger.reason_of("かきく"), Some(ExclusionReason::TooShort));
}

#[test]
fn escape_sequence_wins_over_japaneseness()
{
    // CP932 carries the ASCII escape inside the run
    let source = encode_binary(&["こんにちは%dさん"]);
    let p = pipeline(Dialect::Cp932, HeuristicsConfig::default());
    let report = p
        .run(&source, &mut MemoryStore::new())
        .expect("run");

    assert_eq!(
        report
            .ledger
            .reason_of("こんにちは%dさん"),
        Some(ExclusionReason::HasEscapeSequence)
    );
}

#[test]
fn repeated_character_is_excessive_repetition()
{
    // Variety runs earlier in the chain, so it is switched off here
    let source = encode_binary(&["ああああああ"]);
    let p = pipeline(
        Dialect::ShiftJis,
        HeuristicsConfig { min_variety_percent: 0, ..Default::default() },
    );
    let report = p
        .run(&source, &mut MemoryStore::new())
        .expect("run");

    assert_eq!(
        report
            .ledger
            .reason_of("ああああああ"),
        Some(ExclusionReason::ExcessiveRepetition)
    );
}

#[test]
fn x0213_runs_outside_the_shared_rows_are_decode_errors()
{
    // FA/FB rows are CP932 vendor glyphs, 81 AD is an X0213-only cell
    let source = [0x00, 0xFA, 0x40, 0xFB, 0x40, 0x00, 0x81, 0xAD, 0x81, 0xAE, 0x00];
    let p = pipeline(Dialect::ShiftJisX0213, HeuristicsConfig::default());

    let (candidates, stages) = p.extract(&source);

    assert!(candidates.is_empty());
    assert_eq!(stages[0].tally.get(TallyKind::Run), 2);
    assert_eq!(stages[1].tally.get(TallyKind::Excluded(ExclusionReason::DecodeError)), 2);
}

#[test]
fn parallel_scan_matches_single_threaded()
{
    let mut texts: Vec<&str> = Vec::new();
    for _ in 0..200
    {
        texts.extend(KEEPERS);
    }
    let source = encode_binary(&texts);

    let single = Pipeline::new(
        &ScanConfig { chunk_size: 0, ..Default::default() },
        &HeuristicsConfig::default(),
    )
    .expect("pipeline");
    let parallel = Pipeline::new(
        &ScanConfig { chunk_size: 64, ..Default::default() },
        &HeuristicsConfig::default(),
    )
    .expect("pipeline");

    let (a, a_stages) = single.extract(&source);
    let (b, b_stages) = parallel.extract(&source);
    assert_eq!(a, b);
    assert_eq!(a_stages, b_stages);
    assert_eq!(a_stages[0].tally.get(TallyKind::Run), 600);
}

#[test]
fn stage_tallies_snapshot()
{
    let source = encode_binary(&["こんにちは", "ありがとう", "あい", "こんにちは"]);
    let p = pipeline(Dialect::ShiftJis, HeuristicsConfig::default());
    let report = p
        .run(&source, &mut MemoryStore::new())
        .expect("run");

    assert_eq!(
        report
            .stages
            .iter()
            .map(|s| s.stage)
            .collect::<Vec<_>>(),
        vec![Stage::Scan, Stage::Ingest, Stage::Heuristics, Stage::Verify]
    );

    insta::assert_yaml_snapshot!(report.stages, @r"
    - stage: Scan
      tally:
        Runs: 4
    - stage: Ingest
      tally:
        New: 3
        Already Exists: 1
    - stage: Heuristics
      tally:
        Survived: 2
        Too Short: 1
    - stage: Verify
      tally:
        Survived: 2
    ");
}
