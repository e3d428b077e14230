// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end pipeline tests against in-process collaborators.
//!
//! The fake bundler concatenates the data module and entry; the fake engine
//! decodes the embedded blob with the strategy's reference decoder. Both are
//! driven through the same traits as esbuild and node.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{Behavior, FakeBundler, FakeEngine};
use packbench_core::config::{Config, ConfigLoader};
use packbench_core::corpus::{Corpus, Payload};
use packbench_core::error::{BenchError, ConfigurationError, PairFailure, StrategyError};
use packbench_core::metrics::PairOutcome;
use packbench_core::pipeline::{Orchestrator, RunOptions};
use packbench_core::registry::StrategyRegistry;
use packbench_core::scoring::Mark;
use packbench_core::strategy::{Strategy, StrategyKind};
use packbench_core::types::{CompressionLevel, StrategyName};
use tempfile::TempDir;

fn config() -> Config {
    let mut config = ConfigLoader::load_string("").unwrap();
    config.sandbox.timeout = Duration::from_millis(200);
    config.sandbox.concurrency = 4;
    config
}

fn strategy(kind: StrategyKind, name: &str) -> Arc<dyn Strategy> {
    kind.instantiate(StrategyName::new(name).unwrap(), CompressionLevel::DEFAULT)
}

fn registry(strategies: &[Arc<dyn Strategy>]) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    for s in strategies {
        registry.register(Arc::clone(s)).unwrap();
    }
    registry
}

fn json_doc(rows: usize) -> String {
    let items: Vec<String> = (0..rows)
        .map(|i| format!(r#"{{"id":{},"label":"row-{}","ok":true}}"#, i, i % 5))
        .collect();
    format!("[{}]", items.join(","))
}

fn corpus() -> Corpus {
    Corpus::from_payloads([
        Payload::new("a-small.json", json_doc(10)),
        Payload::new("b-large.json", json_doc(400)),
    ])
}

/// Emits a fixed-size blob and decodes it back to a fixed payload.
#[derive(Debug)]
struct FixedStrategy {
    name: StrategyName,
    payload: Vec<u8>,
    blob_len: usize,
}

impl Strategy for FixedStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, _payload: &[u8]) -> Result<String, StrategyError> {
        Ok("A".repeat(self.blob_len))
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!("import blob from {:?};\n", blob_module)
    }

    fn decompress(&self, _blob: &str) -> Result<Vec<u8>, StrategyError> {
        Ok(self.payload.clone())
    }
}

#[tokio::test]
async fn test_all_builtin_strategies_round_trip() {
    let temp = TempDir::new().unwrap();
    let strategies: Vec<_> = StrategyKind::ALL
        .iter()
        .map(|k| strategy(*k, k.as_str()))
        .collect();
    let engine = Arc::new(FakeEngine::new(&strategies));
    let stats = Arc::clone(&engine.stats);

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::new(FakeBundler::default()),
        engine,
        &config(),
        RunOptions::default(),
    )
    .unwrap();

    let results = orchestrator
        .run(&corpus(), &temp.path().join("out"))
        .await
        .unwrap();

    assert_eq!(results.pair_count(), 12);
    assert!(!results.has_failures());

    for (payload, row) in results.rows() {
        let record = row.outcome.record().unwrap();
        let m = &record.measurement;
        assert_eq!(m.raw_size, payload.raw_size());
        assert!(m.artifact_size >= m.compressed_size);
        assert_eq!(m.runtime_size, m.artifact_size - m.compressed_size);
        assert!(record.artifact_path.exists());
        assert_eq!(record.manifest.inputs.len(), 2);
        assert!(row.score.is_some());
    }

    // the baseline carries the largest blob for a compressible payload
    let large = &results.payloads[1];
    let baseline = large.rows[0].score.as_ref().unwrap();
    assert_eq!(
        baseline.mark(packbench_core::scoring::Metric::CompressedSize),
        Some(Mark::Worst)
    );

    assert_eq!(
        stats.contexts_opened.load(Ordering::SeqCst),
        stats.contexts_closed.load(Ordering::SeqCst)
    );
    assert_eq!(stats.engine_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_report_order_is_corpus_then_registration() {
    let temp = TempDir::new().unwrap();
    let strategies = vec![
        strategy(StrategyKind::TinyInflate, "zz-tiny"),
        strategy(StrategyKind::Pako, "aa-pako"),
        strategy(StrategyKind::Base64, "mm-base64"),
    ];
    // slowest first so completion order differs from registration order
    let engine = FakeEngine::new(&strategies)
        .with_duration("zz-tiny", Duration::from_millis(9))
        .with_duration("aa-pako", Duration::from_millis(1));

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::new(FakeBundler::default()),
        Arc::new(engine),
        &config(),
        RunOptions::default(),
    )
    .unwrap();
    let results = orchestrator
        .run(&corpus(), &temp.path().join("out"))
        .await
        .unwrap();

    let order: Vec<String> = results
        .rows()
        .map(|(p, row)| format!("{}/{}", p.name(), row.strategy))
        .collect();
    assert_eq!(
        order,
        vec![
            "a-small.json/zz-tiny",
            "a-small.json/aa-pako",
            "a-small.json/mm-base64",
            "b-large.json/zz-tiny",
            "b-large.json/aa-pako",
            "b-large.json/mm-base64",
        ]
    );
}

#[tokio::test]
async fn test_pair_failures_are_isolated() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let strategies = vec![
        strategy(StrategyKind::Pako, "pako"),
        strategy(StrategyKind::Uzip, "uzip"),
        strategy(StrategyKind::Fflate, "fflate"),
        strategy(StrategyKind::TinyInflate, "tiny"),
        strategy(StrategyKind::Base64, "base64"),
    ];
    let engine = FakeEngine::new(&strategies)
        .with_behavior("uzip", Behavior::Hang)
        .with_behavior("fflate", Behavior::Crash)
        .with_behavior("tiny", Behavior::Corrupt);
    let stats = Arc::clone(&engine.stats);

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::new(FakeBundler::failing(&["base64"])),
        Arc::new(engine),
        &config(),
        RunOptions::default(),
    )
    .unwrap();
    let results = orchestrator.run(&corpus(), &out).await.unwrap();

    assert_eq!(results.pair_count(), 10);
    assert_eq!(results.failure_count(), 8);

    for payload in &results.payloads {
        let kinds: Vec<&str> = payload
            .rows
            .iter()
            .map(|row| match &row.outcome {
                PairOutcome::Success(_) => "ok",
                PairOutcome::Failed(failure) => failure.kind(),
            })
            .collect();
        assert_eq!(kinds, vec!["ok", "timeout", "crash", "mismatch", "build"]);

        // the lone survivor is scored on its own
        let survivor = payload.rows[0].score.as_ref().unwrap();
        assert_eq!(survivor.score, 0);
        assert_eq!(survivor.composite, None);
        assert!(payload.rows[1..].iter().all(|row| row.score.is_none()));

        let PairOutcome::Failed(PairFailure::Verification(mismatch)) = &payload.rows[3].outcome
        else {
            panic!("expected a mismatch");
        };
        assert!(mismatch.dump_path.starts_with(out.join("dist")));
        let dumped = std::fs::read(&mismatch.dump_path).unwrap();
        assert_eq!(dumped.len() as u64, payload.payload.raw_size());
        assert_ne!(dumped, payload.payload.content());

        let PairOutcome::Failed(build) = &payload.rows[4].outcome else {
            panic!("expected a build failure");
        };
        assert!(build.to_string().contains("Could not resolve decoder"));
    }

    assert_eq!(
        stats.contexts_opened.load(Ordering::SeqCst),
        stats.contexts_closed.load(Ordering::SeqCst)
    );
    assert_eq!(stats.engine_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_size_scenario() {
    let temp = TempDir::new().unwrap();
    let payload = "x".repeat(10_000);
    let fixed: Arc<dyn Strategy> = Arc::new(FixedStrategy {
        name: StrategyName::new("fixed").unwrap(),
        payload: payload.clone().into_bytes(),
        blob_len: 3_000,
    });
    let bundler = FakeBundler {
        pad_to: Some(5_000),
        ..FakeBundler::default()
    };

    let orchestrator = Orchestrator::new(
        registry(&[Arc::clone(&fixed)]),
        Arc::new(bundler),
        Arc::new(FakeEngine::new(&[fixed])),
        &config(),
        RunOptions::default(),
    )
    .unwrap();
    let results = orchestrator
        .run(
            &Corpus::from_payloads([Payload::new("doc.json", payload)]),
            &temp.path().join("out"),
        )
        .await
        .unwrap();

    let record = results.payloads[0].rows[0].outcome.record().unwrap();
    assert_eq!(record.measurement.raw_size, 10_000);
    assert_eq!(record.measurement.compressed_size, 3_000);
    assert_eq!(record.measurement.artifact_size, 5_000);
    assert_eq!(record.measurement.runtime_size, 2_000);
}

#[tokio::test]
async fn test_split_wins_net_zero() {
    let temp = TempDir::new().unwrap();
    let payload = json_doc(50);
    // A: smaller blob, slower decode. B: larger blob, faster decode.
    let a: Arc<dyn Strategy> = Arc::new(FixedStrategy {
        name: StrategyName::new("a").unwrap(),
        payload: payload.clone().into_bytes(),
        blob_len: 100,
    });
    let b: Arc<dyn Strategy> = Arc::new(FixedStrategy {
        name: StrategyName::new("b").unwrap(),
        payload: payload.clone().into_bytes(),
        blob_len: 200,
    });
    let engine = FakeEngine::new(&[Arc::clone(&a), Arc::clone(&b)])
        .with_duration("a", Duration::from_millis(8))
        .with_duration("b", Duration::from_millis(2));
    let bundler = FakeBundler {
        pad_to: Some(4_000),
        ..FakeBundler::default()
    };

    let orchestrator = Orchestrator::new(
        registry(&[a, b]),
        Arc::new(bundler),
        Arc::new(engine),
        &config(),
        RunOptions::default(),
    )
    .unwrap();
    let results = orchestrator
        .run(
            &Corpus::from_payloads([Payload::new("doc.json", payload)]),
            &temp.path().join("out"),
        )
        .await
        .unwrap();

    let rows = &results.payloads[0].rows;
    let a_score = rows[0].score.as_ref().unwrap();
    let b_score = rows[1].score.as_ref().unwrap();

    // compress time is measured for real, so only check what is pinned
    assert_eq!(
        a_score.mark(packbench_core::scoring::Metric::CompressedSize),
        Some(Mark::Best)
    );
    assert_eq!(
        b_score.mark(packbench_core::scoring::Metric::DecompressTime),
        Some(Mark::Best)
    );
    assert_eq!(a_score.mark(packbench_core::scoring::Metric::ArtifactSize), None);
    assert_eq!(a_score.score + b_score.score, 0);
}

#[tokio::test]
async fn test_determinism_check_reports_stable_builds() {
    let temp = TempDir::new().unwrap();
    let strategies = vec![strategy(StrategyKind::Pako, "pako")];
    let bundler = Arc::new(FakeBundler::default());

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::clone(&bundler) as Arc<dyn packbench_core::builder::Bundler>,
        Arc::new(FakeEngine::new(&strategies)),
        &config(),
        RunOptions {
            check_determinism: true,
        },
    )
    .unwrap();
    let results = orchestrator
        .run(&corpus(), &temp.path().join("out"))
        .await
        .unwrap();

    for (_, row) in results.rows() {
        assert_eq!(row.outcome.record().unwrap().deterministic, Some(true));
    }
    assert_eq!(bundler.builds.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_empty_registry_rejected() {
    let err = Orchestrator::new(
        StrategyRegistry::new(),
        Arc::new(FakeBundler::default()),
        Arc::new(FakeEngine::new(&[])),
        &config(),
        RunOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        BenchError::Configuration(ConfigurationError::NoStrategies)
    ));
}

#[tokio::test]
async fn test_engine_closed_when_scratch_unusable() {
    let temp = TempDir::new().unwrap();
    // a file where the output directory should be
    let blocker = temp.path().join("out");
    std::fs::write(&blocker, "not a directory").unwrap();

    let strategies = vec![strategy(StrategyKind::Pako, "pako")];
    let engine = FakeEngine::new(&strategies);
    let stats = Arc::clone(&engine.stats);

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::new(FakeBundler::default()),
        Arc::new(engine),
        &config(),
        RunOptions::default(),
    )
    .unwrap();

    let err = orchestrator.run(&corpus(), &blocker).await.unwrap_err();
    assert!(matches!(err, BenchError::Io { .. }));
    assert_eq!(stats.engine_closes.load(Ordering::SeqCst), 1);
    assert_eq!(stats.contexts_opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scratch_cleaned_between_runs() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let strategies = vec![strategy(StrategyKind::Pako, "pako")];

    for _ in 0..2 {
        std::fs::create_dir_all(out.join("dist")).unwrap();
        std::fs::write(out.join("dist").join("leftover.js"), "stale").unwrap();

        let orchestrator = Orchestrator::new(
            registry(&strategies),
            Arc::new(FakeBundler::default()),
            Arc::new(FakeEngine::new(&strategies)),
            &config(),
            RunOptions::default(),
        )
        .unwrap();
        orchestrator.run(&corpus(), &out).await.unwrap();

        assert!(!out.join("dist").join("leftover.js").exists());
        assert!(out.join("dist").join("p0-s0-pako-a-small.json.js").exists());
        assert!(out.join("dist").join("p0-s0-pako-a-small.json.html").exists());
        assert!(out.join("src").join("p0-s0-pako-a-small.json.data.js").exists());
        assert!(out.join("src").join("p0-s0-pako-a-small.json.src.js").exists());
    }
}

#[tokio::test]
async fn test_hyphenated_names_keep_pairs_apart() {
    let temp = TempDir::new().unwrap();
    let strategies = vec![
        strategy(StrategyKind::Pako, "pako"),
        strategy(StrategyKind::Uzip, "pako-9"),
    ];
    let corpus = Corpus::from_payloads([
        Payload::new("9-x.json", json_doc(20)),
        Payload::new("x.json", json_doc(60)),
    ]);

    let orchestrator = Orchestrator::new(
        registry(&strategies),
        Arc::new(FakeBundler::default()),
        Arc::new(FakeEngine::new(&strategies)),
        &config(),
        RunOptions::default(),
    )
    .unwrap();
    let results = orchestrator
        .run(&corpus, &temp.path().join("out"))
        .await
        .unwrap();

    assert_eq!(results.pair_count(), 4);
    assert!(!results.has_failures());

    let mut artifacts: Vec<_> = results
        .rows()
        .map(|(_, row)| row.outcome.record().unwrap().artifact_path.clone())
        .collect();
    artifacts.sort();
    artifacts.dedup();
    assert_eq!(artifacts.len(), 4);

    for (payload, row) in results.rows() {
        let m = &row.outcome.record().unwrap().measurement;
        assert_eq!(m.raw_size, payload.raw_size());
    }
}
