//! Integration tests across the kgx crates
//!
//! These tests exercise the on-disk hand-offs between stages:
//! - normalized triple CSV → subgraph extraction → membership CSV
//! - grid configs (`.json`) → training logs (`.out`) → metrics table
//!
//! Run with: cargo test --test integration_tests

use std::fs;

use anyhow::Result;

// ============================================================================
// Subgraph extraction over files
// ============================================================================

#[test]
fn test_subgraphs_from_normalized_csv() -> Result<()> {
    use kgx_subgraph::{subgraphs, unique_pairs, ExtractConfig, TripleStore};

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("train.csv");
    fs::write(
        &input,
        "head,relation,tail\n\
         /m/a,/people/person/nationality,/m/b\n\
         /m/b,/location/country/capital,/m/c\n\
         /m/a,/people/person/place_of_birth,/m/b\n\
         /m/x,/film/film/genre,/m/y\n",
    )?;

    let store = TripleStore::load(&input, None)?;
    assert_eq!(store.len(), 4);

    let pairs = unique_pairs(&store);
    assert_eq!(pairs.len(), 3);

    let report = subgraphs(&store, &pairs, &ExtractConfig::with_sizes(1, 3))?;
    let output = dir.path().join("subgraphs.csv");
    report.write_rows(fs::File::create(&output)?)?;

    let csv = fs::read_to_string(&output)?;
    assert_eq!(
        csv,
        "head,tail,index\n\
         /m/a,/m/b,0\n\
         /m/a,/m/b,2\n\
         /m/b,/m/c,1\n\
         /m/x,/m/y,3\n"
    );
    Ok(())
}

#[test]
fn test_subgraph_rows_reference_original_triples() -> Result<()> {
    use kgx_subgraph::{subgraphs, ExtractConfig, Pair, Triple, TripleStore};

    let triples: Vec<Triple> = (0..20)
        .map(|i| Triple::new(format!("n{i}"), "next", format!("n{}", i + 1)))
        .collect();
    let store = TripleStore::from_triples(triples.clone())?;

    let pairs = vec![Pair::new("n0", "n6"), Pair::new("n3", "n4")];
    let report = subgraphs(&store, &pairs, &ExtractConfig::with_sizes(1, 10))?;

    for outcome in &report.outcomes {
        let found = outcome.result.as_ref().expect("no failures");
        assert!(found.is_found(), "{:?}", outcome.pair);
        for row in outcome.rows() {
            let triple = &triples[row.index as usize];
            assert_eq!(store.triple(row.index), Some(triple));
        }
    }
    // n0 -> ... -> n6 spans six edges, so the neighborhoods meet at 4 hops.
    assert_eq!(report.outcomes[0].result.as_ref().unwrap().size(), 4);
    assert_eq!(report.outcomes[1].result.as_ref().unwrap().size(), 1);
    Ok(())
}

// ============================================================================
// Grid → logs
// ============================================================================

#[test]
fn test_grid_configs_join_log_metrics() -> Result<()> {
    use kgx_grid::{write_experiment, GridSpec, ParamValue};
    use kgx_logs::MetricsTable;

    let dir = tempfile::tempdir()?;
    let summary = write_experiment(&GridSpec::default(), "DistMult", "fb15k_237", dir.path())?;
    assert_eq!(summary.runs, 243);

    let log = "\
------Test Results for fb15k_237: Epoch: 50 --- time: 9.0------------
--mrr, filtered mrr            : 0.1500, 0.2400
---------------------------------------------------------
";
    fs::write(summary.dir.join("DistMult_fb15k_237_7.out"), log)?;

    let table = MetricsTable::from_folder(&summary.dir)?;
    assert_eq!(table.runs.len(), 1);
    let run = &table.runs[0];
    assert_eq!(run.name, "DistMult_fb15k_237_7");
    assert_eq!(run.metrics.epochs[&50]["mrr_filtered"], 0.24);
    assert_eq!(run.config["model_name"], ParamValue::from("DistMult"));
    assert!(run.config.contains_key("lambda"));
    Ok(())
}
