use std::fs;

use anyhow::Result;
use kgx_logs::{aggregate_folder, out_files, LogError, MetricsTable};

const RUN_0: &str = "\
Training started
------Test Results for wn18_rr: Epoch: 0 --- time: 3.1------------
--mr,  filtered mr             : 7412.5000, 7399.0000
--mrr, filtered mrr            : 0.0012, 0.0013
--hits10                       : 0.0030
--filtered hits10              : 0.0031
---------------------------------------------------------
------Test Results for wn18_rr: Epoch: 10 --- time: 3.0------------
--mr,  filtered mr             : 5120.0000, 5001.2500
--hits10                       : 0.2000
---------------------------------------------------------
";

const RUN_1: &str = "\
------Test Results for wn18_rr: Epoch: 0 --- time: 2.9------------
--hits10                       : 0.0100
---------------------------------------------------------
Stop the training
";

#[test]
fn aggregates_runs_with_their_configs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("TransE_wn18_rr_0.out"), RUN_0)?;
    fs::write(
        dir.path().join("TransE_wn18_rr_0.json"),
        r#"{"model_name": "TransE", "learning_rate": 1e-06, "l1_flag": true}"#,
    )?;
    fs::write(dir.path().join("TransE_wn18_rr_1.out"), RUN_1)?;
    fs::write(
        dir.path().join("TransE_wn18_rr_1.json"),
        r#"{"model_name": "TransE", "learning_rate": 0.1, "l1_flag": false}"#,
    )?;
    fs::write(dir.path().join("notes.txt"), "ignored")?;

    let (output, rows) = aggregate_folder(dir.path(), None)?;
    assert_eq!(output, dir.path().join("aggregated.csv"));
    assert_eq!(rows, 3);

    let csv = fs::read_to_string(&output)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "file,epoch,hits10,hits10_filtered,mr,mr_filtered,mrr,mrr_filtered,l1_flag,learning_rate,model_name"
    );
    assert_eq!(
        lines[1],
        "TransE_wn18_rr_0,0,0.003,0.0031,7412.5,7399,0.0012,0.0013,True,1e-06,TransE"
    );
    assert_eq!(lines[2], "TransE_wn18_rr_0,10,0.2,,5120,5001.25,,,True,1e-06,TransE");
    assert_eq!(lines[3], "TransE_wn18_rr_1,0,0.01,,,,,,False,0.1,TransE");
    Ok(())
}

#[test]
fn out_files_are_sorted_and_filtered() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for name in ["b.out", "a.out", "a.json", "c.log"] {
        fs::write(dir.path().join(name), "")?;
    }
    let names: Vec<String> = out_files(dir.path())?
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.out", "b.out"]);
    Ok(())
}

#[test]
fn missing_config_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("run.out"), RUN_1)?;

    let err = MetricsTable::from_folder(dir.path()).unwrap_err();
    match err {
        LogError::Io { path, .. } => assert_eq!(path, dir.path().join("run.json")),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn explicit_output_path_is_used() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("metrics.csv");
    let (written, rows) = aggregate_folder(dir.path(), Some(&out))?;
    assert_eq!(written, out);
    assert_eq!(rows, 0);
    assert_eq!(fs::read_to_string(&out)?, "file,epoch\n");
    Ok(())
}
