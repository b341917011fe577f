use polars::prelude::*;
use spend_analytics::io::{
    load_csv, load_partitioned_parquet, write_report_csv, ColumnMapping,
};
use spend_analytics::{ConcentrationEngine, ConcentrationLevel, Grouping};
use std::fs;
use std::path::PathBuf;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spend_analytics_{}_{}", name, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn csv_load_analyze_export_roundtrip() {
    let dir = test_dir("csv");
    let input = dir.join("contracts_sample.csv");

    // DOT: A=$600, B=$300, C=$100 over 6 rows, plus rows the filter policy
    // must drop (missing vendor, zero amount).
    fs::write(
        &input,
        "vendor_name,organization,fiscal_year_begin,dollars_spent_to_date\n\
         A,DOT,2023-07-01,300.0\n\
         A,DOT,2023-07-01,300.0\n\
         B,DOT,2023-07-01,150.0\n\
         B,DOT,2023-07-01,150.0\n\
         C,DOT,2023-07-01,50.0\n\
         C,DOT,2023-07-01,50.0\n\
         ,DOT,2023-07-01,999.0\n\
         D,DOT,2023-07-01,0.0\n",
    )
    .unwrap();

    let records = load_csv(&input, &ColumnMapping::default()).unwrap();
    assert_eq!(records.len(), 8);
    // Date-typed fiscal_year_begin collapses to its calendar year.
    assert_eq!(records[0].fiscal_period.as_deref(), Some("2023"));

    let engine = ConcentrationEngine::with_defaults(Grouping::OrganizationPeriod);
    let report = engine.analyze(records).unwrap();

    assert_eq!(report.filter_stats.records_seen, 8);
    assert_eq!(report.filter_stats.missing_vendor, 1);
    assert_eq!(report.filter_stats.non_positive_amount, 1);
    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.group_key.organization, "DOT");
    assert_eq!(entry.group_key.fiscal_period.as_deref(), Some("2023"));
    assert!((entry.hhi - 0.46).abs() < 1e-9);
    assert_eq!(
        entry.concentration_level,
        ConcentrationLevel::HighlyConcentrated
    );

    let output = dir.join("output/hhi_results.csv");
    write_report_csv(&report, &output).unwrap();

    let exported = LazyCsvReader::new(&output)
        .with_infer_schema_length(Some(100))
        .finish()
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(exported.height(), 1);
    let hhi = exported
        .column("hhi")
        .unwrap()
        .get(0)
        .unwrap()
        .try_extract::<f64>()
        .unwrap();
    assert!((hhi - 0.46).abs() < 1e-9);
    let level = exported
        .column("concentration_level")
        .unwrap()
        .get(0)
        .unwrap()
        .to_string();
    assert!(level.contains("HighlyConcentrated"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn partitioned_parquet_layer_loads_across_partitions() {
    let dir = test_dir("parquet");
    let layer = dir.join("silver/contracts/version=v0.3.0");

    let partitions = vec![
        (
            "part-0",
            df! [
                "vendor_name" => ["A", "A", "B"],
                "organization" => ["DOT", "DOT", "DOT"],
                "fiscal_year_begin" => [2023i64, 2023, 2023],
                "dollars_spent_to_date" => [300.0, 300.0, 150.0]
            ]
            .unwrap(),
        ),
        (
            "part-1",
            df! [
                "vendor_name" => ["B", "C", "C"],
                "organization" => ["DOT", "DOT", "DOT"],
                "fiscal_year_begin" => [2023i64, 2023, 2023],
                "dollars_spent_to_date" => [150.0, 50.0, 50.0]
            ]
            .unwrap(),
        ),
    ];
    for (name, mut frame) in partitions {
        let part_dir = layer.join(name);
        fs::create_dir_all(&part_dir).unwrap();
        let mut file = fs::File::create(part_dir.join("data.parquet")).unwrap();
        ParquetWriter::new(&mut file).finish(&mut frame).unwrap();
    }

    let pattern = format!("{}/*/data.parquet", layer.display());
    let records = load_partitioned_parquet(&pattern, &ColumnMapping::default()).unwrap();
    assert_eq!(records.len(), 6);

    let engine = ConcentrationEngine::with_defaults(Grouping::Organization);
    let report = engine.analyze(records).unwrap();
    assert_eq!(report.entries.len(), 1);
    assert!((report.entries[0].hhi - 0.46).abs() < 1e-9);
    assert_eq!(report.entries[0].unique_vendors, 3);

    fs::remove_dir_all(&dir).unwrap();
}
