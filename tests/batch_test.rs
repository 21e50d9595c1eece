mod common;

use std::{sync::Arc, time::Duration};

use common::{
    coord, init_logger, mock_locator, mock_sky, BETELGEUSE, BETELGEUSE_TIC, BROKEN_FIELD,
    FIELD_A, SLOW_QUERY,
};
use tesscope::{
    batch::{process_batch, read_rows, sort_by_row, AggregateRecord},
    config::PipelineConfig,
    export::write_batch_csv,
    locator::SectorLocator,
    tesscope_errors::TesscopeError,
    validation::MSG_NON_POSITIVE_RADIUS,
};

fn sorted_key(records: &[AggregateRecord]) -> Vec<(usize, u32, u8, String)> {
    let mut keys: Vec<_> = records
        .iter()
        .map(|r| {
            (
                r.row_index,
                r.sector.window_number,
                r.sector.channel,
                r.sector.observed_at.clone(),
            )
        })
        .collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_round_trip_scenario() {
    init_logger();
    let (footprint, catalog) = mock_sky();
    let rows = read_rows("10.0 20.0\n88.7929583 7.4070639\n".as_bytes()).unwrap();

    let records = process_batch(Arc::new(footprint), Arc::new(catalog), rows, 0.2, 4)
        .await
        .unwrap();

    assert_eq!(records.len(), 5);
    for record in &records {
        let position = (record.ra, record.dec);
        assert!(position == FIELD_A || position == BETELGEUSE);
        assert_eq!(
            record.sector.cycle,
            (record.sector.window_number - 1) / 13 + 1
        );
    }
}

#[tokio::test]
async fn test_bad_rows_do_not_abort_the_batch() {
    init_logger();
    let input = format!(
        "10.0,20.0\n\
         {BETELGEUSE_TIC}\n\
         Betelgeuse\n\
         1,2,3\n\
         999\n\
         Unknown Star\n\
         {},{}\n\
         abc,20\n",
        BROKEN_FIELD.0, BROKEN_FIELD.1
    );
    let locator = mock_locator(PipelineConfig::default().with_batch_concurrency(3));

    let report = locator
        .process_batch_with_radius(input.as_bytes(), 0.2)
        .await
        .unwrap();

    assert_eq!(report.rows, 8);
    // rows 0, 1, 2 are valid: 2 + 3 + 3 records
    assert_eq!(report.records.len(), 8);
    let mut valid_rows: Vec<usize> = report.records.iter().map(|r| r.row_index).collect();
    valid_rows.sort();
    valid_rows.dedup();
    assert_eq!(valid_rows, vec![0, 1, 2]);

    let mut failed: Vec<usize> = report.failures.iter().map(|f| f.row_index).collect();
    failed.sort();
    assert_eq!(failed, vec![3, 4, 5, 6, 7]);

    // catalog and name rows are tagged with their resolved position
    assert!(report
        .records
        .iter()
        .filter(|r| r.row_index == 1 || r.row_index == 2)
        .all(|r| (r.ra, r.dec) == BETELGEUSE));
}

#[tokio::test]
async fn test_batch_is_idempotent() {
    let input = "10.0,20.0\n141914082\nBetelgeuse\n1,2,3\n";

    let first = mock_locator(PipelineConfig::default().with_batch_concurrency(4))
        .process_batch_with_radius(input.as_bytes(), 0.2)
        .await
        .unwrap();
    let second = mock_locator(PipelineConfig::default().with_batch_concurrency(1))
        .process_batch_with_radius(input.as_bytes(), 0.2)
        .await
        .unwrap();

    assert_eq!(sorted_key(&first.records), sorted_key(&second.records));
}

#[tokio::test]
async fn test_sort_by_row_restores_input_order() {
    let locator = mock_locator(PipelineConfig::default());
    let mut report = locator
        .process_batch_with_radius("88.7929583,7.4070639\n10.0,20.0\n".as_bytes(), 0.2)
        .await
        .unwrap();
    sort_by_row(&mut report.records);

    let windows: Vec<u32> = report
        .records
        .iter()
        .map(|r| r.sector.window_number)
        .collect();
    assert_eq!(windows, vec![6, 33, 43, 17, 57]);
}

#[tokio::test]
async fn test_batch_export() {
    let locator = mock_locator(PipelineConfig::default());
    let mut report = locator
        .process_batch_with_radius("10.0,20.0\n".as_bytes(), 0.2)
        .await
        .unwrap();
    sort_by_row(&mut report.records);

    let mut buffer = Vec::new();
    write_batch_csv(&mut buffer, &report.records).unwrap();
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "RA,Dec,Sector,Cycle,Camera,Observation Date\n\
         10,20,17,2,1,2019-10-08T03:30:00.000\n\
         ,,57,5,1,2022-09-30T18:55:00.000\n"
    );
}

#[tokio::test]
async fn test_batch_metadata_merged() {
    init_logger();
    let locator = mock_locator(PipelineConfig::default());
    let report = locator
        .process_batch_with_radius("10.0,20.0\n88.7929583,7.4070639\n".as_bytes(), 0.2)
        .await
        .unwrap();

    let metadata = locator.batch_metadata(&report.records).await;
    assert_eq!(metadata.star_name(), "All Targets");
    // one arcminute around each target: Betelgeuse + its close neighbour, Field A + neighbour
    assert_eq!(metadata.len(), 4);
    assert_eq!(metadata.temperature().len(), metadata.distance().len());
    // one region query per distinct target
    assert_eq!(locator.catalog().queries().len(), 2);
}

#[tokio::test]
async fn test_sky_map_targets() {
    let locator = mock_locator(PipelineConfig::default());

    let targets = locator
        .sky_map_targets("10.0,20.0\n141914082\nBetelgeuse\n".as_bytes())
        .await
        .unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[0].target_name, None);
    assert_eq!(targets[1].target_name.as_deref(), Some("TIC 141914082"));
    assert_eq!(targets[2].target_name.as_deref(), Some("Betelgeuse"));
    assert_eq!((targets[2].ra, targets[2].dec), BETELGEUSE);

    let strict = locator
        .sky_map_targets("10.0,20.0\n1,2,3\n".as_bytes())
        .await;
    assert!(matches!(strict, Err(TesscopeError::InvalidInput(_))));

    let unresolved = locator.sky_map_targets("999\n".as_bytes()).await;
    assert!(matches!(
        unresolved,
        Err(TesscopeError::UnresolvedCatalogId(_))
    ));
}

#[tokio::test]
async fn test_invalid_radius_fails_before_any_lookup() {
    init_logger();
    for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let locator = mock_locator(PipelineConfig::default());
        let result = locator
            .process_batch_with_radius("141914082\nBetelgeuse\n10.0,20.0\n".as_bytes(), radius)
            .await;

        assert_eq!(
            result.map(|report| report.records.len()),
            Err(TesscopeError::InvalidInput(MSG_NON_POSITIVE_RADIUS.into()))
        );
        assert!(locator.catalog().queries().is_empty());
        assert!(locator.footprint().queries().is_empty());
    }

    let (footprint, catalog) = mock_sky();
    let footprint = Arc::new(footprint);
    let rows = read_rows("Betelgeuse\n".as_bytes()).unwrap();
    let direct = process_batch(Arc::clone(&footprint), Arc::new(catalog), rows, -0.5, 2).await;
    assert!(matches!(direct, Err(TesscopeError::InvalidInput(_))));
    assert!(footprint.queries().is_empty());
}

#[tokio::test]
async fn test_failing_query_keeps_other_rows() {
    init_logger();
    let (mut footprint, catalog) = mock_sky();
    footprint.failing.push(coord(FIELD_A).to_string());
    let locator = SectorLocator::new(footprint, catalog, PipelineConfig::default());

    let report = locator
        .process_batch_with_radius("10.0,20.0\n88.7929583,7.4070639\nBetelgeuse\n".as_bytes(), 0.2)
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row_index, 0);
    assert!(report.failures[0].reason.contains("mock failure"));
    assert_eq!(report.records.len(), 6);
    assert!(report.records.iter().all(|r| r.row_index != 0));
}

#[tokio::test]
async fn test_row_timeout_keeps_other_rows() {
    init_logger();
    let (mut footprint, catalog) = mock_sky();
    footprint.slow.push(coord(FIELD_A).to_string());
    let config = PipelineConfig::default().with_row_timeout(Duration::from_millis(100));
    let locator = SectorLocator::new(footprint, catalog, config);

    let started = std::time::Instant::now();
    let report = locator
        .process_batch_with_radius("10.0,20.0\n88.7929583,7.4070639\n".as_bytes(), 0.2)
        .await
        .unwrap();

    assert!(started.elapsed() < SLOW_QUERY);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row_index, 0);
    assert!(report.failures[0].reason.contains("timed out"));
    assert_eq!(report.records.len(), 3);
    assert!(report.records.iter().all(|r| r.row_index == 1));
}
