//! End-to-end pipeline scenarios against the public crate surface.

use chrono::NaiveDate;
use energy_insights::application::pipeline::AnalyticsPipeline;
use energy_insights::config::PipelineConfig;
use energy_insights::domain::types::{AnomalyLabel, Reading, Recommendation};
use energy_insights::infrastructure::csv_io::{read_readings, write_annotated};

fn reading(day: u32, hour: u32, usage: f64) -> Reading {
    Reading {
        timestamp: NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap(),
        usage_kwh: usage,
    }
}

/// A quiet 10-day series with one reading ten times the rest.
fn spiked_dataset() -> Vec<Reading> {
    let mut readings: Vec<Reading> = (1..=10)
        .map(|day| reading(day, 8 + (day % 4), 10.0 + day as f64))
        .collect();
    readings[6].usage_kwh = 120.0;
    readings
}

#[test]
fn test_single_spike_is_the_only_anomaly() {
    let config = PipelineConfig {
        contamination: 0.1,
        ..PipelineConfig::default()
    };
    let output = AnalyticsPipeline::new(config).run(&spiked_dataset()).unwrap();

    assert_eq!(output.metrics.anomaly_count, 1);
    for row in &output.rows {
        if row.feature.usage_kwh == 120.0 {
            assert_eq!(row.anomaly, AnomalyLabel::Anomaly);
            assert_eq!(row.recommendation, Recommendation::TurnOffIdleMachines);
        } else {
            assert_eq!(row.anomaly, AnomalyLabel::Normal);
            assert_eq!(row.recommendation, Recommendation::AllGood);
        }
    }
    let predicted = output
        .rows
        .iter()
        .filter(|r| r.predicted_usage.is_some())
        .count();
    assert_eq!(predicted, 2);
}

#[test]
fn test_csv_in_pipeline_csv_out_round_trip() {
    let csv_input = "Date,Energy_Usage_kWh\n\
                     2024-05-01T00:00:00,40\n\
                     2024-05-02T00:00:00,45\n\
                     2024-05-03T00:00:00,50\n\
                     2024-05-04T00:00:00,55\n\
                     2024-05-05T00:00:00,60\n\
                     2024-05-06T00:00:00,65\n\
                     2024-05-07T00:00:00,70\n\
                     2024-05-08T00:00:00,110\n\
                     2024-05-09T00:00:00,75\n\
                     2024-05-10T00:00:00,80\n";
    let readings = read_readings(csv_input.as_bytes()).unwrap();
    let output = AnalyticsPipeline::new(PipelineConfig::default())
        .run(&readings)
        .unwrap();

    let mut buffer = Vec::new();
    write_annotated(&mut buffer, &output.rows).unwrap();

    let mut rdr = csv::Reader::from_reader(buffer.as_slice());
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "Date",
            "Energy_Usage_kWh",
            "RollingMean",
            "Recommendation",
            "Anomaly",
            "PredictedUsage"
        ]
    );

    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), output.rows.len());
    for (record, row) in records.iter().zip(&output.rows) {
        assert_eq!(
            record[0],
            row.feature.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
        );
        assert_eq!(record[1].parse::<f64>().unwrap(), row.feature.usage_kwh);
        assert_eq!(record[2].parse::<f64>().unwrap(), row.feature.rolling_mean);
        assert_eq!(record[3].parse::<Recommendation>().unwrap(), row.recommendation);
        assert_eq!(record[4].parse::<AnomalyLabel>().unwrap(), row.anomaly);
        match row.predicted_usage {
            Some(p) => assert_eq!(record[5].parse::<f64>().unwrap(), p),
            None => assert!(record[5].is_empty()),
        }
    }
}

#[test]
fn test_missing_usage_column_fails_before_any_model() {
    let csv_input = "Date,Power_Draw\n2024-05-01,40\n2024-05-02,45\n";
    let err = read_readings(csv_input.as_bytes()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Energy_Usage_kWh"));
}

#[test]
fn test_unsorted_input_is_annotated_in_timestamp_order() {
    let mut readings = spiked_dataset();
    readings.reverse();
    let config = PipelineConfig {
        contamination: 0.1,
        ..PipelineConfig::default()
    };
    let output = AnalyticsPipeline::new(config).run(&readings).unwrap();
    assert!(
        output
            .rows
            .windows(2)
            .all(|w| w[0].feature.timestamp <= w[1].feature.timestamp)
    );
}

#[test]
fn test_identical_invocations_are_identical() {
    let readings = spiked_dataset();
    let pipeline = AnalyticsPipeline::new(PipelineConfig::default());
    let first = pipeline.run(&readings).unwrap();
    let second = pipeline.run(&readings).unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_four_rows_too_few_for_forecast() {
    let readings: Vec<Reading> = (1..=4).map(|d| reading(d, 8, 20.0)).collect();
    let err = AnalyticsPipeline::new(PipelineConfig::default())
        .run(&readings)
        .unwrap_err();
    assert!(err.is_validation());
}
