//! Welch files on disk: write, reopen, analyze.

use std::fs;

use cadence_welch::{
    bias_test_statistic, cumulative_averages, welch_averages, write_welch_plot_csv, Bias,
    WelchError, WelchPaths, WelchReader, WelchWriter,
};

fn write_runs(paths: &WelchPaths, runs: &[&[f64]]) {
    let mut w = WelchWriter::create(paths).unwrap();
    for run in runs {
        for &x in *run {
            w.write_observation(x).unwrap();
        }
        w.end_replication(0.5);
    }
    w.finish(paths).unwrap();
}

#[test]
fn three_replications_average_to_four() {
    let dir = tempfile::tempdir().unwrap();
    let paths = WelchPaths::new(dir.path(), "wip");
    write_runs(&paths, &[&[2.0, 4.0, 6.0], &[4.0, 4.0, 4.0], &[6.0, 4.0, 2.0]]);

    let metadata = fs::read_to_string(&paths.metadata).unwrap();
    assert_eq!(metadata, "3\n3,0.5,4\n3,0.5,4\n3,0.5,4\n");
    assert_eq!(fs::metadata(&paths.data).unwrap().len(), 9 * 8);

    let mut reader = WelchReader::open(&paths).unwrap();
    let welch = welch_averages(&mut reader).unwrap();
    assert_eq!(welch[0], 4.0);
    assert_eq!(cumulative_averages(&welch)[0], welch[0]);
    assert_eq!(reader.observation(3, 3).unwrap(), 2.0);
}

#[test]
fn unequal_replications_use_the_shortest() {
    let dir = tempfile::tempdir().unwrap();
    let paths = WelchPaths::new(dir.path(), "queue");
    write_runs(&paths, &[&[1.0, 2.0, 3.0, 4.0, 5.0], &[3.0, 4.0, 5.0]]);

    let mut reader = WelchReader::open(&paths).unwrap();
    assert_eq!(reader.metadata().min_count(), 3);
    assert_eq!(welch_averages(&mut reader).unwrap(), vec![2.0, 3.0, 4.0]);
    assert_eq!(reader.replication(1).unwrap().len(), 5);
}

#[test]
fn plot_csv_and_bias_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = WelchPaths::new(dir.path(), "level");
    let climbing: Vec<f64> = (0..40).map(|i| (f64::from(i) / 4.0).min(3.0)).collect();
    write_runs(&paths, &[climbing.as_slice(), climbing.as_slice()]);

    let mut reader = WelchReader::open(&paths).unwrap();
    let welch = welch_averages(&mut reader).unwrap();
    assert_eq!(welch, climbing);

    let plot = dir.path().join("level_plot.csv");
    write_welch_plot_csv(fs::File::create(&plot).unwrap(), &welch).unwrap();
    let text = fs::read_to_string(&plot).unwrap();
    assert_eq!(text.lines().count(), 41);
    assert!(text.starts_with("Observation,WelchAverage,CumulativeAverage\n1,0,0\n"));

    assert!(bias_test_statistic(&welch, Bias::Positive).is_nan());
}

#[test]
fn missing_or_corrupt_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let paths = WelchPaths::new(dir.path(), "none");
    assert!(matches!(WelchReader::open(&paths), Err(WelchError::Io(_))));

    fs::write(&paths.metadata, "2\n1,1,1\n").unwrap();
    fs::write(&paths.data, [0u8; 8]).unwrap();
    assert!(matches!(
        WelchReader::open(&paths),
        Err(WelchError::MalformedMetadata { line: 1, .. })
    ));
}
