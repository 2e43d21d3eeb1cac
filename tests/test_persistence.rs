// Saved networks reload with the same layout, parameters and predictions.

use approx::assert_relative_eq;
use digit_scanner::{model_io, Fnn, Matrix};
use std::fs;
use tempfile::tempdir;

fn probe() -> Matrix<f64> {
    Matrix::column(vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.1])
}

#[test]
fn text_model_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("net.txt");
    let fnn = Fnn::<f64>::with_seed(&[6, 5, 4, 3], 21).unwrap();

    model_io::save(&fnn, &path).unwrap();
    let loaded: Fnn<f64> = model_io::load(&path).unwrap();

    assert_eq!(loaded.layer_sizes(), vec![6, 5, 4, 3]);
    let (a, b) = (fnn.feedforward(&probe()), loaded.feedforward(&probe()));
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

#[test]
fn gzip_model_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("net.txt.gz");
    let fnn = Fnn::<f64>::with_seed(&[6, 3], 4).unwrap();

    model_io::save(&fnn, &path).unwrap();
    let raw = fs::read(&path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let loaded: Fnn<f64> = model_io::load(&path).unwrap();
    assert_eq!(loaded.feedforward(&probe()), fnn.feedforward(&probe()));
}

#[test]
fn text_file_starts_with_layer_count_and_sizes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("net.txt");
    model_io::save(&Fnn::<f32>::zeroed(&[4, 3, 2]).unwrap(), &path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("3"));
    assert_eq!(lines.next().map(str::trim_end), Some("4 3 2"));
    // 3 weight rows and a bias line, then 2 weight rows and a bias line
    assert_eq!(lines.count(), 4 + 3);
}

#[test]
fn missing_and_corrupt_files_are_errors() {
    let dir = tempdir().unwrap();
    assert!(model_io::load::<f64, _>(dir.path().join("absent.txt")).is_err());

    let path = dir.path().join("bad.txt");
    fs::write(&path, "2\n3 2 \n0.1 0.2\n").unwrap();
    assert!(model_io::load::<f64, _>(&path).is_err());
}
