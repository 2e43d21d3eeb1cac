// IDX files on disk: windows, gzip input and a full train/test/guess cycle.

use byteorder::{BigEndian, WriteBytesExt};
use digit_scanner::datasets::{self, Split};
use digit_scanner::training::TrainingOptions;
use digit_scanner::{load_mnist, one_hot, Dataset, DatasetWindow, DigitScanner, Fnn, Matrix};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

const SIDE: usize = 4;

/// Digit `d` lights pixel `d` of a 4x4 image.
fn image_of(label: u8) -> Vec<u8> {
    let mut pixels = vec![0u8; SIDE * SIDE];
    pixels[label as usize] = 255;
    pixels
}

fn idx_files(labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut images = Vec::new();
    images.write_i32::<BigEndian>(2051).unwrap();
    images.write_i32::<BigEndian>(labels.len() as i32).unwrap();
    images.write_i32::<BigEndian>(SIDE as i32).unwrap();
    images.write_i32::<BigEndian>(SIDE as i32).unwrap();
    for &l in labels {
        images.extend(image_of(l));
    }
    let mut label_file = Vec::new();
    label_file.write_i32::<BigEndian>(2049).unwrap();
    label_file.write_i32::<BigEndian>(labels.len() as i32).unwrap();
    label_file.extend_from_slice(labels);
    (images, label_file)
}

fn write_plain(path: &Path, bytes: &[u8]) {
    File::create(path).unwrap().write_all(bytes).unwrap();
}

fn write_gz(path: &Path, bytes: &[u8]) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap();
}

fn cycle(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 10) as u8).collect()
}

fn mnist_dir(train: usize, test: usize) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let (images, labels) = idx_files(&cycle(train));
    write_gz(&dir.path().join("train-images-idx3-ubyte.gz"), &images);
    write_plain(&dir.path().join("train-labels-idx1-ubyte"), &labels);
    let (images, labels) = idx_files(&cycle(test));
    write_plain(&dir.path().join("t10k-images.idx3-ubyte"), &images);
    write_gz(&dir.path().join("t10k-labels.idx1-ubyte.gz"), &labels);
    dir
}

#[test]
fn window_selects_records_after_skip() {
    let dir = mnist_dir(30, 10);
    let data: Dataset<f64> = load_mnist(dir.path(), Split::Train, DatasetWindow::new(3, 5)).unwrap();

    assert_eq!(data.len(), 5);
    assert_eq!(data.labels, vec![3, 4, 5, 6, 7]);
    assert_eq!(data.targets[0], one_hot(3, 10));
    assert_eq!(data.inputs[0].shape(), (SIDE * SIDE, 1));
    assert_eq!(data.inputs[0][(3, 0)], 255.0 / 256.0);
    assert_eq!(data.inputs[0][(0, 0)], 0.0);
}

#[test]
fn window_past_the_end_is_an_error() {
    let dir = mnist_dir(30, 10);
    let result = load_mnist::<f32>(dir.path(), Split::Test, DatasetWindow::new(8, 5));
    assert!(result.is_err());
    assert!(load_mnist::<f32>(dir.path(), Split::Test, DatasetWindow::new(5, 5)).is_ok());
}

#[test]
fn missing_split_is_reported() {
    let dir = tempdir().unwrap();
    let err = datasets::find_idx_files(dir.path(), Split::Train).unwrap_err();
    assert!(err.to_string().contains("train-images"));
}

#[test]
fn one_hot_of_seven() {
    let v: Matrix<f64> = one_hot(7, 10);
    let expected: Vec<f64> = (0..10).map(|i| if i == 7 { 1.0 } else { 0.0 }).collect();
    assert_eq!(v.as_slice(), expected.as_slice());
}

#[test]
fn scanner_trains_tests_and_guesses_from_files() {
    let dir = mnist_dir(50, 20);
    let fnn = Fnn::<f64>::with_seed(&[SIDE * SIDE, 16, 10], 17).unwrap();
    let mut scanner = DigitScanner::with_network(fnn, 2).unwrap();
    let options = TrainingOptions {
        epochs: 100,
        batch_size: 5,
        eta: 2.0,
        alpha: 0.0,
        track_loss: true,
    };

    let report = scanner.train(dir.path(), DatasetWindow::first(50), &options).unwrap();
    assert_eq!(report.epochs.len(), 100);
    assert!(report.final_loss().unwrap() < report.epochs[0].loss.unwrap());

    let result = scanner.test(dir.path(), DatasetWindow::first(20)).unwrap();
    assert_eq!(result.total, 20);
    assert!(result.percent() >= 90.0, "accuracy {}", result);

    let model = dir.path().join("scanner.txt.gz");
    scanner.save(&model).unwrap();
    let reopened = DigitScanner::<f64>::open(&model, 1).unwrap();
    let probe = datasets::encode_image::<f64>(&image_of(4));
    assert_eq!(reopened.guess(&probe).unwrap(), scanner.guess(&probe).unwrap());
}
