//! MNIST IDX record streams and the record-to-matrix encoding consumed by the network.
use crate::matrix::{Element, Matrix};
use anyhow::{anyhow, Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Magic number of an IDX file holding unsigned-byte images.
pub const IMAGE_MAGIC: i32 = 2051;
/// Magic number of an IDX file holding unsigned-byte labels.
pub const LABEL_MAGIC: i32 = 2049;
/// Digits 0 through 9.
pub const NUM_CLASSES: usize = 10;

/// Part of the MNIST distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn prefix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "t10k",
        }
    }
}

/// Offset window over a record stream: skip `skip` records, then read `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetWindow {
    pub skip: usize,
    pub count: usize,
}

impl DatasetWindow {
    pub fn new(skip: usize, count: usize) -> Self {
        Self { skip, count }
    }

    /// The first `count` records.
    pub fn first(count: usize) -> Self {
        Self { skip: 0, count }
    }
}

/// Decoded samples: pixel columns, one-hot targets and the raw labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    pub inputs: Vec<Matrix<T>>,
    pub targets: Vec<Matrix<T>>,
    pub labels: Vec<u8>,
}

impl<T: Element> Dataset<T> {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            inputs: Vec::with_capacity(n),
            targets: Vec::with_capacity(n),
            labels: Vec::with_capacity(n),
        }
    }

    /// Encodes one raw record and appends it. Fails if `label` has no class.
    pub fn push_record(&mut self, pixels: &[u8], label: u8, classes: usize) -> Result<()> {
        if label as usize >= classes {
            return Err(anyhow!("label {} outside of {} classes", label, classes));
        }
        self.inputs.push(encode_image(pixels));
        self.targets.push(one_hot(label as usize, classes));
        self.labels.push(label);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Pixel column with intensities `pixel / 256`, in `[0, 1)`.
pub fn encode_image<T: Element>(pixels: &[u8]) -> Matrix<T> {
    Matrix::column(
        pixels
            .iter()
            .map(|&p| T::from_f64(p as f64 / 256.0))
            .collect(),
    )
}

/// One-hot column of height `classes` with a 1 at `label`. Panics if `label >= classes`.
pub fn one_hot<T: Element>(label: usize, classes: usize) -> Matrix<T> {
    assert!(label < classes, "label {} outside of {} classes", label, classes);
    let mut v = Matrix::new(classes, 1);
    v[(label, 0)] = T::one();
    v
}

/// Sequential reader over the records of one IDX file.
#[derive(Debug)]
pub struct IdxReader<R> {
    reader: R,
    count: usize,
    record_len: usize,
    position: usize,
}

impl<R: Read> IdxReader<R> {
    /// Image stream: header is magic, count, rows, cols.
    pub fn images(mut reader: R) -> Result<Self> {
        let magic = reader.read_i32::<BigEndian>().context("read image magic")?;
        if magic != IMAGE_MAGIC {
            return Err(anyhow!("invalid image file magic: {}", magic));
        }
        let count = read_dimension(&mut reader, "image count")?;
        let rows = read_dimension(&mut reader, "row count")?;
        let cols = read_dimension(&mut reader, "column count")?;
        let record_len = rows
            .checked_mul(cols)
            .ok_or_else(|| anyhow!("image size {}x{} is too large", rows, cols))?;
        Ok(Self {
            reader,
            count,
            record_len,
            position: 0,
        })
    }

    /// Label stream: header is magic, count.
    pub fn labels(mut reader: R) -> Result<Self> {
        let magic = reader.read_i32::<BigEndian>().context("read label magic")?;
        if magic != LABEL_MAGIC {
            return Err(anyhow!("invalid label file magic: {}", magic));
        }
        let count = read_dimension(&mut reader, "label count")?;
        Ok(Self {
            reader,
            count,
            record_len: 1,
            position: 0,
        })
    }

    /// Number of records announced by the header.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Bytes per record.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// Records not consumed yet.
    pub fn remaining(&self) -> usize {
        self.count - self.position
    }

    /// Discards the next `n` records.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(anyhow!(
                "cannot skip {} records, only {} left",
                n,
                self.remaining()
            ));
        }
        let bytes = n
            .checked_mul(self.record_len)
            .ok_or_else(|| anyhow!("cannot skip {} records of {} bytes", n, self.record_len))?
            as u64;
        let skipped = io::copy(&mut (&mut self.reader).take(bytes), &mut io::sink())?;
        if skipped != bytes {
            return Err(anyhow!("file truncated while skipping {} records", n));
        }
        self.position += n;
        Ok(())
    }

    /// Reads the next record into `buf`, which must be `record_len()` long.
    pub fn read_record(&mut self, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), self.record_len, "record buffer has the wrong length");
        if self.remaining() == 0 {
            return Err(anyhow!("no record left after {}", self.position));
        }
        self.reader
            .read_exact(buf)
            .with_context(|| format!("file truncated at record {}", self.position))?;
        self.position += 1;
        Ok(())
    }
}

fn read_dimension<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let value = reader
        .read_i32::<BigEndian>()
        .with_context(|| format!("read {}", what))?;
    usize::try_from(value).map_err(|_| anyhow!("negative {}: {}", what, value))
}

/// Decodes `window` from parallel image and label streams.
///
/// Nothing is returned unless every requested record was read.
pub fn load_window<T: Element, I: Read, L: Read>(
    images: I,
    labels: L,
    window: DatasetWindow,
    classes: usize,
) -> Result<Dataset<T>> {
    let mut images = IdxReader::images(images)?;
    let mut labels = IdxReader::labels(labels)?;
    if images.count() != labels.count() {
        return Err(anyhow!(
            "{} images but {} labels",
            images.count(),
            labels.count()
        ));
    }
    let end = window.skip.checked_add(window.count);
    if end.map_or(true, |end| end > images.count()) {
        return Err(anyhow!(
            "window skip {} count {} exceeds the {} available records",
            window.skip,
            window.count,
            images.count()
        ));
    }
    images.skip(window.skip)?;
    labels.skip(window.skip)?;

    let mut dataset = Dataset::with_capacity(window.count);
    let mut pixels = vec![0u8; images.record_len()];
    let mut label = [0u8; 1];
    for _ in 0..window.count {
        images.read_record(&mut pixels)?;
        labels.read_record(&mut label)?;
        dataset.push_record(&pixels, label[0], classes)?;
    }
    debug!(
        "decoded {} records after skipping {}",
        dataset.len(),
        window.skip
    );
    Ok(dataset)
}

/// Opens an IDX file, decompressing it when the name ends in `.gz`.
pub fn open_idx(path: &Path) -> Result<Box<dyn Read>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    if path.extension().map_or(false, |e| e == "gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Locates the image and label files of `split` inside `dir`.
///
/// Accepts `train-images.idx3-ubyte` and `train-images-idx3-ubyte`, each
/// optionally gzip-compressed.
pub fn find_idx_files(dir: &Path, split: Split) -> Result<(PathBuf, PathBuf)> {
    let find = |kind: &str, idx: &str| -> Result<PathBuf> {
        let stem = format!("{}-{}", split.prefix(), kind);
        [
            format!("{}.{}-ubyte", stem, idx),
            format!("{}-{}-ubyte", stem, idx),
            format!("{}.{}-ubyte.gz", stem, idx),
            format!("{}-{}-ubyte.gz", stem, idx),
        ]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow!("no {} file for {} in {}", kind, stem, dir.display()))
    };
    Ok((find("images", "idx3")?, find("labels", "idx1")?))
}

/// Loads a window of the MNIST `split` stored in `dir`.
pub fn load_mnist<T: Element>(dir: &Path, split: Split, window: DatasetWindow) -> Result<Dataset<T>> {
    let (image_path, label_path) = find_idx_files(dir, split)?;
    debug!(
        "reading {} and {}",
        image_path.display(),
        label_path.display()
    );
    load_window(
        open_idx(&image_path)?,
        open_idx(&label_path)?,
        window,
        NUM_CLASSES,
    )
    .with_context(|| format!("loading {:?} window from {}", window, dir.display()))
}
