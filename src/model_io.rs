//! Plain-text model persistence, optionally gzip-compressed.
//!
//! Layout, whitespace separated:
//!
//! ```text
//! 3
//! 784 30 10
//! <30 lines of 784 weights>
//! <30 biases>
//! <10 lines of 30 weights>
//! <10 biases>
//! ```
use crate::matrix::Element;
use crate::network::Fnn;
use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Writes the text encoding of `fnn`.
pub fn write_model<T: Element, W: Write>(fnn: &Fnn<T>, mut w: W) -> Result<()> {
    let sizes = fnn.layer_sizes();
    writeln!(w, "{}", sizes.len())?;
    for n in &sizes {
        write!(w, "{} ", n)?;
    }
    writeln!(w)?;
    for layer in fnn.fully_connected_layers() {
        let weights = layer.weights();
        for row in weights.as_slice().chunks(weights.cols()) {
            for v in row {
                write!(w, "{} ", v)?;
            }
            writeln!(w)?;
        }
        for v in layer.biases().as_slice() {
            write!(w, "{} ", v)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Parses the text encoding written by [`write_model`].
pub fn read_model<T: Element, R: Read>(mut r: R) -> Result<Fnn<T>> {
    let mut text = String::new();
    r.read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace();

    let nb_layers: usize = next_value(&mut tokens, "layer count")?;
    let sizes = (0..nb_layers)
        .map(|i| next_value(&mut tokens, &format!("node count of layer {}", i)))
        .collect::<Result<Vec<usize>>>()?;
    let mut fnn = Fnn::zeroed(&sizes)?;
    for i in 0..fnn.depth() {
        let layer = fnn
            .fully_connected_mut(i)
            .ok_or_else(|| anyhow!("missing fully-connected layer {}", i))?;
        for v in layer.weights_mut().as_mut_slice() {
            *v = next_value(&mut tokens, &format!("weight of layer {}", i))?;
        }
        for v in layer.biases_mut().as_mut_slice() {
            *v = next_value(&mut tokens, &format!("bias of layer {}", i))?;
        }
    }
    if let Some(extra) = tokens.next() {
        return Err(anyhow!("unexpected trailing data '{}'", extra));
    }
    Ok(fnn)
}

fn next_value<'a, V: FromStr, I: Iterator<Item = &'a str>>(tokens: &mut I, what: &str) -> Result<V> {
    let token = tokens
        .next()
        .ok_or_else(|| anyhow!("model truncated: missing {}", what))?;
    token
        .parse()
        .map_err(|_| anyhow!("invalid {}: '{}'", what, token))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "gz")
}

/// Saves `fnn` to `path`, gzip-compressed when the name ends in `.gz`.
pub fn save<T: Element, P: AsRef<Path>>(fnn: &Fnn<T>, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);
    if is_gzip(path) {
        let mut enc = GzEncoder::new(writer, Compression::default());
        write_model(fnn, &mut enc)?;
        enc.finish()?.flush()?;
    } else {
        let mut writer = writer;
        write_model(fnn, &mut writer)?;
        writer.flush()?;
    }
    info!("saved {} to {}", fnn, path.display());
    Ok(())
}

/// Loads a network saved by [`save`].
pub fn load<T: Element, P: AsRef<Path>>(path: P) -> Result<Fnn<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let parsed = if is_gzip(path) {
        read_model(GzDecoder::new(reader))
    } else {
        read_model(reader)
    };
    let fnn: Fnn<T> =
        parsed.with_context(|| format!("failed to load model from {}", path.display()))?;
    info!("loaded {} from {}", fnn, path.display());
    Ok(fnn)
}
