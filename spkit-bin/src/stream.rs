// Copyright 2025 spkit developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Raw little-endian binary stream I/O shared by the tools.

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use byteorder::WriteBytesExt;

/// Reads the whole stream of f64 values from `path`, or standard input
/// when `path` is `None`.
pub fn read_doubles(path: Option<&str>) -> Result<Vec<f64>, String> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("{path}: {e}"))?;
            read_doubles_from(BufReader::new(file))
        }
        None => read_doubles_from(std::io::stdin().lock()),
    }
}

fn read_doubles_from<R: Read>(mut reader: R) -> Result<Vec<f64>, String> {
    let mut raw = vec![];
    reader.read_to_end(&mut raw).map_err(|e| e.to_string())?;
    if raw.len() % 8 != 0 {
        return Err(format!(
            "stream size {} is not a multiple of the f64 size",
            raw.len()
        ));
    }
    Ok(raw.chunks_exact(8).map(LittleEndian::read_f64).collect())
}

/// Writes f64 values to standard output.
pub fn write_doubles(values: &[f64]) -> Result<(), String> {
    let stdout = std::io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    for &value in values {
        writer
            .write_f64::<LittleEndian>(value)
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

/// Writes codebook or path indices to standard output as i32 values.
pub fn write_indices(indices: &[usize]) -> Result<(), String> {
    let stdout = std::io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    for &index in indices {
        writer
            .write_i32::<LittleEndian>(index as i32)
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

/// Splits a flat stream into vectors of `length` values.
///
/// Fails when the stream is empty or does not tile exactly.
pub fn into_vectors(data: Vec<f64>, length: usize) -> Result<Vec<Vec<f64>>, String> {
    if length == 0 {
        return Err("vector length must be positive".to_owned());
    }
    if data.is_empty() || data.len() % length != 0 {
        return Err(format!(
            "input size {} is not a multiple of the vector length {length}",
            data.len()
        ));
    }
    Ok(data.chunks_exact(length).map(<[f64]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_splitting_checks_the_tiling() {
        let vectors = into_vectors(vec![1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(into_vectors(vec![1.0, 2.0, 3.0], 2).is_err());
        assert!(into_vectors(vec![], 2).is_err());
    }

    #[test]
    fn double_stream_roundtrip() {
        let mut raw = vec![];
        for &x in &[0.25f64, -1.5, 3.0] {
            raw.extend_from_slice(&x.to_le_bytes());
        }
        let values = read_doubles_from(&raw[..]).unwrap();
        assert_eq!(values, vec![0.25, -1.5, 3.0]);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let raw = [0u8; 12];
        assert!(read_doubles_from(&raw[..]).is_err());
    }
}
