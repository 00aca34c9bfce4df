//! Read raw acquisition captures into a channels × samples matrix.
//!
//! Each file is a flat little-endian array of one element type, channel
//! interleaved within each sample (`s0c0 s0c1 ... s1c0 s1c1 ...`). Files of a
//! chunk are stacked along the sample axis in listing order.

use ndarray::{Array2, ArrayView2, Axis};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Element type stored in a capture file.
pub trait RawSample: Copy + Default + std::fmt::Debug + 'static {
    const SIZE: usize;
    const NAME: &'static str;

    fn from_le_slice(bytes: &[u8]) -> Self;
    fn append_le(self, out: &mut Vec<u8>);
    fn to_f64(self) -> f64;
}

impl RawSample for f32 {
    const SIZE: usize = 4;
    const NAME: &'static str = "float32";

    fn from_le_slice(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl RawSample for i8 {
    const SIZE: usize = 1;
    const NAME: &'static str = "int8";

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl RawSample for i16 {
    const SIZE: usize = 2;
    const NAME: &'static str = "int16";

    fn from_le_slice(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn append_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Concatenated stream of one chunk and the sample count of each file.
#[derive(Debug, Clone)]
pub struct StreamChunk<T> {
    pub data: Array2<T>,
    pub sample_counts: Vec<usize>,
    pub files: Vec<PathBuf>,
}

impl<T> StreamChunk<T> {
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }
}

/// Number of samples per channel in the capture at `path`, from its size alone.
pub fn samples_in_file<T: RawSample>(path: &Path, channel_count: usize) -> Result<usize> {
    if channel_count == 0 {
        return Err(Error::NoChannels);
    }
    let bytes = std::fs::metadata(path).map_err(|e| Error::io(path, e))?.len() as usize;
    values_to_samples::<T>(path, bytes, channel_count)
}

fn values_to_samples<T: RawSample>(path: &Path, bytes: usize, channel_count: usize) -> Result<usize> {
    if bytes % T::SIZE != 0 {
        return Err(Error::MisalignedBytes {
            path: path.to_path_buf(),
            bytes,
            element_size: T::SIZE,
        });
    }
    let values = bytes / T::SIZE;
    if values % channel_count != 0 {
        return Err(Error::TruncatedFile {
            path: path.to_path_buf(),
            values,
            channel_count,
        });
    }
    Ok(values / channel_count)
}

/// Read one capture file as a (channels, samples) matrix.
pub fn read_file<T: RawSample>(path: &Path, channel_count: usize) -> Result<Array2<T>> {
    if channel_count == 0 {
        return Err(Error::NoChannels);
    }
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let n_samples = values_to_samples::<T>(path, bytes.len(), channel_count)?;

    let flat: Vec<T> = bytes.chunks_exact(T::SIZE).map(T::from_le_slice).collect();
    let by_sample = Array2::from_shape_vec((n_samples, channel_count), flat)?;
    // (samples, channels) -> (channels, samples), stored row-major for
    // cheap per-channel access later on
    Ok(by_sample.t().as_standard_layout().into_owned())
}

/// Read and stack the capture files of one stream.
pub fn read_stream<T: RawSample, P: AsRef<Path>>(files: &[P], channel_count: usize) -> Result<StreamChunk<T>> {
    if files.is_empty() {
        return Err(Error::EmptyFileList);
    }
    if channel_count == 0 {
        return Err(Error::NoChannels);
    }

    let n_files = files.len();
    let mut per_file = Vec::with_capacity(n_files);
    let mut sample_counts = Vec::with_capacity(n_files);

    for (idx, file) in files.iter().enumerate() {
        let path = file.as_ref();
        tracing::info!("Read {} data from {} ({}/{})", T::NAME, path.display(), idx + 1, n_files);
        let matrix = read_file::<T>(path, channel_count)?;
        tracing::debug!("Reshaped into {:?}", matrix.dim());
        sample_counts.push(matrix.ncols());
        per_file.push(matrix);
    }

    let views: Vec<ArrayView2<T>> = per_file.iter().map(|m| m.view()).collect();
    let data = ndarray::concatenate(Axis(1), &views)?;
    tracing::info!("Stacked data horizontally into {:?}", data.dim());

    Ok(StreamChunk {
        data,
        sample_counts,
        files: files.iter().map(|f| f.as_ref().to_path_buf()).collect(),
    })
}

/// Write a (channels, samples) matrix in the interleaved capture layout.
pub fn write_file<T: RawSample>(path: &Path, data: &Array2<T>) -> Result<()> {
    let mut bytes = Vec::with_capacity(data.len() * T::SIZE);
    for sample in data.axis_iter(Axis(1)) {
        for &value in sample.iter() {
            value.append_le(&mut bytes);
        }
    }
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}
