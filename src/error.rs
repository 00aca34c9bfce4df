use std::path::PathBuf;

/// Error type shared by the alignment components.
///
/// Every variant is fatal for the chunk being processed. Cross-check
/// discrepancies between the two clocks are not errors; they are reported in
/// [`crate::align::AlignmentDiagnostics`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no timestamp matching YYYYMMDDTHHMMSS in file name: {name}")]
    MissingTimestamp { name: String },

    #[error("invalid timestamp {value}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("empty file list")]
    EmptyFileList,

    #[error("channel count must be greater than 0")]
    NoChannels,

    #[error("{path}: {bytes} bytes is not a multiple of the {element_size}-byte element size")]
    MisalignedBytes {
        path: PathBuf,
        bytes: usize,
        element_size: usize,
    },

    #[error("{path}: {values} values cannot be split into {channel_count} channels (truncated or corrupt capture)")]
    TruncatedFile {
        path: PathBuf,
        values: usize,
        channel_count: usize,
    },

    #[error("no samples provided")]
    NoSamples,

    #[error("sample count lists differ in length: {eeg} EEG files vs {ttl} TTL files")]
    SampleCountMismatch { eeg: usize, ttl: usize },

    #[error("chunk starting at {first_file} has a single file pair; co-termination cannot be corroborated")]
    UnalignableChunk { first_file: PathBuf },

    #[error("no TTL channel named like \"photometry\" in {ttl_names:?}")]
    MissingSyncChannel { ttl_names: Vec<String> },

    #[error("no synchronization pulses detected on TTL channel {channel}")]
    NoSyncPulses { channel: String },

    #[error("pulse store {store} not found in photometry export {path}")]
    MissingPulseStore { store: String, path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("array shape error: {source}")]
    Shape {
        #[from]
        source: ndarray::ShapeError,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
