//! Session-level alignment: segment, align every chunk, write the outputs.

use std::path::{Path, PathBuf};

use crate::align::{AlignmentSettings, ChunkAlignment, EegProcessor, align_chunk, align_single_file};
use crate::chunks::segment;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::photometry::{JsonBlockReader, PhotometryReader};
use crate::record::{OutputPaths, RunProvenance, run_stamp};
use crate::session::{StreamKind, list_stream_files, matching_eeg_path, session_id};

/// Supplies the photometry block recorded during each chunk.
pub trait BlockSource {
    /// Block for chunk `index` starting at `first_ttl`, or `None` when the user
    /// made no selection.
    fn block_for(&mut self, index: usize, first_ttl: &Path) -> Result<Option<PathBuf>>;

    /// Called once the session is segmented, before any chunk is read.
    fn check_chunk_count(&self, _chunk_count: usize) -> Result<()> {
        Ok(())
    }
}

/// Blocks given up front, one per chunk in chunk order.
///
/// Single-file chunks count too, so a non-empty list must hold exactly one
/// entry per chunk. An empty list selects no block for any chunk.
#[derive(Debug, Clone, Default)]
pub struct ListedBlocks {
    blocks: Vec<PathBuf>,
}

impl ListedBlocks {
    pub fn new(blocks: Vec<PathBuf>) -> Self {
        Self { blocks }
    }
}

impl BlockSource for ListedBlocks {
    fn block_for(&mut self, index: usize, _first_ttl: &Path) -> Result<Option<PathBuf>> {
        Ok(self.blocks.get(index).cloned())
    }

    fn check_chunk_count(&self, chunk_count: usize) -> Result<()> {
        if !self.blocks.is_empty() && self.blocks.len() != chunk_count {
            return Err(Error::InvalidConfig(format!(
                "{} photometry block(s) given for {} chunk(s); give one per chunk, single-file chunks included",
                self.blocks.len(),
                chunk_count
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Overrides `discontinuity_tolerance_min` from the configuration.
    pub tolerance_min: Option<f64>,
    /// Write outputs to `<output_dir>/<first_ttl_stem>/` instead of next to the TTL files.
    pub output_dir: Option<PathBuf>,
    /// Stop at the first failing chunk.
    pub fail_fast: bool,
}

impl BatchOptions {
    pub fn output_paths(&self, first_ttl: &Path) -> OutputPaths {
        match &self.output_dir {
            Some(dir) => OutputPaths::in_output_dir(dir, first_ttl),
            None => OutputPaths::beside_ttl(first_ttl),
        }
    }
}

/// How one chunk of a batch ended.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub first_ttl: PathBuf,
    pub file_count: usize,
    pub result: std::result::Result<ChunkReport, Error>,
}

/// Summary of a chunk that was aligned and written.
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub outputs: OutputPaths,
    pub eeg_t0_sec: f64,
    pub samples_to_add: i64,
    pub pulses_sent: usize,
    pub pulses_received: usize,
    pub exceeds_tolerance: bool,
}

impl ChunkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Align every chunk of the session in `session_dir`.
///
/// Failures are collected per chunk; with `fail_fast` the first failure is
/// returned instead.
pub fn align_session(
    session_dir: &Path,
    config: &SessionConfig,
    blocks: &mut dyn BlockSource,
    eeg_processor: &mut dyn EegProcessor,
    options: &BatchOptions,
) -> Result<Vec<ChunkOutcome>> {
    let settings = AlignmentSettings::from_config(config)?;
    let expected_delta = config.expected_delta_minutes()?;
    let tolerance = options.tolerance_min.unwrap_or(config.discontinuity_tolerance_min);
    if tolerance < 0.0 {
        return Err(Error::InvalidConfig("tolerance must not be negative".to_string()));
    }

    let ttl_dir = session_dir.join(StreamKind::Ttl.dir_name());
    let ttl_files: Vec<PathBuf> = list_stream_files(&ttl_dir, StreamKind::Ttl)?
        .into_iter()
        .map(|f| f.path)
        .collect();
    tracing::info!("Found {} TTL files in {}", ttl_files.len(), ttl_dir.display());

    let chunks = segment(&ttl_files, expected_delta, tolerance)?;
    tracing::info!(
        "Segmented into {} chunk(s) (period {:.2} min, tolerance {:.2} min)",
        chunks.len(),
        expected_delta,
        tolerance
    );

    blocks.check_chunk_count(chunks.len())?;

    let mut outcomes = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let first_ttl = chunk[0].clone();
        tracing::info!(
            "Chunk {}/{}: {} file(s) starting at {}",
            index + 1,
            chunks.len(),
            chunk.len(),
            first_ttl.display()
        );

        let result = match align_and_write(index, chunk, config, &settings, blocks, eeg_processor, options) {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Chunk starting at {} failed: {}", first_ttl.display(), e);
                if options.fail_fast {
                    return Err(e);
                }
                Err(e)
            }
        };

        outcomes.push(ChunkOutcome {
            index,
            first_ttl,
            file_count: chunk.len(),
            result,
        });
    }

    Ok(outcomes)
}

fn align_and_write(
    index: usize,
    ttl_files: &[PathBuf],
    config: &SessionConfig,
    settings: &AlignmentSettings,
    blocks: &mut dyn BlockSource,
    eeg_processor: &mut dyn EegProcessor,
    options: &BatchOptions,
) -> Result<ChunkReport> {
    let first_ttl = &ttl_files[0];
    if ttl_files.len() < 2 {
        return Err(Error::UnalignableChunk {
            first_file: first_ttl.clone(),
        });
    }

    let block_path = blocks.block_for(index, first_ttl)?.ok_or_else(|| {
        Error::InvalidConfig(format!("no photometry block selected for {}", first_ttl.display()))
    })?;
    let reader = JsonBlockReader::open(&block_path)?;

    let eeg_files: Vec<PathBuf> = ttl_files.iter().map(|f| matching_eeg_path(f)).collect();
    let alignment = align_chunk(ttl_files, &eeg_files, settings, &reader, eeg_processor)?;

    let outputs = options.output_paths(first_ttl);
    write_outputs(&alignment, config, &reader, "chunked", &outputs)?;
    Ok(report(&alignment, outputs))
}

/// Align one TTL file recorded together with its EEG file and write the
/// outputs next to it.
pub fn align_single_session_file(
    ttl_file: &Path,
    config: &SessionConfig,
    block: &Path,
    output_dir: Option<&Path>,
) -> Result<ChunkReport> {
    let settings = AlignmentSettings::from_config(config)?;
    session_id(&[ttl_file])?;
    let reader = JsonBlockReader::open(block)?;
    let alignment = align_single_file(ttl_file, &settings, &reader)?;

    let outputs = match output_dir {
        Some(dir) => OutputPaths::in_output_dir(dir, ttl_file),
        None => OutputPaths::beside_ttl(ttl_file),
    };
    write_outputs(&alignment, config, &reader, "single-file", &outputs)?;
    Ok(report(&alignment, outputs))
}

fn write_outputs(
    alignment: &ChunkAlignment,
    config: &SessionConfig,
    reader: &dyn PhotometryReader,
    mode: &str,
    outputs: &OutputPaths,
) -> Result<()> {
    let stamp = run_stamp();
    let provenance = RunProvenance {
        run_id: stamp.run_id,
        created_at: stamp.created_at,
        hostname: stamp.hostname,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        subject_id: config.subject_id.clone(),
        session_id: session_id(&alignment.ttl_files)?,
        mode: mode.to_string(),
        ttl_files: alignment.ttl_files.clone(),
        eeg_files: alignment.eeg_files.clone(),
        eeg_sample_counts: alignment.eeg_sample_counts.clone(),
        ttl_sample_counts: alignment.ttl_sample_counts.clone(),
        photometry_source: reader.source().to_path_buf(),
        samples_to_add: alignment.samples_to_add,
        reconciliation: alignment.reconciliation.clone(),
        diagnostics: alignment.diagnostics.clone(),
        record: alignment.record.clone(),
    };
    // The record goes last: its presence marks a completed chunk
    provenance.write(&outputs.provenance)?;
    tracing::debug!("Provenance written to {}", outputs.provenance.display());
    alignment.record.write(&outputs.record)?;
    tracing::info!("Alignment record written to {}", outputs.record.display());
    Ok(())
}

fn report(alignment: &ChunkAlignment, outputs: OutputPaths) -> ChunkReport {
    ChunkReport {
        outputs,
        eeg_t0_sec: alignment.record.eeg_t0_sec,
        samples_to_add: alignment.samples_to_add,
        pulses_sent: alignment.diagnostics.pulses_sent,
        pulses_received: alignment.diagnostics.pulses_received,
        exceeds_tolerance: alignment.diagnostics.exceeds_tolerance,
    }
}
