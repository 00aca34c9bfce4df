//! TTL-based alignment of the ephys clock onto the photometry clock.
//!
//! The photometry system sends a pulse train that the ephys box records on one
//! TTL input. The EEG time of the first received pulse is the offset between
//! the two recordings. For chunked recordings the TTL sample indices are first
//! moved into EEG sample coordinates using [`crate::reconcile`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::channels::ChannelLayout;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::photometry::{PhotometryBlock, PhotometryReader};
use crate::reconcile::{Reconciliation, reconcile};
use crate::record::AlignmentRecord;
use crate::stream::{StreamChunk, read_stream};
use crate::ttl::{PulseEdges, detect_edges, normalize};

/// The pulse used for alignment. Chunked recordings always align on the first
/// received pulse once sample offsets are reconciled.
pub const ALIGNMENT_IDX: usize = 0;

/// Everything the engine needs from the session configuration.
#[derive(Debug, Clone)]
pub struct AlignmentSettings {
    pub aq_freq_hz: u32,
    pub eeg_layout: ChannelLayout,
    pub eeg_channel_count: usize,
    pub ttl_layout: ChannelLayout,
    pub sync_channel: usize,
    pub pulse_sync: String,
    pub duration_tolerance_sec: f64,
}

impl AlignmentSettings {
    /// Validate `config` and resolve the synchronization channel.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let ttl_layout = ChannelLayout::ttl(config);
        let sync_channel = ttl_layout.photometry_sync_index()?;
        let eeg_channel_count = config.eeg_channel_count();
        Ok(Self {
            aq_freq_hz: config.aq_freq_hz,
            eeg_layout: ChannelLayout::eeg(config).extended_to(eeg_channel_count),
            eeg_channel_count,
            ttl_layout,
            sync_channel,
            pulse_sync: config.pulse_sync.clone(),
            duration_tolerance_sec: config.duration_tolerance_sec,
        })
    }

    pub fn sync_channel_name(&self) -> String {
        self.ttl_layout
            .channels()
            .get(self.sync_channel)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.sync_channel.to_string())
    }
}

/// Receives the EEG stream of a chunk once it has been read.
///
/// Filtering and downsampling are done by external tools; the alignment only
/// needs the per-file sample counts.
pub trait EegProcessor {
    fn process(&mut self, eeg: &StreamChunk<f32>, layout: &ChannelLayout) -> Result<()>;
}

/// Leaves the EEG stream untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipEegProcessing;

impl EegProcessor for SkipEegProcessing {
    fn process(&mut self, _eeg: &StreamChunk<f32>, _layout: &ChannelLayout) -> Result<()> {
        Ok(())
    }
}

/// Clock cross-checks between the TTL pulses and the photometry block.
///
/// These are reported, never used to correct the offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentDiagnostics {
    /// First onset to last offset of the received pulses, in seconds.
    pub ttl_pulse_span_sec: Option<f64>,
    pub block_duration_sec: f64,
    pub tdt_epoc_span_sec: Option<f64>,
    /// Received pulse span minus block duration; should be close to zero.
    pub bonsai_minus_block_sec: Option<f64>,
    /// Block duration minus sent pulse span.
    pub block_minus_epoc_sec: Option<f64>,
    /// Received pulse span minus sent pulse span, the direct clock comparison.
    pub bonsai_minus_epoc_sec: Option<f64>,
    pub pulses_sent: usize,
    pub pulses_received: usize,
    pub pulse_counts_match: bool,
    pub exceeds_tolerance: bool,
}

impl AlignmentDiagnostics {
    pub fn compute(edges: &PulseEdges, block: &PhotometryBlock, aq_freq_hz: u32, tolerance_sec: f64) -> Self {
        let ttl_pulse_span_sec = edges.span_samples().map(|s| s as f64 / aq_freq_hz as f64);
        let tdt_epoc_span_sec = block.epoc_span_sec();
        let bonsai_minus_block_sec = ttl_pulse_span_sec.map(|span| span - block.duration_sec);
        let block_minus_epoc_sec = tdt_epoc_span_sec.map(|span| block.duration_sec - span);
        let bonsai_minus_epoc_sec = match (ttl_pulse_span_sec, tdt_epoc_span_sec) {
            (Some(received), Some(sent)) => Some(received - sent),
            _ => None,
        };

        let pulses_sent = block.pulses_sent();
        let pulses_received = edges.pulse_count();

        let exceeds_tolerance = [bonsai_minus_block_sec, block_minus_epoc_sec, bonsai_minus_epoc_sec]
            .iter()
            .flatten()
            .any(|diff| diff.abs() > tolerance_sec);

        Self {
            ttl_pulse_span_sec,
            block_duration_sec: block.duration_sec,
            tdt_epoc_span_sec,
            bonsai_minus_block_sec,
            block_minus_epoc_sec,
            bonsai_minus_epoc_sec,
            pulses_sent,
            pulses_received,
            pulse_counts_match: pulses_sent == pulses_received,
            exceeds_tolerance,
        }
    }

    /// Log the cross-checks; discrepancies are raised to warnings.
    pub fn report(&self) {
        match self.bonsai_minus_block_sec {
            Some(diff) => tracing::info!("Duration difference: bonsai pulses - block info = {:.4} seconds", diff),
            None => tracing::warn!("No complete pulse received; cannot compare with block duration"),
        }
        if let Some(diff) = self.block_minus_epoc_sec {
            tracing::info!("Duration difference: block info - tdt sent epocs = {:.4} seconds", diff);
        }
        if let Some(diff) = self.bonsai_minus_epoc_sec {
            tracing::info!("Duration difference: bonsai pulses - tdt sent epocs = {:.4} seconds", diff);
        }
        tracing::info!("TDT sent: {} pulses", self.pulses_sent);
        tracing::info!("Bonsai received: {} pulses", self.pulses_received);

        if !self.pulse_counts_match {
            tracing::warn!(
                "Pulse counts differ between recordings (sent {}, received {}); aligning on the first pulse, check the recording manually",
                self.pulses_sent,
                self.pulses_received
            );
        }
        if self.exceeds_tolerance {
            tracing::warn!("Clock durations differ by more than the configured tolerance; inspect the alignment record");
        }
    }
}

/// Full outcome of aligning one chunk.
#[derive(Debug, Clone)]
pub struct ChunkAlignment {
    pub record: AlignmentRecord,
    pub diagnostics: AlignmentDiagnostics,
    pub reconciliation: Option<Reconciliation>,
    pub samples_to_add: i64,
    pub pulse_onsets: Vec<i64>,
    pub ttl_files: Vec<PathBuf>,
    pub eeg_files: Vec<PathBuf>,
    pub ttl_sample_counts: Vec<usize>,
    pub eeg_sample_counts: Vec<usize>,
}

/// Read a TTL chunk and detect the edges of the synchronization channel.
///
/// The TTL matrix is dropped before returning.
pub fn read_sync_pulses<P: AsRef<Path>>(ttl_files: &[P], settings: &AlignmentSettings) -> Result<(PulseEdges, Vec<usize>)> {
    let ttl: StreamChunk<i8> = read_stream(ttl_files, settings.ttl_layout.len())?;
    let normalized = normalize(&ttl.data);
    tracing::info!("TTL data read and normalized");

    if settings.sync_channel >= normalized.nrows() {
        return Err(Error::MissingSyncChannel {
            ttl_names: settings.ttl_layout.names().iter().map(|n| n.to_string()).collect(),
        });
    }

    let edges = detect_edges(normalized.row(settings.sync_channel));
    if edges.onsets.len().abs_diff(edges.offsets.len()) > 1 {
        tracing::warn!(
            "Sync channel has {} onsets but {} offsets",
            edges.onsets.len(),
            edges.offsets.len()
        );
    }
    Ok((edges, ttl.sample_counts))
}

/// Align a chunk of continuous recording files.
///
/// `ttl_files` and `eeg_files` are parallel: entry `i` of both carries the same
/// timestamp. Single-pair chunks are refused.
pub fn align_chunk<P: AsRef<Path>, Q: AsRef<Path>>(
    ttl_files: &[P],
    eeg_files: &[Q],
    settings: &AlignmentSettings,
    photometry: &dyn PhotometryReader,
    eeg_processor: &mut dyn EegProcessor,
) -> Result<ChunkAlignment> {
    if ttl_files.is_empty() || eeg_files.is_empty() {
        return Err(Error::EmptyFileList);
    }
    if ttl_files.len() != eeg_files.len() {
        return Err(Error::SampleCountMismatch {
            eeg: eeg_files.len(),
            ttl: ttl_files.len(),
        });
    }
    let first_file = ttl_files[0].as_ref().to_path_buf();
    if ttl_files.len() == 1 {
        return Err(Error::UnalignableChunk { first_file });
    }

    let (edges, ttl_sample_counts) = read_sync_pulses(ttl_files, settings)?;

    let eeg_sample_counts = {
        let eeg: StreamChunk<f32> = read_stream(eeg_files, settings.eeg_channel_count)?;
        eeg_processor.process(&eeg, &settings.eeg_layout)?;
        eeg.sample_counts
    };

    let reconciliation = reconcile(&eeg_sample_counts, &ttl_sample_counts)?;
    tracing::info!(
        "File pairs: {:?}, co-start {:?}, co-terminate {:?}",
        reconciliation.chunk_types,
        reconciliation.co_start,
        reconciliation.co_terminate
    );
    if !reconciliation.is_alignable() {
        return Err(Error::UnalignableChunk { first_file });
    }

    let samples_to_add = reconciliation.samples_before_ttl;
    tracing::info!(
        "The difference between the first EEG and TTL file is {} samples; adding it to the pulse onsets",
        samples_to_add
    );

    let block = photometry.read_block(&settings.pulse_sync)?;
    let (record, diagnostics, pulse_onsets) = finish_alignment(&edges, samples_to_add, &block, settings)?;

    Ok(ChunkAlignment {
        record,
        diagnostics,
        reconciliation: Some(reconciliation),
        samples_to_add,
        pulse_onsets,
        ttl_files: ttl_files.iter().map(|f| f.as_ref().to_path_buf()).collect(),
        eeg_files: eeg_files.iter().map(|f| f.as_ref().to_path_buf()).collect(),
        ttl_sample_counts,
        eeg_sample_counts,
    })
}

/// Align a non-chunked recording where one TTL file was captured together
/// with its EEG file, so TTL sample indices are already EEG sample indices.
pub fn align_single_file(
    ttl_file: &Path,
    settings: &AlignmentSettings,
    photometry: &dyn PhotometryReader,
) -> Result<ChunkAlignment> {
    let (edges, ttl_sample_counts) = read_sync_pulses(&[ttl_file], settings)?;
    let block = photometry.read_block(&settings.pulse_sync)?;
    let (record, diagnostics, pulse_onsets) = finish_alignment(&edges, 0, &block, settings)?;

    Ok(ChunkAlignment {
        record,
        diagnostics,
        reconciliation: None,
        samples_to_add: 0,
        pulse_onsets,
        ttl_files: vec![ttl_file.to_path_buf()],
        eeg_files: Vec::new(),
        ttl_sample_counts,
        eeg_sample_counts: Vec::new(),
    })
}

fn finish_alignment(
    edges: &PulseEdges,
    samples_to_add: i64,
    block: &PhotometryBlock,
    settings: &AlignmentSettings,
) -> Result<(AlignmentRecord, AlignmentDiagnostics, Vec<i64>)> {
    let pulse_onsets: Vec<i64> = edges.onsets.iter().map(|&idx| idx as i64 + samples_to_add).collect();

    let first = *pulse_onsets.get(ALIGNMENT_IDX).ok_or_else(|| Error::NoSyncPulses {
        channel: settings.sync_channel_name(),
    })?;
    let eeg_t0_sec = first as f64 / settings.aq_freq_hz as f64;

    let diagnostics =
        AlignmentDiagnostics::compute(edges, block, settings.aq_freq_hz, settings.duration_tolerance_sec);
    diagnostics.report();

    let record = AlignmentRecord {
        eeg_t0_sec,
        photo_max_t: block.max_t_sec,
        alignment_idx: ALIGNMENT_IDX,
        tdt_pulses_sent: block.pulses_sent(),
        bonsai_pulses_received: pulse_onsets.len(),
    };
    tracing::info!("eeg_t0_sec = {:.6} (pulse {} at sample {})", eeg_t0_sec, ALIGNMENT_IDX, first);

    Ok((record, diagnostics, pulse_onsets))
}
