use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::batch::BatchOptions;

#[derive(Parser, Clone)]
#[command(name = "ephys-align")]
#[command(about = "Align chunked ephys recordings to photometry blocks using TTL sync pulses")]
#[command(version)]
pub struct Args {
    #[arg(help = "Session folder holding the eeg/ and ttl/ capture folders")]
    pub session_dir: PathBuf,

    #[arg(
        long,
        short = 'c',
        help = "Folder holding the session config.yaml (defaults to the session folder)"
    )]
    pub config_folder: Option<PathBuf>,

    #[arg(
        long = "block",
        short = 'b',
        help = "Photometry block (pulse export file or block folder), once per chunk in chunk order, single-file chunks included (see ephys-chunks). Prompted on stdin when omitted"
    )]
    pub blocks: Vec<PathBuf>,

    #[arg(
        long,
        help = "Tolerance in minutes around the timer period before files are split into separate chunks (overrides the config)"
    )]
    pub tolerance: Option<f64>,

    #[arg(
        long,
        short = 'o',
        help = "Write outputs to <output-dir>/<first TTL file>/ instead of next to the TTL files"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Stop at the first chunk that fails")]
    pub fail_fast: bool,

    #[arg(
        long,
        value_name = "TTL_FILE",
        help = "Align a single TTL file recorded together with its EEG file (no chunk reconciliation)"
    )]
    pub single_file: Option<PathBuf>,

    #[arg(long, short = 'v', help = "Print the run configuration as JSON")]
    pub verbose: bool,

    #[arg(long, short = 'q', help = "Minimal output mode")]
    pub quiet: bool,
}

impl Args {
    pub fn config_folder(&self) -> &Path {
        self.config_folder.as_deref().unwrap_or(self.session_dir.as_path())
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            tolerance_min: self.tolerance,
            output_dir: self.output_dir.clone(),
            fail_fast: self.fail_fast,
        }
    }

    /// Serialize the run configuration to a JSON string
    pub fn to_run_config_json(&self, started_at: Option<String>) -> anyhow::Result<String> {
        let config_json = json!({
            "session_dir": self.session_dir.display().to_string(),
            "config_folder": self.config_folder().display().to_string(),
            "blocks": self.blocks.iter().map(|b| b.display().to_string()).collect::<Vec<_>>(),
            "tolerance": self.tolerance,
            "output_dir": self.output_dir.as_ref().map(|d| d.display().to_string()),
            "fail_fast": self.fail_fast,
            "single_file": self.single_file.as_ref().map(|f| f.display().to_string()),
            "quiet": self.quiet,
            "started_at": started_at,
            "aligner_version": env!("CARGO_PKG_VERSION")
        });

        Ok(serde_json::to_string_pretty(&config_json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_blocks_keep_chunk_order() {
        let args = Args::parse_from([
            "ephys-align",
            "/data/MLA001",
            "--block",
            "/photo/b1",
            "-b",
            "/photo/b2",
            "--tolerance",
            "1",
        ]);
        assert_eq!(args.blocks, vec![PathBuf::from("/photo/b1"), PathBuf::from("/photo/b2")]);
        assert_eq!(args.config_folder(), Path::new("/data/MLA001"));

        let options = args.batch_options();
        assert_eq!(options.tolerance_min, Some(1.0));
        assert!(!options.fail_fast);

        let json: serde_json::Value = serde_json::from_str(&args.to_run_config_json(None).unwrap()).unwrap();
        assert_eq!(json["blocks"][1], "/photo/b2");
    }
}
