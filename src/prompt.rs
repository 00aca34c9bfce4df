use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::batch::BlockSource;
use crate::error::{Error, Result};

/// Asks for the photometry block of each chunk on a line-based console.
///
/// An empty line or `SKIP` means no selection; end of input as well.
pub struct PromptedBlocks<R, W> {
    input: R,
    output: W,
}

impl PromptedBlocks<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptedBlocks<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, line: &str) {
        writeln!(self.output, "{}", line).ok();
        self.output.flush().ok();
    }
}

impl<R: BufRead, W: Write> BlockSource for PromptedBlocks<R, W> {
    fn block_for(&mut self, index: usize, first_ttl: &Path) -> Result<Option<PathBuf>> {
        self.say(&format!(
            "SELECT photometry block for chunk {} ({}), or SKIP",
            index + 1,
            first_ttl.display()
        ));

        loop {
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|e| Error::io(Path::new("<stdin>"), e))?;
            if read == 0 {
                self.say("STATUS END OF INPUT");
                return Ok(None);
            }

            let answer = line.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("SKIP") {
                self.say("STATUS SKIPPED");
                return Ok(None);
            }

            let path = PathBuf::from(answer);
            if path.exists() {
                self.say(&format!("STATUS SELECTED {}", path.display()));
                return Ok(Some(path));
            }
            self.say(&format!("ERROR no such path: {}", answer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_an_existing_path_or_skip() {
        let dir = tempfile::tempdir().unwrap();
        let block = dir.path().join("block_pulses.json");
        std::fs::write(&block, "{}").unwrap();

        let input = format!("/does/not/exist\n{}\nSKIP\n", block.display());
        let mut output = Vec::new();
        let mut prompt = PromptedBlocks::new(input.as_bytes(), &mut output);

        let first = prompt.block_for(0, Path::new("a_ttl_in.bin")).unwrap();
        assert_eq!(first, Some(block));
        assert_eq!(prompt.block_for(1, Path::new("b_ttl_in.bin")).unwrap(), None);
        assert_eq!(prompt.block_for(2, Path::new("c_ttl_in.bin")).unwrap(), None);

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("ERROR no such path: /does/not/exist"));
        assert!(transcript.contains("STATUS SKIPPED"));
        assert!(transcript.contains("STATUS END OF INPUT"));
    }
}
