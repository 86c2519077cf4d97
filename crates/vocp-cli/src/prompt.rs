//! Interactive overwrite confirmation

use console::Term;
use dialoguer::Confirm;
use vocp_types::{Error, OverwritePrompt, Result};

/// Asks on the terminal before an existing file is overwritten
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl OverwritePrompt for ConsolePrompt {
    fn confirm_overwrite(&self, path: &str) -> Result<bool> {
        // Blocks on stdin; keep the runtime's other workers free meanwhile
        tokio::task::block_in_place(|| {
            Confirm::new()
                .with_prompt(format!("File {path} exists.  Overwrite?"))
                .default(false)
                .interact_on(&Term::stderr())
                .map_err(|e| Error::other(format!("overwrite prompt failed: {e}")))
        })
    }
}
