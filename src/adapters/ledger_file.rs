use crate::adapters::memory::LedgerSnapshot;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON snapshot of the ledger on local disk.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LedgerSnapshot> {
        let data = fs::read(&self.path)?;
        let snapshot = serde_json::from_slice(&data)?;
        Ok(snapshot)
    }

    /// 先寫入暫存檔再改名，避免中途失敗留下半份檔案
    pub fn write(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!("Ledger written to {}", self.path.display());
        Ok(())
    }
}
