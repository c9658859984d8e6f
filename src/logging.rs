use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Progress log of one run, mirrored to tracing and to `<out>.log`.
pub struct RunLog {
    file: File,
    path: PathBuf,
}

impl RunLog {
    pub fn create_for(out: &Path) -> Result<Self> {
        let mut name = out.as_os_str().to_owned();
        name.push(".log");
        let path = PathBuf::from(name);
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, message: &str) -> Result<()> {
        info!("{message}");
        writeln!(self.file, "{message}")?;
        Ok(())
    }

    pub fn warn(&mut self, message: &str) -> Result<()> {
        warn!("{message}");
        writeln!(self.file, "WARNING: {message}")?;
        Ok(())
    }
}
