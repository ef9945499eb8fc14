#![forbid(unsafe_code)]
//! Conformance harness for the RFS volume.
//!
//! Provides the end-to-end smoke scenario as a reusable function plus an
//! accounting audit helper. The integration suite in `tests/` and the
//! CLI binary both build on these.

use anyhow::{ensure, Context, Result};
use rfs_core::RamFs;
use rfs_types::{FsConfig, OpenFlags, SeekWhence};
use serde::Serialize;

/// Outcome of [`run_smoke`], serializable for machine-readable reports.
#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub quota: u64,
    pub block_size: u32,
    /// Usage right after `mkdir("/a")`, before the file exists.
    pub baseline: u64,
    /// Usage while the 200-byte file is live (entry + header + 2 blocks).
    pub after_write: u64,
    /// Usage after the deferred unlink completes.
    pub after_close: u64,
    pub read_back_ok: bool,
}

/// Verify the incremental quota counter against a from-scratch recount.
pub fn audit(fs: &RamFs) -> Result<()> {
    let used = fs.usage().used;
    let recounted = fs.recount();
    ensure!(
        used == recounted,
        "quota accounting drifted: counter={used} recount={recounted}"
    );
    Ok(())
}

/// The concrete end-to-end scenario: mount quota=4096/block=128, create
/// `/a/f`, write 200 bytes, read them back through a second handle,
/// unlink while that handle is open, keep reading, close, and verify the
/// usage returns to the pre-creation baseline.
pub fn run_smoke() -> Result<SmokeReport> {
    let config = FsConfig::new(4096, 128).context("volume config")?;
    let fs = RamFs::mount(config);

    fs.mkdir("/a").context("mkdir /a")?;
    audit(&fs)?;
    let baseline = fs.usage().used;

    let data: Vec<u8> = (0..200_u32).map(|i| (i % 251) as u8).collect();

    let mut writer = fs
        .file_open("/a/f", OpenFlags::RDWR | OpenFlags::CREATE)
        .context("create /a/f")?;
    let written = fs.file_write(&mut writer, &data).context("write")?;
    ensure!(written == data.len(), "short write: {written}");
    audit(&fs)?;
    let after_write = fs.usage().used;
    fs.file_close(writer).context("close writer")?;

    let mut reader = fs
        .file_open("/a/f", OpenFlags::RDONLY)
        .context("reopen /a/f")?;
    let mut buf = vec![0_u8; data.len()];
    let read = fs.file_read(&mut reader, &mut buf).context("read")?;
    ensure!(read == data.len(), "short read: {read}");
    ensure!(buf == data, "content mismatch after round trip");

    // Unlink while the reader is still open: content stays readable.
    fs.unlink("/a/f").context("unlink while open")?;
    audit(&fs)?;
    fs.file_seek(&mut reader, 0, SeekWhence::Set).context("rewind")?;
    let reread = fs.file_read(&mut reader, &mut buf).context("read after unlink")?;
    let read_back_ok = reread == data.len() && buf == data;

    fs.file_close(reader).context("close reader")?;
    audit(&fs)?;
    let after_close = fs.usage().used;
    ensure!(
        after_close == baseline,
        "usage did not return to baseline: {after_close} != {baseline}"
    );

    Ok(SmokeReport {
        quota: config.quota,
        block_size: config.block_size.get(),
        baseline,
        after_write,
        after_close,
        read_back_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_scenario_passes() {
        let report = run_smoke().expect("smoke scenario");
        assert!(report.read_back_ok);
        assert_eq!(report.after_close, report.baseline);
        assert!(report.after_write > report.baseline);
    }
}
