/*!
 * Buffered single-file transfer
 *
 * This is the mechanical bottom of the copy path: open source, open a
 * fresh destination, stream bytes through a fixed buffer, hash as we
 * go, set permissions and timestamps, and report progress along the
 * way. Everything above this (retry, mode checks, audit) treats this
 * as an atomic unit of work.
 */

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use super::checksum::StreamingHasher;
use super::progress::ProgressPublisher;
use super::{metadata, CopyStats};
use crate::config::CopyConfig;
use crate::error::Result;

const BUFFER_SIZE: usize = 256 * 1024;

/// Perform the actual byte-for-byte copy, reporting progress as it goes.
pub fn perform_copy(
    source_path: &Path,
    dest_path: &Path,
    source_size: u64,
    config: &CopyConfig,
    publisher: &ProgressPublisher,
) -> Result<CopyStats> {
    let start_time = Instant::now();

    if let Some(parent) = dest_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file_id = publisher.start_transfer(source_path.to_path_buf(), dest_path.to_path_buf(), source_size);

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source_path)?);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, File::create(dest_path)?);

    let mut hasher = StreamingHasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut bytes_copied: u64 = 0;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }

        writer.write_all(&buffer[..n])?;

        if config.verify_checksum {
            hasher.update(&buffer[..n]);
        }

        bytes_copied += n as u64;
        publisher.update_progress(&file_id, bytes_copied, source_size);
    }

    writer.flush()?;
    drop(writer);
    drop(reader);

    if config.preserve_metadata {
        metadata::preserve_metadata(source_path, dest_path)?;
    }

    let checksum = if config.verify_checksum {
        Some(format!("{:x}", hasher.finalize()))
    } else {
        None
    };

    let duration = start_time.elapsed();
    publisher.complete_transfer(file_id, bytes_copied, duration.as_millis() as u64, checksum.clone());

    Ok(CopyStats {
        bytes_copied,
        duration,
        checksum,
        compression_ratio: None,
        files_copied: 1,
        files_skipped: 0,
        files_failed: 0,
    })
}
