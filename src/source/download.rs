//! Fetching and unpacking the original dataset archives.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use percent_encoding::percent_decode_str;

use crate::error::TrashcanError;
use crate::progress::create_bytes_bar;
use crate::settings::DownloadSource;

/// Downloads and unpacks the configured archive(s) into `storage_dir`.
///
/// Returns the directory to use as the dataset root:
/// - for a single URL, the unpacked archive directory;
/// - for named archives, `storage_dir` itself.
pub fn fetch(
    source: &DownloadSource,
    storage_dir: &Path,
    show_progress: bool,
) -> Result<PathBuf, TrashcanError> {
    fs::create_dir_all(storage_dir)?;
    let agent = build_agent();

    match source {
        DownloadSource::Single(url) => {
            let file_name = archive_file_name(url)?;
            let local_path = storage_dir.join(&file_name);
            let unpacked = unpack_dir(&local_path);
            if unpacked.is_dir() {
                info!(
                    "Archive '{}' was already unpacked to '{}'. Skipping...",
                    file_name,
                    unpacked.display()
                );
                return Ok(unpacked);
            }

            download_file(&agent, url, &local_path, show_progress)?;
            info!("Start unpacking archive '{}'...", file_name);
            unpack_if_archive(&local_path)
        }
        DownloadSource::Named(archives) => {
            for (file_name, url) in archives {
                let local_path = storage_dir.join(file_name);
                let unpacked = unpack_dir(&local_path);
                if unpacked.exists() {
                    info!(
                        "Archive '{}' was already unpacked to '{}'. Skipping...",
                        file_name,
                        unpacked.display()
                    );
                    continue;
                }

                download_file(&agent, url, &local_path, show_progress)?;
                info!("Start unpacking archive '{}'...", file_name);
                unpack_if_archive(&local_path)?;
            }
            Ok(storage_dir.to_path_buf())
        }
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(30)))
        .build();
    config.into()
}

/// Local file name for an archive URL: the percent-decoded last path segment.
pub fn archive_file_name(url: &str) -> Result<String, TrashcanError> {
    let parsed = url::Url::parse(url).map_err(|source| TrashcanError::Download {
        url: url.to_string(),
        message: format!("invalid URL: {source}"),
    })?;

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name = percent_decode_str(segment).decode_utf8_lossy().to_string();

    if name.is_empty() {
        return Err(TrashcanError::Download {
            url: url.to_string(),
            message: "URL path has no file name".to_string(),
        });
    }
    Ok(name)
}

/// Streams `url` into `dest`, returning the number of bytes written.
pub fn download_file(
    agent: &ureq::Agent,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<u64, TrashcanError> {
    let download_error = |message: String| TrashcanError::Download {
        url: url.to_string(),
        message,
    };

    let response = agent
        .get(url)
        .call()
        .map_err(|source| download_error(source.to_string()))?;

    let len = response
        .headers()
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let file_name = dest
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let pb = create_bytes_bar(len, &format!("Downloading '{file_name}'"), show_progress);

    let mut reader = pb.wrap_read(response.into_body().into_reader());
    let mut writer = BufWriter::new(File::create(dest)?);
    let written = io::copy(&mut reader, &mut writer)?;
    pb.finish_and_clear();

    info!("Downloaded {} ({} bytes)", dest.display(), written);
    Ok(written)
}

/// Directory an archive unpacks into: its path without the extension.
fn unpack_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Extracts a `.zip` archive next to itself and returns the extraction
/// directory. Any other path is returned unchanged.
pub fn unpack_if_archive(path: &Path) -> Result<PathBuf, TrashcanError> {
    let is_zip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if !is_zip {
        return Ok(path.to_path_buf());
    }

    let dest = unpack_dir(path);
    let unpack_error = |message: String| TrashcanError::Unpack {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|source| unpack_error(source.to_string()))?;
    fs::create_dir_all(&dest)?;
    archive
        .extract(&dest)
        .map_err(|source| unpack_error(source.to_string()))?;

    info!(
        "Unpacked {} entries into {}",
        archive.len(),
        dest.display()
    );
    Ok(dest)
}
