//! Turning a downloaded byte stream into installed files.

use crate::error::{GoCqError, Result};
use crate::github::ByteStream;
use crate::platform::PlatformTarget;
use crate::utils;
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::io::AsyncWriteExt;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// How the download body becomes the installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialization {
    /// The asset is the executable itself; write it to this path.
    DirectWrite(PathBuf),
    /// The asset is a gzipped tarball; unpack only `entry` into `dir`.
    ArchiveExtract { entry: String, dir: PathBuf },
}

impl Materialization {
    pub fn for_target(target: &PlatformTarget, binary: &str, out_dir: &Path) -> Self {
        if target.is_windows() {
            Materialization::DirectWrite(out_dir.join(format!("{binary}.exe")))
        } else {
            Materialization::ArchiveExtract {
                entry: binary.to_string(),
                dir: out_dir.to_path_buf(),
            }
        }
    }

    /// Where the binary ends up once the stream is consumed.
    pub fn binary_path(&self) -> PathBuf {
        match self {
            Materialization::DirectWrite(path) => path.clone(),
            Materialization::ArchiveExtract { entry, dir } => dir.join(entry),
        }
    }

    /// Drain `stream` into place. Returns the installed binary path.
    pub async fn consume(&self, stream: ByteStream) -> Result<PathBuf> {
        match self {
            Materialization::DirectWrite(path) => {
                write_stream(stream, path).await?;
                utils::make_executable(path)?;
                Ok(path.clone())
            }
            Materialization::ArchiveExtract { entry, dir } => {
                let reader = SyncIoBridge::new(StreamReader::new(stream));
                let (entry, dir) = (entry.clone(), dir.clone());
                let name = entry.clone();

                let extracted = tokio::task::spawn_blocking(move || {
                    let mut reader = TransportReader::new(reader);
                    let result = extract_entry(&mut reader, &entry, &dir);
                    // a broken download outranks whatever tar made of it
                    match (result, reader.error) {
                        (Err(_), Some(e)) => Err(GoCqError::Stream(e)),
                        (result, _) => result,
                    }
                })
                .await
                .map_err(|e| GoCqError::ArchiveExtraction {
                    entry: name,
                    reason: e.to_string(),
                })??;

                match extracted {
                    Extracted::Unpacked(path) => {
                        utils::make_executable(&path)?;
                        Ok(path)
                    }
                    Extracted::KeptExisting(path) => Ok(path),
                }
            }
        }
    }
}

/// Result of pulling the binary out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Extracted {
    Unpacked(PathBuf),
    /// The file on disk was newer; nothing was written.
    KeptExisting(PathBuf),
}

/// Records the first error coming from the download side of the bridge, so
/// it can be told apart from decoding and local write failures.
struct TransportReader<R> {
    inner: R,
    error: Option<std::io::Error>,
}

impl<R> TransportReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, error: None }
    }
}

impl<R: Read> Read for TransportReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != std::io::ErrorKind::Interrupted => {
                let reported = std::io::Error::new(e.kind(), e.to_string());
                self.error.get_or_insert(e);
                Err(reported)
            }
            other => other,
        }
    }
}

async fn write_stream(mut stream: ByteStream, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| GoCqError::fs(path, e))?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(GoCqError::Stream)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| GoCqError::fs(path, e))?;
    }

    file.flush().await.map_err(|e| GoCqError::fs(path, e))
}

/// Unpack the top-level file `entry` from a `.tar.gz` stream into `dest_dir`.
///
/// An existing file at the destination that is at least as new as the
/// archived one is left alone.
fn extract_entry<R: Read>(reader: R, entry: &str, dest_dir: &Path) -> Result<Extracted> {
    let failed = |reason: String| GoCqError::ArchiveExtraction {
        entry: entry.to_string(),
        reason,
    };

    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| failed(format!("failed to read tar entries: {e}")))?;

    for item in entries {
        let mut item = item.map_err(|e| failed(format!("failed to read tar entry: {e}")))?;
        if !item.header().entry_type().is_file() {
            continue;
        }

        let path = item
            .path()
            .map_err(|e| failed(format!("failed to read entry path: {e}")))?;
        if path.strip_prefix(".").unwrap_or(path.as_ref()) != Path::new(entry) {
            continue;
        }

        let dest = dest_dir.join(entry);
        let archived_mtime = item.header().mtime().unwrap_or(0);
        if existing_is_newer(&dest, archived_mtime) {
            tracing::info!(
                "Keeping {}, it is newer than the archive; skipping the rest of the download",
                dest.display()
            );
            return Ok(Extracted::KeptExisting(dest));
        }

        tracing::debug!("Extracting {} to {}", entry, dest.display());
        item.unpack(&dest)
            .map_err(|e| failed(format!("failed to unpack: {e}")))?;
        return Ok(Extracted::Unpacked(dest));
    }

    Err(failed("entry not found in archive".to_string()))
}

fn existing_is_newer(path: &Path, archived_mtime: u64) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|age| age.as_secs() >= archived_mtime)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};
    use bytes::Bytes;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use futures_util::stream;
    use std::fs;
    use tempfile::tempdir;

    fn tarball(files: &[(&str, &[u8])], mtime: u64) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_mtime(mtime);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn chunked(data: Vec<u8>) -> ByteStream {
        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(64)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks).boxed()
    }

    #[test]
    fn test_for_target() {
        let out = Path::new("/opt/gocq/bin");
        let windows = PlatformTarget {
            os: Os::Windows,
            arch: Arch::X86_64,
        };
        assert_eq!(
            Materialization::for_target(&windows, "go-cqhttp", out),
            Materialization::DirectWrite(out.join("go-cqhttp.exe"))
        );

        let linux = PlatformTarget {
            os: Os::Linux,
            arch: Arch::Arm64,
        };
        let m = Materialization::for_target(&linux, "go-cqhttp", out);
        assert_eq!(m.binary_path(), out.join("go-cqhttp"));
    }

    #[tokio::test]
    async fn test_direct_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("go-cqhttp.exe");
        let data = vec![7u8; 1000];

        let m = Materialization::DirectWrite(path.clone());
        let installed = m.consume(chunked(data.clone())).await.unwrap();

        assert_eq!(installed, path);
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_extract_only_named_entry() {
        let dir = tempdir().unwrap();
        let archive = tarball(
            &[
                ("LICENSE", b"MIT"),
                ("README.md", b"readme"),
                ("go-cqhttp", b"\x7fELF binary"),
            ],
            1_600_000_000,
        );

        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };
        let installed = m.consume(chunked(archive)).await.unwrap();

        assert_eq!(fs::read(&installed).unwrap(), b"\x7fELF binary");
        assert!(!dir.path().join("LICENSE").exists());
        assert!(!dir.path().join("README.md").exists());
    }

    #[tokio::test]
    async fn test_extract_keeps_newer_file() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("go-cqhttp");
        fs::write(&existing, b"local build").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&existing, fs::Permissions::from_mode(0o644)).unwrap();
        }

        // archived entry dated 1970, so the file on disk is newer
        let archive = tarball(&[("go-cqhttp", b"release build")], 1);
        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };
        let kept = m.consume(chunked(archive)).await.unwrap();

        assert_eq!(kept, existing);
        assert_eq!(fs::read(&existing).unwrap(), b"local build");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&existing).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644, "kept file must not be touched");
        }
    }

    #[tokio::test]
    async fn test_extract_ignores_nested_entries() {
        let dir = tempdir().unwrap();
        let archive = tarball(
            &[
                ("docs/go-cqhttp", b"manual page"),
                ("old/go-cqhttp", b"previous build"),
                ("./go-cqhttp", b"current build"),
            ],
            1_600_000_000,
        );

        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };
        let installed = m.consume(chunked(archive)).await.unwrap();

        assert_eq!(fs::read(&installed).unwrap(), b"current build");
        assert!(!dir.path().join("docs").exists());
        assert!(!dir.path().join("old").exists());
    }

    #[tokio::test]
    async fn test_extract_nested_only_is_missing() {
        let dir = tempdir().unwrap();
        let archive = tarball(&[("old/go-cqhttp", b"previous build")], 1_600_000_000);
        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };

        let err = m.consume(chunked(archive)).await.unwrap_err();
        assert!(matches!(err, GoCqError::ArchiveExtraction { .. }));
    }

    #[tokio::test]
    async fn test_extract_interrupted_is_network_error() {
        let dir = tempdir().unwrap();
        // xorshift noise so the compressed entry is large
        let mut state: u32 = 0x9e37_79b9;
        let binary: Vec<u8> = (0..64 * 1024)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        let archive = tarball(&[("go-cqhttp", binary.as_slice())], 1_600_000_000);

        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::copy_from_slice(&archive[..archive.len() / 2])),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
        ];
        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };

        let err = m.consume(stream::iter(chunks).boxed()).await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {err}");
        assert!(!err.is_filesystem());
        match err {
            GoCqError::Stream(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
                assert!(e.to_string().contains("connection reset by peer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transport_reader_keeps_first_error() {
        struct Failing(u8);
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                self.0 += 1;
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionAborted,
                    format!("failure {}", self.0),
                ))
            }
        }

        let mut reader = TransportReader::new(Failing(0));
        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).is_err());
        assert!(reader.read(&mut buf).is_err());

        let recorded = reader.error.unwrap();
        assert_eq!(recorded.kind(), std::io::ErrorKind::ConnectionAborted);
        assert_eq!(recorded.to_string(), "failure 1");
    }

    #[tokio::test]
    async fn test_extract_missing_entry() {
        let dir = tempdir().unwrap();
        let archive = tarball(&[("README.md", b"readme")], 1_600_000_000);
        let m = Materialization::ArchiveExtract {
            entry: "go-cqhttp".to_string(),
            dir: dir.path().to_path_buf(),
        };

        let err = m.consume(chunked(archive)).await.unwrap_err();
        assert!(matches!(err, GoCqError::ArchiveExtraction { .. }));
    }

    #[tokio::test]
    async fn test_direct_write_interrupted() {
        let dir = tempdir().unwrap();
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"MZ partial")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
        ];
        let m = Materialization::DirectWrite(dir.path().join("go-cqhttp.exe"));

        let err = m.consume(stream::iter(chunks).boxed()).await.unwrap_err();
        assert!(err.is_network());
    }
}
