use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

#[derive(Clone, Debug, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Zips every regular file under `package_dir` into `archive`.
///
/// Entry names are relative to `root`, the parent of `package_dir`, so the
/// package directory itself sits at the top of the archive.
pub(crate) fn write_layer_archive(
    root: &Path,
    package_dir: &Path,
    archive: &Path,
) -> Result<ArchiveSummary> {
    let file = File::create(archive)
        .with_context(|| format!("failed to create {}", archive.display()))?;
    let mut zip = ZipWriter::new(file);
    let base = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(package_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", package_dir.display()))?;
        let path = entry.path();
        if !is_archived_file(&entry)? {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
        let name = zip_entry_name(relative)?;
        let options = entry_options(base, path)?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("failed to add {name} to archive"))?;
        let mut source =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        io::copy(&mut source, &mut zip)
            .with_context(|| format!("failed to compress {}", path.display()))?;
        entries += 1;
    }
    zip.finish()
        .with_context(|| format!("failed to finalize {}", archive.display()))?;

    let bytes = fs::metadata(archive)
        .with_context(|| format!("failed to stat {}", archive.display()))?
        .len();
    let sha256 = compute_file_sha256(archive)?;
    Ok(ArchiveSummary {
        path: archive.to_path_buf(),
        entries,
        bytes,
        sha256,
    })
}

/// Regular files, plus symlinks that resolve to one. A linked file is stored
/// under the link's own name with the target's contents.
fn is_archived_file(entry: &walkdir::DirEntry) -> Result<bool> {
    if entry.file_type().is_file() {
        return Ok(true);
    }
    if !entry.path_is_symlink() {
        return Ok(false);
    }
    let meta = fs::metadata(entry.path())
        .with_context(|| format!("failed to resolve symlink {}", entry.path().display()))?;
    Ok(meta.is_file())
}

#[cfg(unix)]
fn entry_options(base: FileOptions, path: &Path) -> Result<FileOptions> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions()
        .mode();
    Ok(base.unix_permissions(mode & 0o777))
}

#[cfg(not(unix))]
fn entry_options(base: FileOptions, _path: &Path) -> Result<FileOptions> {
    Ok(base)
}

/// Zip entries always use forward slashes, whatever the host separator.
fn zip_entry_name(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| anyhow!("non-utf8 path {}", relative.display()))?
                    .to_string(),
            ),
            other => {
                return Err(anyhow!(
                    "unexpected path component {other:?} in {}",
                    relative.display()
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

pub(crate) fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Human-readable size with one decimal, e.g. `1.5 MB`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    fn format_scaled(value: u64, unit: u64, suffix: &str) -> String {
        let whole = value / unit;
        let remainder = value % unit;
        let tenths = (remainder * 10) / unit;
        format!("{whole}.{tenths} {suffix}")
    }

    if bytes >= MB {
        format_scaled(bytes, MB, "MB")
    } else if bytes >= KB {
        format_scaled(bytes, KB, "KB")
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Read;

    fn archive_names(path: &Path) -> BTreeSet<String> {
        let file = File::open(path).expect("open archive");
        let archive = zip::ZipArchive::new(file).expect("valid zip");
        archive.file_names().map(ToString::to_string).collect()
    }

    #[test]
    fn archive_holds_exactly_the_installed_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let package_dir = root.join("python");
        let files = [
            "requests/__init__.py",
            "requests/adapters.py",
            "requests-2.31.0.dist-info/METADATA",
            "urllib3/util/retry.py",
            "six.py",
        ];
        for file in files {
            let path = package_dir.join(file);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, format!("# {file}\n")).expect("write");
        }
        fs::create_dir_all(package_dir.join("empty_pkg")).expect("empty dir");

        let archive = root.join("layer.zip");
        let summary = write_layer_archive(root, &package_dir, &archive).expect("archive");

        let expected: BTreeSet<String> = files.iter().map(|file| format!("python/{file}")).collect();
        assert_eq!(archive_names(&archive), expected);
        assert_eq!(summary.entries, files.len());
        assert_eq!(summary.path, archive);
        assert_eq!(summary.bytes, fs::metadata(&archive).expect("meta").len());
        assert_eq!(summary.sha256.len(), 64);
    }

    #[cfg(unix)]
    #[test]
    fn archive_stores_symlinked_files_under_link_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let package_dir = root.join("python");
        let pkg = package_dir.join("pkg");
        fs::create_dir_all(&pkg).expect("mkdir");
        fs::write(pkg.join("real.py"), "answer = 42\n").expect("write");
        std::os::unix::fs::symlink("real.py", pkg.join("alias.py")).expect("symlink");
        fs::create_dir_all(package_dir.join("vendored")).expect("mkdir");
        std::os::unix::fs::symlink("../pkg", package_dir.join("vendored/pkg")).expect("dir link");

        let archive = root.join("layer.zip");
        let summary = write_layer_archive(root, &package_dir, &archive).expect("archive");

        let expected: BTreeSet<String> = ["python/pkg/alias.py", "python/pkg/real.py"]
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(archive_names(&archive), expected);
        assert_eq!(summary.entries, 2);

        let mut zip = zip::ZipArchive::new(File::open(&archive).expect("open")).expect("zip");
        let mut contents = String::new();
        zip.by_name("python/pkg/alias.py")
            .expect("alias entry")
            .read_to_string(&mut contents)
            .expect("read");
        assert_eq!(contents, "answer = 42\n");
    }

    #[test]
    fn archive_entries_are_deflated_and_round_trip_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let package_dir = root.join("python");
        fs::create_dir_all(package_dir.join("pkg")).expect("mkdir");
        let body = "value = 1\n".repeat(200);
        fs::write(package_dir.join("pkg/__init__.py"), &body).expect("write");

        let archive = root.join("layer.zip");
        write_layer_archive(root, &package_dir, &archive).expect("archive");

        let file = File::open(&archive).expect("open");
        let mut zip = zip::ZipArchive::new(file).expect("zip");
        let mut entry = zip.by_name("python/pkg/__init__.py").expect("entry");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut contents = String::new();
        entry.read_to_string(&mut contents).expect("read");
        assert_eq!(contents, body);
    }

    #[test]
    fn empty_package_dir_produces_valid_empty_archive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let package_dir = root.join("python");
        fs::create_dir_all(&package_dir).expect("mkdir");

        let archive = root.join("empty.zip");
        let summary = write_layer_archive(root, &package_dir, &archive).expect("archive");
        assert_eq!(summary.entries, 0);
        assert!(archive_names(&archive).is_empty());
    }

    #[test]
    fn zip_entry_names_use_forward_slashes() {
        let relative: PathBuf = ["python", "pkg", "mod.py"].iter().collect();
        assert_eq!(zip_entry_name(&relative).expect("name"), "python/pkg/mod.py");
        assert!(zip_entry_name(Path::new("../escape.py")).is_err());
    }

    #[test]
    fn format_bytes_scales_values() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
    }
}
