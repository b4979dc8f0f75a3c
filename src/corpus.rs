//! Facilities for discovering input files and loading text corpora.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{BpeError, Result};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Directories are traversed recursively by default; set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level. Files within a directory are returned in name order
/// so training input order, and with it the learned vocabulary, is reproducible.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(BpeError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let max_depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .follow_links(cfg.follow_symlinks)
                .max_depth(max_depth)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|err| BpeError::Internal(err.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(BpeError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads every discovered file as one training text.
///
/// Files must be UTF-8; anything else is reported with its path.
pub fn load_text_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<String>> {
    let file_paths = collect_paths(inputs, cfg)?;
    let mut texts = Vec::with_capacity(file_paths.len());
    for file_path in file_paths {
        let bytes = fs::read(&file_path).map_err(|err| BpeError::io(err, Some(file_path.clone())))?;
        let text = String::from_utf8(bytes).map_err(|err| {
            BpeError::InvalidConfig(format!(
                "{} is not valid UTF-8: {}",
                file_path.display(),
                err.utf8_error()
            ))
        })?;
        texts.push(text);
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(&file_b, "beta").expect("write b");

        let cfg = IngestConfig::default();
        let mut paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        paths.sort();
        assert_eq!(paths, vec![file_a.clone(), file_b]);

        let shallow = IngestConfig::builder().recursive(false).build();
        let paths = collect_paths(&[dir.path()], &shallow).expect("collect shallow");
        assert_eq!(paths, vec![file_a]);
    }

    #[test]
    fn load_text_corpus_reads_whole_files() {
        let dir = tempdir().expect("tempdir");
        let cn = dir.path().join("train-cn.txt");
        let en = dir.path().join("train-en.txt");
        fs::write(&cn, "今天的天气").expect("write cn");
        fs::write(&en, "the weather today").expect("write en");

        let texts =
            load_text_corpus(&[cn, en], &IngestConfig::default()).expect("load corpus");
        assert_eq!(texts, vec!["今天的天气".to_string(), "the weather today".to_string()]);
    }

    #[test]
    fn load_text_corpus_rejects_non_utf8() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("blob.bin");
        fs::write(&file, [0xFFu8, 0xFE, 0x00]).expect("write blob");
        let err = load_text_corpus(&[file], &IngestConfig::default()).expect_err("binary input");
        assert!(matches!(err, BpeError::InvalidConfig(message) if message.contains("UTF-8")));
    }

    #[test]
    fn missing_inputs_are_reported() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(collect_paths(&[missing], &IngestConfig::default()).is_err());
    }
}
