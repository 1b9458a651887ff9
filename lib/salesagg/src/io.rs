use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref()).with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

/// Regular files under `path` (or `path` itself), in lexical order.
pub fn list_files_recursive(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path.as_ref()).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", path.as_ref().display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn open_reader(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let file = File::open(path.as_ref()).with_context(|| format!("open {}", path.as_ref().display()))?;
    Ok(BufReader::new(file))
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let file = File::create(path.as_ref()).with_context(|| format!("create {}", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}

/// All lines of a reader. Invalid UTF-8 is replaced rather than failing the
/// read, so a corrupt row is dropped by the mapper instead of aborting.
pub fn read_lines_lossy<R: BufRead>(mut reader: R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).context("read input")? == 0 {
            break;
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

/// Lines of every file under each input path, inputs in the order given.
pub fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for inp in inputs {
        for file in list_files_recursive(inp)? {
            let reader = open_reader(&file)?;
            lines.extend(read_lines_lossy(reader).with_context(|| format!("read {}", file.display()))?);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn lossy_lines_keep_terminators_and_replace_bad_bytes() {
        let lines = read_lines_lossy(Cursor::new(b"a,b\n\xffc\nlast".to_vec())).unwrap();
        assert_eq!(lines, vec!["a,b\n".to_string(), "\u{fffd}c\n".to_string(), "last".to_string()]);
    }

    #[test]
    fn inputs_walk_directories_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        ensure_dir(&nested).unwrap();
        let mut w = open_writer(nested.join("b.csv")).unwrap();
        writeln!(w, "second").unwrap();
        drop(w);
        let mut w = open_writer(dir.path().join("a.csv")).unwrap();
        writeln!(w, "first").unwrap();
        drop(w);
        let lines = read_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(lines, vec!["first\n".to_string(), "second\n".to_string()]);
    }
}
