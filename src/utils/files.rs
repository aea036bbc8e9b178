use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Returns true if the file extension is one of `exts`, ignoring case and a leading dot.
pub fn has_valid_extension(path: &Path, exts: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    exts.iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

pub fn find_files(dir: &Path, recursive: bool, exts: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_file() && has_valid_extension(&path, exts) {
            result.push(path);
        } else if recursive && file_type.is_dir() {
            let mut sub_files = find_files(&path, recursive, exts)?;
            result.append(&mut sub_files);
        }
    }
    Ok(result)
}

/// Expands source paths into a sorted list of files without duplicates.
///
/// Directories are searched for files with a valid extension. Files named directly are
/// always taken.
pub fn collect_files<S: AsRef<Path>>(
    sources: &[S],
    recursive: bool,
    exts: &[String],
) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for source in sources {
        let pa = source.as_ref();
        if pa.is_dir() {
            log::debug!("Searching: {}", pa.display());
            result.append(&mut find_files(pa, recursive, exts)?);
        } else if pa.is_file() {
            result.push(pa.to_path_buf());
        } else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Path {} is neither a file nor a directory", pa.display()),
            ));
        }
    }
    result.sort();
    result.dedup();
    Ok(result)
}

/// Reads a whole file. `-` reads standard input.
pub fn read_file<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    if f.as_ref() == Path::new("-") {
        io::stdin().read_to_end(&mut content)?;
    } else {
        content = fs::read(f)?;
    }
    Ok(content)
}

#[test]
fn test_has_valid_extension() {
    let exts = vec![String::from("pex"), String::from(".psc")];
    assert!(has_valid_extension(Path::new("a/Foo.pex"), &exts));
    assert!(has_valid_extension(Path::new("Foo.PEX"), &exts));
    assert!(has_valid_extension(Path::new("Foo.psc"), &exts));
    assert!(!has_valid_extension(Path::new("Foo.pex.bak"), &exts));
    assert!(!has_valid_extension(Path::new("pex"), &exts));
}

#[test]
fn test_collect_files_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    for name in ["b.pex", "a.pex", "c.txt"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    fs::write(sub.join("d.pex"), b"x").unwrap();
    let exts = vec![String::from("pex")];

    let flat = collect_files(&[dir.path()], false, &exts).unwrap();
    assert_eq!(flat, vec![dir.path().join("a.pex"), dir.path().join("b.pex")]);

    let explicit = dir.path().join("c.txt");
    let deep = collect_files(&[dir.path(), explicit.as_path()], true, &exts).unwrap();
    assert_eq!(
        deep,
        vec![
            dir.path().join("a.pex"),
            dir.path().join("b.pex"),
            dir.path().join("c.txt"),
            sub.join("d.pex"),
        ]
    );

    assert!(collect_files(&[dir.path().join("missing")], false, &exts).is_err());
}
