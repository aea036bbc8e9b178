//! Settings from the config file, merged with the command line.
use crate::args::AnonymizeArgs;
use anyhow::Context;
use ini::{Ini, ParseOption};
use pex_anon::anon::AnonymizeConfig;
use pex_anon::types::*;
use pex_anon::utils::encoding::encode_string;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "pex_anon.cfg";

/// Backslashes are kept as they are so Windows paths can be written plainly.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..Default::default()
    }
}

/// Values read from the config file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub sources: Vec<String>,
    pub backup: Option<bool>,
    pub mask: Option<String>,
    pub recursive: Option<bool>,
    pub verbose: Option<bool>,
    pub backup_extension: Option<String>,
    pub temp_extension: Option<String>,
    pub valid_extensions: Vec<String>,
    pub jobs: Option<usize>,
    pub encoding: Option<Encoding>,
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("Invalid value for {}: {}", key, value)),
    }
}

impl FileConfig {
    /// Loads `path`, or the default config file if there is one.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => DEFAULT_CONFIG_FILE,
            None => return Ok(Self::default()),
        };
        let ini = Ini::load_from_file_opt(path, parse_option())
            .map_err(|e| anyhow::anyhow!("Failed to load config file {}: {}", path, e))?;
        Self::from_ini(&ini).with_context(|| format!("Invalid config file {}", path))
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let ini = Ini::load_from_str_opt(data, parse_option())?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> anyhow::Result<Self> {
        let general = ini.general_section();
        let get_bool = |key: &str| -> anyhow::Result<Option<bool>> {
            general.get(key).map(|v| parse_bool(key, v)).transpose()
        };
        let get_string = |key: &str| general.get(key).map(|v| v.trim().to_string());
        let get_all = |key: &str| -> Vec<String> {
            general
                .get_all(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };
        let jobs = match general.get("jobs") {
            Some(v) => Some(
                v.trim()
                    .parse::<usize>()
                    .map_err(|e| anyhow::anyhow!("Invalid value for jobs: {} ({})", v, e))?,
            ),
            None => None,
        };
        let encoding = match general.get("encoding") {
            Some(v) => Some(Encoding::from(
                <TextEncoding as clap::ValueEnum>::from_str(v.trim(), true)
                    .map_err(|e| anyhow::anyhow!("Invalid value for encoding: {}", e))?,
            )),
            None => None,
        };
        Ok(Self {
            sources: get_all("source"),
            backup: get_bool("backup")?,
            mask: get_string("mask"),
            recursive: get_bool("recursive")?,
            verbose: get_bool("verbose")?,
            backup_extension: get_string("backup-extension"),
            temp_extension: get_string("temp-extension"),
            valid_extensions: get_all("valid-extension"),
            jobs,
            encoding,
        })
    }
}

/// Everything the anonymize command needs, after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub sources: Vec<String>,
    pub recursive: bool,
    pub valid_extensions: Vec<String>,
    pub jobs: usize,
    pub anonymize: AnonymizeConfig,
}

pub fn resolve_encoding(arg: Option<TextEncoding>, file: &FileConfig) -> Encoding {
    arg.map(Encoding::from)
        .or(file.encoding)
        .unwrap_or_default()
}

/// Converts the mask character into the single byte written to the file.
pub fn mask_byte(mask: &str, encoding: Encoding) -> anyhow::Result<u8> {
    let mut chars = mask.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(anyhow::anyhow!(
            "Mask must be a single character, got {:?}",
            mask
        ));
    };
    let bytes = encode_string(encoding, c.encode_utf8(&mut [0u8; 4]))?;
    match bytes.as_slice() {
        [b] => Ok(*b),
        _ => Err(anyhow::anyhow!(
            "Mask {:?} takes {} bytes in the selected encoding, only single byte characters can be used",
            c,
            bytes.len()
        )),
    }
}

fn normalize_extension(ext: &str) -> anyhow::Result<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return Err(anyhow::anyhow!("Invalid file extension: {:?}", ext));
    }
    Ok(ext.to_string())
}

/// Merges the command line over the config file. Flags set on the command line win;
/// lists from the file are only used when the command line gives none.
pub fn resolve(
    args: &AnonymizeArgs,
    file: &FileConfig,
    encoding: Encoding,
) -> anyhow::Result<RunSettings> {
    let sources = if !args.source.is_empty() {
        args.source.clone()
    } else if !file.sources.is_empty() {
        file.sources.clone()
    } else {
        vec![String::from(".")]
    };
    let valid_extensions = if !args.valid_extensions.is_empty() {
        &args.valid_extensions
    } else {
        &file.valid_extensions
    };
    let valid_extensions = if valid_extensions.is_empty() {
        vec![String::from("pex")]
    } else {
        valid_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect::<anyhow::Result<Vec<_>>>()?
    };
    let mask = match (&args.mask, &file.mask) {
        (Some(c), _) => mask_byte(&c.to_string(), encoding)?,
        (None, Some(m)) => mask_byte(m, encoding)?,
        (None, None) => b'*',
    };
    let defaults = AnonymizeConfig::default();
    let backup_extension = match args.backup_extension.as_ref().or(file.backup_extension.as_ref()) {
        Some(ext) => normalize_extension(ext)?,
        None => defaults.backup_extension,
    };
    let temp_extension = match args.temp_extension.as_ref().or(file.temp_extension.as_ref()) {
        Some(ext) => normalize_extension(ext)?,
        None => defaults.temp_extension,
    };
    if backup_extension.eq_ignore_ascii_case(&temp_extension) {
        return Err(anyhow::anyhow!(
            "Backup and temp files cannot share the extension {}",
            temp_extension
        ));
    }
    if valid_extensions
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&temp_extension) || e.eq_ignore_ascii_case(&backup_extension))
    {
        return Err(anyhow::anyhow!(
            "Backup and temp extensions must differ from the extensions being processed"
        ));
    }
    Ok(RunSettings {
        sources,
        recursive: args.recursive || file.recursive.unwrap_or(false),
        valid_extensions,
        jobs: args.jobs.or(file.jobs).unwrap_or(1),
        anonymize: AnonymizeConfig {
            mask,
            backup: args.backup || file.backup.unwrap_or(false),
            backup_extension,
            temp_extension,
        },
    })
}

#[test]
fn test_parse_config_file() {
    let cfg = FileConfig::parse(
        "source = C:\\Games\\Data\nsource = Mods\nbackup = true\nmask = @\nrecursive = 1\n\
         backup-extension = orig\nvalid-extension = .pex\njobs = 4\nencoding = utf8\n",
    )
    .unwrap();
    assert_eq!(cfg.sources, vec!["C:\\Games\\Data", "Mods"]);
    assert_eq!(cfg.backup, Some(true));
    assert_eq!(cfg.mask.as_deref(), Some("@"));
    assert_eq!(cfg.recursive, Some(true));
    assert_eq!(cfg.verbose, None);
    assert_eq!(cfg.backup_extension.as_deref(), Some("orig"));
    assert_eq!(cfg.valid_extensions, vec![".pex"]);
    assert_eq!(cfg.jobs, Some(4));
    assert_eq!(cfg.encoding, Some(Encoding::Utf8));
}

#[test]
fn test_bad_config_value() {
    assert!(FileConfig::parse("backup = maybe\n").is_err());
    assert!(FileConfig::parse("jobs = many\n").is_err());
}

#[test]
fn test_command_line_wins() {
    let file = FileConfig::parse("source = Data\nmask = @\ntemp-extension = work\n").unwrap();
    let args = AnonymizeArgs {
        source: vec![String::from("Other")],
        mask: Some('x'),
        ..Default::default()
    };
    let settings = resolve(&args, &file, Encoding::Cp1252).unwrap();
    assert_eq!(settings.sources, vec!["Other"]);
    assert_eq!(settings.anonymize.mask, b'x');
    assert_eq!(settings.anonymize.temp_extension, "work");
    assert_eq!(settings.anonymize.backup_extension, "bak");
    assert_eq!(settings.valid_extensions, vec!["pex"]);
    assert_eq!(settings.jobs, 1);

    let settings = resolve(&AnonymizeArgs::default(), &file, Encoding::Cp1252).unwrap();
    assert_eq!(settings.sources, vec!["Data"]);
    assert_eq!(settings.anonymize.mask, b'@');
}

#[test]
fn test_defaults() {
    let settings = resolve(&AnonymizeArgs::default(), &FileConfig::default(), Encoding::Cp1252)
        .unwrap();
    assert_eq!(settings.sources, vec!["."]);
    assert!(!settings.recursive);
    assert_eq!(settings.anonymize, AnonymizeConfig::default());
}

#[test]
fn test_mask_byte() {
    assert_eq!(mask_byte("*", Encoding::Cp1252).unwrap(), b'*');
    assert_eq!(mask_byte("é", Encoding::Cp1252).unwrap(), 0xE9);
    assert!(mask_byte("é", Encoding::Utf8).is_err());
    assert!(mask_byte("ab", Encoding::Cp1252).is_err());
    assert!(mask_byte("", Encoding::Cp1252).is_err());
}

#[test]
fn test_extension_clash() {
    let args = AnonymizeArgs {
        temp_extension: Some(String::from("bak")),
        ..Default::default()
    };
    assert!(resolve(&args, &FileConfig::default(), Encoding::Cp1252).is_err());
    let args = AnonymizeArgs {
        temp_extension: Some(String::from("BAK")),
        ..Default::default()
    };
    assert!(resolve(&args, &FileConfig::default(), Encoding::Cp1252).is_err());
    let args = AnonymizeArgs {
        valid_extensions: vec![String::from("tmp")],
        ..Default::default()
    };
    assert!(resolve(&args, &FileConfig::default(), Encoding::Cp1252).is_err());
}
