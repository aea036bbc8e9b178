use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
/// Byte order of multi-byte numbers in a file
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn is_big(&self) -> bool {
        matches!(self, ByteOrder::Big)
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little-endian"),
            ByteOrder::Big => write!(f, "big-endian"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Text Encoding
pub enum Encoding {
    /// Try UTF-8 first, then Windows-1252
    Auto,
    /// UTF-8 encoding
    Utf8,
    /// Windows-1252 encoding
    Cp1252,
    /// Shift-JIS encoding
    Cp932,
    /// GBK encoding
    Gb2312,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Cp1252
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
/// Text Encoding
pub enum TextEncoding {
    /// Try UTF-8 first, then Windows-1252
    Auto,
    /// UTF-8 encoding
    Utf8,
    #[value(alias("windows-1252"), alias("latin1"))]
    /// Windows-1252 encoding
    Cp1252,
    #[value(alias("jis"))]
    /// Shift-JIS encoding
    Cp932,
    #[value(alias("gbk"))]
    /// GB2312 encoding
    Gb2312,
}

impl From<TextEncoding> for Encoding {
    fn from(value: TextEncoding) -> Self {
        match value {
            TextEncoding::Auto => Encoding::Auto,
            TextEncoding::Utf8 => Encoding::Utf8,
            TextEncoding::Cp1252 => Encoding::Cp1252,
            TextEncoding::Cp932 => Encoding::Cp932,
            TextEncoding::Gb2312 => Encoding::Gb2312,
        }
    }
}
