//! The closed set of game targets a pex compiler can produce files for.
use super::header::{PEX_MAGIC, PexHeader};
use crate::types::ByteOrder;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "camelCase")]
/// Game variant
pub enum GameVariant {
    /// The Elder Scrolls V: Skyrim
    Skyrim,
    #[value(alias("skyrimSE"), alias("sse"))]
    /// The Elder Scrolls V: Skyrim Special Edition
    SkyrimSe,
    #[value(alias("fo4"))]
    /// Fallout 4
    Fallout4,
}

/// Constants that identify one variant.
#[derive(Debug)]
pub struct VariantDescriptor {
    pub variant: GameVariant,
    pub name: &'static str,
    pub magic: u32,
    pub major_version: u8,
    pub minor_version: u8,
    pub game_id: u16,
    /// Byte order of the header and of every string length prefix.
    pub byte_order: ByteOrder,
    /// The compiler stores the absolute path of its temp copy in the source file name.
    pub strips_source_path: bool,
}

/// Known variants in identification priority order.
pub static VARIANTS: [VariantDescriptor; 3] = [
    VariantDescriptor {
        variant: GameVariant::Skyrim,
        name: "skyrim",
        magic: PEX_MAGIC,
        major_version: 3,
        minor_version: 2,
        game_id: 1,
        byte_order: ByteOrder::Little,
        strips_source_path: false,
    },
    VariantDescriptor {
        variant: GameVariant::SkyrimSe,
        name: "skyrimSE",
        magic: PEX_MAGIC,
        major_version: 3,
        minor_version: 1,
        game_id: 1,
        byte_order: ByteOrder::Big,
        strips_source_path: false,
    },
    VariantDescriptor {
        variant: GameVariant::Fallout4,
        name: "fallout4",
        magic: PEX_MAGIC,
        major_version: 3,
        minor_version: 9,
        game_id: 2,
        byte_order: ByteOrder::Little,
        strips_source_path: true,
    },
];

impl VariantDescriptor {
    fn matches(&self, header: &PexHeader) -> bool {
        header.major_version == self.major_version
            && header.minor_version == self.minor_version
            && header.game_id == self.game_id
    }
}

impl GameVariant {
    pub fn descriptor(&self) -> &'static VariantDescriptor {
        match self {
            GameVariant::Skyrim => &VARIANTS[0],
            GameVariant::SkyrimSe => &VARIANTS[1],
            GameVariant::Fallout4 => &VARIANTS[2],
        }
    }

    /// Finds the variant whose version and game id match the header exactly.
    pub fn identify(header: &PexHeader) -> Option<Self> {
        VARIANTS
            .iter()
            .find(|desc| desc.matches(header))
            .map(|desc| desc.variant)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.descriptor().byte_order
    }

    pub fn strips_source_path(&self) -> bool {
        self.descriptor().strips_source_path
    }

    /// Creates a header for this variant, stamped with the current time.
    pub fn new_header(&self) -> PexHeader {
        let desc = self.descriptor();
        let compilation_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        PexHeader {
            magic: desc.magic,
            major_version: desc.major_version,
            minor_version: desc.minor_version,
            game_id: desc.game_id,
            compilation_time,
        }
    }
}

impl std::fmt::Display for GameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.descriptor().name)
    }
}

impl std::str::FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <GameVariant as ValueEnum>::from_str(s, true)
    }
}

#[cfg(test)]
fn header_for(major_version: u8, minor_version: u8, game_id: u16) -> PexHeader {
    PexHeader {
        magic: PEX_MAGIC,
        major_version,
        minor_version,
        game_id,
        compilation_time: 0,
    }
}

#[test]
fn test_identify() {
    assert_eq!(
        GameVariant::identify(&header_for(3, 2, 1)),
        Some(GameVariant::Skyrim)
    );
    assert_eq!(
        GameVariant::identify(&header_for(3, 1, 1)),
        Some(GameVariant::SkyrimSe)
    );
    assert_eq!(
        GameVariant::identify(&header_for(3, 9, 2)),
        Some(GameVariant::Fallout4)
    );
    assert_eq!(GameVariant::identify(&header_for(3, 9, 1)), None);
    assert_eq!(GameVariant::identify(&header_for(3, 2, 2)), None);
    assert_eq!(GameVariant::identify(&header_for(2, 1, 1)), None);
}

#[test]
fn test_descriptor_roundtrip() {
    for desc in VARIANTS.iter() {
        let header = desc.variant.new_header();
        assert_eq!(header.magic, PEX_MAGIC);
        assert_eq!(GameVariant::identify(&header), Some(desc.variant));
        assert_eq!(desc.variant.descriptor().variant, desc.variant);
    }
}

#[test]
fn test_from_name() {
    assert_eq!("skyrim".parse::<GameVariant>(), Ok(GameVariant::Skyrim));
    assert_eq!("skyrimSE".parse::<GameVariant>(), Ok(GameVariant::SkyrimSe));
    assert_eq!("skyrim-se".parse::<GameVariant>(), Ok(GameVariant::SkyrimSe));
    assert_eq!("fallout4".parse::<GameVariant>(), Ok(GameVariant::Fallout4));
    assert!("oblivion".parse::<GameVariant>().is_err());
}
