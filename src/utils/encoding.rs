use crate::types::*;

pub fn decode_to_string(encoding: Encoding, data: &[u8]) -> Result<String, anyhow::Error> {
    match encoding {
        Encoding::Auto => decode_to_string(Encoding::Utf8, data)
            .or_else(|_| decode_to_string(Encoding::Cp1252, data)),
        Encoding::Utf8 => Ok(String::from_utf8(data.to_vec())?),
        Encoding::Cp1252 => decode_with(encoding_rs::WINDOWS_1252, data, "Windows-1252"),
        Encoding::Cp932 => decode_with(encoding_rs::SHIFT_JIS, data, "Shift-JIS"),
        Encoding::Gb2312 => decode_with(encoding_rs::GBK, data, "GB2312"),
    }
}

pub fn encode_string(encoding: Encoding, data: &str) -> Result<Vec<u8>, anyhow::Error> {
    match encoding {
        Encoding::Auto | Encoding::Utf8 => Ok(data.as_bytes().to_vec()),
        Encoding::Cp1252 => encode_with(encoding_rs::WINDOWS_1252, data, "Windows-1252"),
        Encoding::Cp932 => encode_with(encoding_rs::SHIFT_JIS, data, "Shift-JIS"),
        Encoding::Gb2312 => encode_with(encoding_rs::GBK, data, "GB2312"),
    }
}

fn decode_with(
    enc: &'static encoding_rs::Encoding,
    data: &[u8],
    name: &str,
) -> Result<String, anyhow::Error> {
    let result = enc.decode_without_bom_handling(data);
    if result.1 {
        Err(anyhow::anyhow!("Failed to decode {}", name))
    } else {
        Ok(result.0.into_owned())
    }
}

fn encode_with(
    enc: &'static encoding_rs::Encoding,
    data: &str,
    name: &str,
) -> Result<Vec<u8>, anyhow::Error> {
    let result = enc.encode(data);
    if result.2 {
        Err(anyhow::anyhow!(
            "Some characters could not be encoded in {}: {}",
            name,
            data
        ))
    } else {
        Ok(result.0.into_owned())
    }
}

#[test]
fn test_decode_to_string() {
    assert_eq!(
        decode_to_string(Encoding::Utf8, &[0x41, 0x6C, 0x69, 0x63, 0x65]).unwrap(),
        "Alice".to_string()
    );
    assert_eq!(
        decode_to_string(Encoding::Cp1252, &[0x4A, 0x6F, 0x73, 0xE9]).unwrap(),
        "José".to_string()
    );
    assert_eq!(
        decode_to_string(Encoding::Auto, &[0x4A, 0x6F, 0x73, 0xE9]).unwrap(),
        "José".to_string()
    );
    assert_eq!(
        decode_to_string(Encoding::Auto, &[0x4A, 0x6F, 0x73, 0xC3, 0xA9]).unwrap(),
        "José".to_string()
    );
    assert!(decode_to_string(Encoding::Utf8, &[0xE9]).is_err());
}

#[test]
fn test_encode_string() {
    assert_eq!(encode_string(Encoding::Cp1252, "*").unwrap(), vec![0x2A]);
    assert_eq!(encode_string(Encoding::Cp1252, "é").unwrap(), vec![0xE9]);
    assert_eq!(encode_string(Encoding::Utf8, "é").unwrap(), vec![0xC3, 0xA9]);
    assert_eq!(
        encode_string(Encoding::Cp932, "きゃ").unwrap(),
        vec![130, 171, 130, 225]
    );
    assert!(encode_string(Encoding::Cp1252, "中").is_err());
}
