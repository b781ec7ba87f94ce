//! # 位/字节转换模块
//!
//! 字节按最高位优先 (MSB first) 展开为位序列，以及其逆运算。

use crate::error::{Result, StegoError};

/// 将字节序列展开为位序列，每个字节 8 位，最高位在前。
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// 将位序列重新打包为字节。
///
/// # Errors
///
/// 位数不是 8 的倍数时返回 [`StegoError::InvalidLength`]。
pub fn bits_to_bytes(bits: &[bool]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(StegoError::InvalidLength(bits.len()));
    }

    Ok(bits
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_is_msb_first() {
        let bits = bytes_to_bits(&[0b1000_0001]);
        assert_eq!(
            bits,
            vec![true, false, false, false, false, false, false, true]
        );
    }

    #[test]
    fn zero_and_ff() {
        assert_eq!(bytes_to_bits(&[0x00]), vec![false; 8]);
        assert_eq!(bytes_to_bits(&[0xFF]), vec![true; 8]);
    }

    #[test]
    fn all_byte_values_survive() {
        let original: Vec<u8> = (0..=255).collect();
        let bits = bytes_to_bits(&original);
        assert_eq!(bits.len(), 256 * 8);
        assert_eq!(bits_to_bytes(&bits).unwrap(), original);
    }

    #[test]
    fn empty_input() {
        assert!(bytes_to_bits(&[]).is_empty());
        assert!(bits_to_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_partial_byte() {
        let err = bits_to_bytes(&[false, true, false]).unwrap_err();
        assert!(matches!(err, StegoError::InvalidLength(3)));
    }
}
