//! # 错误类型模块
//!
//! [`StegoError`] 覆盖隐写编解码过程中所有可区分的失败情况。
//! 每一种错误都会中止当前操作，不做自动重试。

use std::path::PathBuf;
use thiserror::Error;

/// 隐写嵌入、提取以及载荷封装过程中可能出现的错误。
#[derive(Error, Debug)]
pub enum StegoError {
    #[error("Unsupported bits per channel: {0} (expected 1 or 2)")]
    InvalidConfiguration(u8),

    #[error("Source file not found: {}", .0.display())]
    SourceFileMissing(PathBuf),

    #[error("Image file not found: {}", .0.display())]
    ImageMissing(PathBuf),

    #[error(
        "Not enough space in the image to hide the payload. \nRequired: {required} bytes, Available: {capacity} bytes"
    )]
    CapacityExceeded { required: usize, capacity: usize },

    #[error("Payload of {0} bytes does not fit in the 32-bit size field")]
    PayloadTooLarge(usize),

    #[error("Magic header not found. \nThe image may not contain hidden data, or the settings differ from those used to hide it.")]
    BadMagic,

    #[error("Too few bytes for a header: got {0}")]
    HeaderTooShort(usize),

    #[error("Bit count {0} is not a multiple of 8")]
    InvalidLength(usize),

    #[error("Image ran out of pixels: needed {needed} bits, gathered {available}")]
    InsufficientBits { needed: usize, available: usize },

    #[error("Checksum mismatch. \nThe hidden data is corrupted.")]
    ChecksumMismatch,

    #[error("The hidden data is encrypted; a password is required")]
    PasswordRequired,

    #[error("Decryption failed: wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Encrypted data too short: {0} bytes")]
    BlobTooShort(usize),

    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    #[error("Texture map unavailable: {0}")]
    TextureUnavailable(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 本库统一使用的 `Result` 别名。
pub type Result<T> = std::result::Result<T, StegoError>;
