//! # 载荷封装模块
//!
//! 隐藏数据流的格式为 `header ∥ body`：
//!
//! | 字段       | 长度 | 说明                                   |
//! |------------|------|----------------------------------------|
//! | magic      | 4    | `STEG`                                 |
//! | size       | 4    | body 长度，大端无符号整数              |
//! | checksum   | 32   | body 的 SHA-256 摘要                   |
//! | flags      | 1    | bits-per-channel / adaptive / encrypted |
//!
//! body 是 gzip 压缩后 (可选再加密) 的文件内容，校验和针对写入图像的原始字节计算。

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tracing::debug;

use crate::constants::{
    CHECKSUM_SIZE, FLAG_ADAPTIVE, FLAG_BITS_MASK, FLAG_ENCRYPTED, FLAG_RESERVED_MASK, HEADER_SIZE,
    MAGIC,
};
use crate::crypto;
use crate::error::{Result, StegoError};

/// 每个颜色通道使用的低位数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitsPerChannel {
    #[default]
    One,
    Two,
}

impl BitsPerChannel {
    pub fn get(self) -> u8 {
        match self {
            BitsPerChannel::One => 1,
            BitsPerChannel::Two => 2,
        }
    }

    /// 清除低位所用的掩码，例如 2 bit 时为 `0b1111_1100`。
    pub fn clear_mask(self) -> u8 {
        !((1u8 << self.get()) - 1)
    }
}

impl TryFrom<u8> for BitsPerChannel {
    type Error = StegoError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(BitsPerChannel::One),
            2 => Ok(BitsPerChannel::Two),
            other => Err(StegoError::InvalidConfiguration(other)),
        }
    }
}

/// 头部中的标志字节。
///
/// `bits_per_channel` 保存原始的 2 位数值，读取时不做校验；保留位原样保留，
/// 保证 `from_byte` 与 `to_byte` 互为逆运算。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub bits_per_channel: u8,
    pub adaptive: bool,
    pub encrypted: bool,
    pub reserved: u8,
}

impl Flags {
    pub fn new(bits_per_channel: BitsPerChannel, adaptive: bool, encrypted: bool) -> Self {
        Self {
            bits_per_channel: bits_per_channel.get(),
            adaptive,
            encrypted,
            reserved: 0,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            bits_per_channel: byte & FLAG_BITS_MASK,
            adaptive: byte & FLAG_ADAPTIVE != 0,
            encrypted: byte & FLAG_ENCRYPTED != 0,
            reserved: byte & FLAG_RESERVED_MASK,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = self.bits_per_channel & FLAG_BITS_MASK;
        if self.adaptive {
            byte |= FLAG_ADAPTIVE;
        }
        if self.encrypted {
            byte |= FLAG_ENCRYPTED;
        }
        byte | (self.reserved & FLAG_RESERVED_MASK)
    }
}

/// 固定长度的载荷头部。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub payload_size: u32,
    pub checksum: [u8; CHECKSUM_SIZE],
    pub flags: Flags,
}

impl Header {
    pub fn has_valid_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.payload_size.to_be_bytes());
        buf[8..8 + CHECKSUM_SIZE].copy_from_slice(&self.checksum);
        buf[HEADER_SIZE - 1] = self.flags.to_byte();
        buf
    }
}

/// 解析头部，不校验魔数 (由调用方检查)。
///
/// # Errors
///
/// 输入少于 [`HEADER_SIZE`] 字节时返回 [`StegoError::HeaderTooShort`]。
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_SIZE {
        return Err(StegoError::HeaderTooShort(bytes.len()));
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[0..4]);
    let mut size = [0u8; 4];
    size.copy_from_slice(&bytes[4..8]);
    let mut checksum = [0u8; CHECKSUM_SIZE];
    checksum.copy_from_slice(&bytes[8..8 + CHECKSUM_SIZE]);

    Ok(Header {
        magic,
        payload_size: u32::from_be_bytes(size),
        checksum,
        flags: Flags::from_byte(bytes[HEADER_SIZE - 1]),
    })
}

fn digest(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    Sha256::digest(data).into()
}

/// 重新计算 SHA-256 并与期望值比较。
pub fn verify_checksum(payload: &[u8], expected: &[u8; CHECKSUM_SIZE]) -> bool {
    digest(payload) == *expected
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|e| StegoError::DecompressionError(e.to_string()))?;
    Ok(decoded)
}

/// 构建完整的隐藏数据流：压缩、(可选) 加密、计算校验和并添加头部。
///
/// 空密码等同于不加密。
///
/// # Errors
///
/// 压缩后的 body 超出 `u32` 范围时返回 [`StegoError::PayloadTooLarge`]。
pub fn build_payload(
    file_bytes: &[u8],
    bits_per_channel: BitsPerChannel,
    adaptive: bool,
    password: Option<&str>,
) -> Result<Vec<u8>> {
    let compressed = compress(file_bytes)?;

    let (body, encrypted) = match password.filter(|p| !p.is_empty()) {
        Some(password) => (crypto::encrypt(&compressed, password), true),
        None => (compressed, false),
    };

    let payload_size =
        u32::try_from(body.len()).map_err(|_| StegoError::PayloadTooLarge(body.len()))?;

    let header = Header {
        magic: MAGIC,
        payload_size,
        checksum: digest(&body),
        flags: Flags::new(bits_per_channel, adaptive, encrypted),
    };

    debug!(
        file_bytes = file_bytes.len(),
        body_bytes = body.len(),
        encrypted,
        "built payload"
    );

    let mut payload = Vec::with_capacity(HEADER_SIZE + body.len());
    payload.extend_from_slice(&header.to_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

/// 读取源文件并构建载荷。
///
/// # Errors
///
/// * [`StegoError::SourceFileMissing`] - 源文件不存在。
/// * [`StegoError::Io`] - 其他读取错误。
pub fn build_payload_from_file(
    path: &Path,
    bits_per_channel: BitsPerChannel,
    adaptive: bool,
    password: Option<&str>,
) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StegoError::SourceFileMissing(path.to_path_buf()),
        _ => StegoError::Io(e),
    })?;
    build_payload(&data, bits_per_channel, adaptive, password)
}

/// 校验并还原提取到的 body：校验和 → (可选) 解密 → 解压。
///
/// # Errors
///
/// * [`StegoError::ChecksumMismatch`] - 摘要不一致。
/// * [`StegoError::PasswordRequired`] - 载荷已加密但未提供密码。
/// * [`StegoError::DecryptionFailed`] - 密码错误或数据损坏。
/// * [`StegoError::DecompressionError`] - 未加密的 body 不是合法的 gzip 流。
pub fn open_payload(header: &Header, body: &[u8], password: Option<&str>) -> Result<Vec<u8>> {
    if !verify_checksum(body, &header.checksum) {
        return Err(StegoError::ChecksumMismatch);
    }

    if !header.flags.encrypted {
        return decompress(body);
    }

    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(StegoError::PasswordRequired)?;
    let compressed = crypto::decrypt(body, password)?;

    // 错误的密钥偶尔也能通过 PKCS#7 检查，此时只有解压能发现问题
    decompress(&compressed).map_err(|_| StegoError::DecryptionFailed)
}
