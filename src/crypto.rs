//! # 加密模块
//!
//! AES-256-CBC (PKCS#7 填充)，密钥由 PBKDF2-HMAC-SHA256 从密码派生。
//! 输出格式为 `salt(16) ∥ iv(16) ∥ ciphertext`。
//!
//! CBC 模式只提供机密性，不提供认证：错误的密码通常表现为填充校验失败，
//! 但并不保证一定失败。完整性由外层的 SHA-256 校验和负责，它覆盖的是密文。

use aes::Aes256;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use sha2::Sha256;

use crate::constants::{IV_LEN, KEY_LEN, PBKDF2_ROUNDS, SALT_LEN};
use crate::error::{Result, StegoError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// 使用密码加密数据，每次调用生成新的随机盐和 IV。
pub fn encrypt(data: &[u8], password: &str) -> Vec<u8> {
    let mut rng = rand::rng();

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let ciphertext =
        Aes256CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(data);

    let mut blob = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    blob
}

/// 解密 [`encrypt`] 生成的数据。
///
/// # Errors
///
/// * [`StegoError::BlobTooShort`] - 数据不足以容纳盐、IV 和一个密文块。
/// * [`StegoError::DecryptionFailed`] - 密码错误或数据损坏 (二者无法区分)。
pub fn decrypt(blob: &[u8], password: &str) -> Result<Vec<u8>> {
    if blob.len() < SALT_LEN + IV_LEN + 16 {
        return Err(StegoError::BlobTooShort(blob.len()));
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let key = derive_key(password, salt);
    let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| StegoError::DecryptionFailed)?;

    Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| StegoError::DecryptionFailed)
}
