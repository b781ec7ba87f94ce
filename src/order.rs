//! # 像素顺序模块
//!
//! 嵌入与提取都按同一个像素索引排列访问图像。排列由以下输入完全决定：
//!
//! 1. 图像尺寸；
//! 2. 由密码派生的 32 位种子 (无密码时为 0)；
//! 3. 可选的纹理自适应排序。
//!
//! 乱序使用 `ChaCha20Rng::seed_from_u64(seed)` 加自顶向下的 Fisher-Yates，
//! 每一步以 `u32` 范围取随机数，这样 32 位与 64 位平台上的消耗完全一致。
//! 这一组合属于数据格式的一部分，改动会使旧图像无法提取。
//!
//! 注意：种子只有 32 位，排列的密钥空间上限为 2^32，远低于密码本身的熵。

use image::RgbImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::TEXTURE_MASK;
use crate::error::{Result, StegoError};

/// 由密码派生乱序种子：SHA-256 摘要按大端整数取模 2^32。
pub fn password_seed(password: Option<&str>) -> u32 {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => {
            let digest = Sha256::digest(password.as_bytes());
            u32::from_be_bytes([digest[28], digest[29], digest[30], digest[31]])
        }
        None => 0,
    }
}

fn shuffle(indices: &mut [usize], seed: u32) {
    let mut rng = ChaCha20Rng::seed_from_u64(u64::from(seed));
    for i in (1..indices.len()).rev() {
        let j = rng.random_range(0..=(i as u32)) as usize;
        indices.swap(i, j);
    }
}

/// 计算每个像素 3×3 邻域内亮度的总体方差。
///
/// 计算前会清除每个通道的低 2 位，因此隐写前后的图像得到相同的纹理图。
/// 边界像素按边缘复制处理。
///
/// # Errors
///
/// 图像尺寸与请求的网格不一致或网格为空时返回 [`StegoError::TextureUnavailable`]，
/// 调用方据此决定是否退回非自适应顺序。
pub fn texture_map(image: &RgbImage, width: u32, height: u32) -> Result<Vec<f64>> {
    if image.dimensions() != (width, height) {
        let (w, h) = image.dimensions();
        return Err(StegoError::TextureUnavailable(format!(
            "image is {w}x{h}, expected {width}x{height}"
        )));
    }
    if width == 0 || height == 0 {
        return Err(StegoError::TextureUnavailable("empty image".to_string()));
    }

    let mut masked = image.clone();
    masked.iter_mut().for_each(|channel| *channel &= TEXTURE_MASK);
    let luma = image::imageops::grayscale(&masked);

    let (w, h) = (width as i64, height as i64);
    let at = |x: i64, y: i64| -> f64 {
        let x = x.clamp(0, w - 1) as u32;
        let y = y.clamp(0, h - 1) as u32;
        f64::from(luma.get_pixel(x, y).0[0])
    };

    let mut variances = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..h {
        for x in 0..w {
            let mut window = [0f64; 9];
            let mut k = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    window[k] = at(x + dx, y + dy);
                    k += 1;
                }
            }
            let mean = window.iter().sum::<f64>() / 9.0;
            let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 9.0;
            variances.push(var);
        }
    }

    Ok(variances)
}

/// 生成像素访问顺序，返回 `[0, width*height)` 的一个排列。
///
/// `adaptive` 为真且提供了图像时，按纹理方差从高到低稳定排序，
/// 方差相同的像素保持乱序后的相对顺序。纹理图不可用时记录警告并使用普通顺序。
pub fn derive_pixel_order(
    width: u32,
    height: u32,
    password: Option<&str>,
    adaptive: bool,
    image: Option<&RgbImage>,
) -> Vec<usize> {
    let total = (width as usize) * (height as usize);
    let mut indices: Vec<usize> = (0..total).collect();

    let seed = password_seed(password);
    shuffle(&mut indices, seed);
    debug!(width, height, total, "derived shuffled pixel order");

    if let (true, Some(image)) = (adaptive, image) {
        match texture_map(image, width, height) {
            Ok(variances) => {
                indices.sort_by(|&a, &b| variances[b].total_cmp(&variances[a]));
                debug!("pixel order sorted by texture variance");
            }
            Err(e) => warn!("{e}; falling back to non-adaptive pixel order"),
        }
    }

    indices
}
