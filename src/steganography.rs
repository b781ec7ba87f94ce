//! # 隐写核心算法模块
//!
//! 按 [`derive_pixel_order`] 给出的顺序遍历像素，把载荷位写入 (或读出) 每个像素
//! R、G、B 通道的低位。每个通道使用 1 或 2 位，组内高位在前。

use image::{ImageFormat, RgbImage};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::bits::{bits_to_bytes, bytes_to_bits};
use crate::constants::{CHANNELS, HEADER_SIZE};
use crate::error::{Result, StegoError};
use crate::order::derive_pixel_order;
use crate::payload::{
    BitsPerChannel, build_payload, build_payload_from_file, open_payload, parse_header,
};

/// 嵌入与提取共用的参数，提取时必须与嵌入时一致。
#[derive(Debug, Clone, Default)]
pub struct StegoOptions {
    pub bits_per_channel: BitsPerChannel,
    pub password: Option<String>,
    pub adaptive: bool,
}

impl StegoOptions {
    /// 非空密码；空字符串视为未设置。
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    fn pixel_order(&self, image: &RgbImage) -> Vec<usize> {
        let (width, height) = image.dimensions();
        derive_pixel_order(
            width,
            height,
            self.password(),
            self.adaptive,
            self.adaptive.then_some(image),
        )
    }
}

/// 空运行的结果：图像容量，以及 (若给出了秘密文件) 所需字节数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityReport {
    pub capacity: usize,
    pub required: Option<usize>,
}

impl CapacityReport {
    pub fn fits(&self) -> bool {
        self.required.is_none_or(|required| required <= self.capacity)
    }
}

/// 图像可容纳的载荷字节数：`floor(width * height * 3 * bpc / 8)`。
pub fn capacity(width: u32, height: u32, bits_per_channel: BitsPerChannel) -> usize {
    let bits = u64::from(width)
        * u64::from(height)
        * CHANNELS as u64
        * u64::from(bits_per_channel.get());
    (bits / 8) as usize
}

/// 将载荷写入载体图像的副本并返回。
///
/// 超出容量时在修改任何像素之前返回 [`StegoError::CapacityExceeded`]。
pub fn embed(cover: &RgbImage, payload: &[u8], options: &StegoOptions) -> Result<RgbImage> {
    let (width, height) = cover.dimensions();
    let available = capacity(width, height, options.bits_per_channel);
    if payload.len() > available {
        return Err(StegoError::CapacityExceeded {
            required: payload.len(),
            capacity: available,
        });
    }

    let bits = bytes_to_bits(payload);
    let order = options.pixel_order(cover);
    let bpc = usize::from(options.bits_per_channel.get());
    let clear_mask = options.bits_per_channel.clear_mask();

    let mut stego = cover.clone();
    let raw: &mut [u8] = &mut stego;
    let mut groups = bits.chunks(bpc);

    'pixels: for &idx in &order {
        for channel in &mut raw[idx * CHANNELS..(idx + 1) * CHANNELS] {
            let Some(group) = groups.next() else {
                break 'pixels;
            };
            // 最后一组不足 bpc 位时低位补零
            let value = group
                .iter()
                .chain(std::iter::repeat(&false))
                .take(bpc)
                .fold(0u8, |acc, &bit| (acc << 1) | bit as u8);
            *channel = (*channel & clear_mask) | value;
        }
    }

    debug!(
        payload_bytes = payload.len(),
        capacity = available,
        "payload embedded"
    );

    Ok(stego)
}

/// 从隐写图像中提取并还原原始文件内容。
///
/// 读满头部后立即校验魔数，再读取头部声明的长度后停止，不扫描整幅图像。
pub fn extract(image: &RgbImage, options: &StegoOptions) -> Result<Vec<u8>> {
    let order = options.pixel_order(image);
    let bpc = options.bits_per_channel.get();
    let header_bits = HEADER_SIZE * 8;

    let mut bits: Vec<bool> = Vec::with_capacity(header_bits);
    let mut header = None;
    let mut needed = header_bits;

    for &idx in &order {
        for &channel in &image.as_raw()[idx * CHANNELS..(idx + 1) * CHANNELS] {
            bits.extend((0..bpc).rev().map(|shift| (channel >> shift) & 1 == 1));
        }

        if header.is_none() && bits.len() >= header_bits {
            let parsed = parse_header(&bits_to_bytes(&bits[..header_bits])?)?;
            if !parsed.has_valid_magic() {
                return Err(StegoError::BadMagic);
            }
            needed = header_bits + parsed.payload_size as usize * 8;
            header = Some(parsed);
        }

        if header.is_some() && bits.len() >= needed {
            break;
        }
    }

    let header = match header {
        Some(header) if bits.len() >= needed => header,
        _ => {
            return Err(StegoError::InsufficientBits {
                needed,
                available: bits.len(),
            });
        }
    };

    debug!(
        payload_size = header.payload_size,
        encrypted = header.flags.encrypted,
        gathered_bits = bits.len(),
        "header found"
    );

    let body = bits_to_bytes(&bits[header_bits..needed])?;
    open_payload(&header, &body, options.password())
}

/// 构建文件载荷并嵌入载体图像。
pub fn embed_file(cover: &RgbImage, secret: &Path, options: &StegoOptions) -> Result<RgbImage> {
    let payload = build_payload_from_file(
        secret,
        options.bits_per_channel,
        options.adaptive,
        options.password(),
    )?;
    embed(cover, &payload, options)
}

/// 计算容量及 (可选) 所需空间，不修改也不写出任何图像。
pub fn dry_run(
    cover: &RgbImage,
    secret: Option<&[u8]>,
    options: &StegoOptions,
) -> Result<CapacityReport> {
    let (width, height) = cover.dimensions();
    let required = secret
        .map(|data| {
            build_payload(
                data,
                options.bits_per_channel,
                options.adaptive,
                options.password(),
            )
            .map(|payload| payload.len())
        })
        .transpose()?;

    Ok(CapacityReport {
        capacity: capacity(width, height, options.bits_per_channel),
        required,
    })
}

/// 读取载体图像并转换为 8 位 RGB。
///
/// # Errors
///
/// * [`StegoError::ImageMissing`] - 路径不存在。
/// * [`StegoError::Image`] - 无法解码。
pub fn load_cover(path: &Path) -> Result<RgbImage> {
    match image::open(path) {
        Ok(image) => Ok(image.to_rgb8()),
        Err(image::ImageError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            Err(StegoError::ImageMissing(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// 以 PNG (无损) 格式保存隐写图像，与路径扩展名无关。
pub fn save_stego(image: &RgbImage, path: &Path) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::{Rng, RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// 带噪声的载体，与真实照片一样有纹理差异。
    fn noisy_cover(width: u32, height: u32) -> RgbImage {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        RgbImage::from_fn(width, height, |_, _| {
            let mut jitter = |base: i32| (base + rng.random_range(-30..=30)).clamp(0, 255) as u8;
            Rgb([jitter(128), jitter(200), jitter(50)])
        })
    }

    fn options(bpc: BitsPerChannel, password: Option<&str>, adaptive: bool) -> StegoOptions {
        StegoOptions {
            bits_per_channel: bpc,
            password: password.map(str::to_string),
            adaptive,
        }
    }

    fn hide(cover: &RgbImage, data: &[u8], opts: &StegoOptions) -> RgbImage {
        let payload =
            build_payload(data, opts.bits_per_channel, opts.adaptive, opts.password()).unwrap();
        embed(cover, &payload, opts).unwrap()
    }

    #[test]
    fn capacity_values() {
        assert_eq!(capacity(100, 100, BitsPerChannel::One), 3750);
        assert_eq!(capacity(100, 100, BitsPerChannel::Two), 7500);
        assert_eq!(capacity(3, 1, BitsPerChannel::One), 1);
        assert_eq!(capacity(0, 10, BitsPerChannel::Two), 0);
    }

    #[test]
    fn capacity_doubles_with_two_bits() {
        for (w, h) in [(1, 1), (8, 8), (100, 100), (640, 480)] {
            assert_eq!(
                capacity(w, h, BitsPerChannel::Two),
                2 * capacity(w, h, BitsPerChannel::One)
            );
        }
    }

    #[test]
    fn round_trip_all_settings() {
        let cover = noisy_cover(60, 60);
        let secret = b"Ceci est un message secret pour les tests de steganographie!";

        for bpc in [BitsPerChannel::One, BitsPerChannel::Two] {
            for password in [None, Some("SuperSecret123!")] {
                for adaptive in [false, true] {
                    let opts = options(bpc, password, adaptive);
                    let stego = hide(&cover, secret, &opts);
                    assert_eq!(
                        extract(&stego, &opts).unwrap(),
                        secret,
                        "bpc={bpc:?} password={password:?} adaptive={adaptive}"
                    );
                }
            }
        }
    }

    #[test]
    fn binary_secret_round_trip() {
        let cover = noisy_cover(60, 60);
        let mut secret = vec![0u8; 200];
        ChaCha8Rng::seed_from_u64(7).fill_bytes(&mut secret);

        let opts = options(BitsPerChannel::One, Some("binkey"), false);
        let stego = hide(&cover, &secret, &opts);
        assert_eq!(extract(&stego, &opts).unwrap(), secret);
    }

    #[test]
    fn empty_secret_round_trip() {
        let cover = noisy_cover(30, 30);
        let opts = StegoOptions::default();
        let stego = hide(&cover, &[], &opts);
        assert!(extract(&stego, &opts).unwrap().is_empty());
    }

    #[test]
    fn hundred_square_two_bits_with_key() {
        let cover = noisy_cover(100, 100);
        let mut secret = [0u8; 64];
        ChaCha8Rng::seed_from_u64(64).fill_bytes(&mut secret);

        let opts = options(BitsPerChannel::Two, Some("key"), false);
        let stego = hide(&cover, &secret, &opts);
        assert_eq!(extract(&stego, &opts).unwrap(), secret);

        let mismatched = options(BitsPerChannel::One, Some("key"), false);
        assert!(extract(&stego, &mismatched).is_err());
    }

    #[test]
    fn pixels_after_payload_are_untouched() {
        let cover = noisy_cover(40, 40);
        let opts = StegoOptions::default();
        let payload = build_payload(b"short", opts.bits_per_channel, false, None).unwrap();
        let stego = embed(&cover, &payload, &opts).unwrap();

        let order = derive_pixel_order(40, 40, None, false, None);
        let used = (payload.len() * 8).div_ceil(CHANNELS);
        for &idx in &order[used..] {
            let (x, y) = ((idx % 40) as u32, (idx / 40) as u32);
            assert_eq!(stego.get_pixel(x, y), cover.get_pixel(x, y));
        }
        for (a, b) in stego.as_raw().iter().zip(cover.as_raw()) {
            assert_eq!(a & 0xFE, b & 0xFE);
        }
    }

    #[test]
    fn oversized_payload_rejected() {
        let cover = noisy_cover(10, 10);
        let payload = vec![0xAB; capacity(10, 10, BitsPerChannel::One) + 1];
        let err = embed(&cover, &payload, &StegoOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StegoError::CapacityExceeded {
                required: 38,
                capacity: 37
            }
        ));
    }

    #[test]
    fn payload_exactly_at_capacity_fits() {
        let cover = noisy_cover(10, 10);
        let payload = vec![0xAB; capacity(10, 10, BitsPerChannel::Two)];
        let opts = options(BitsPerChannel::Two, None, false);
        assert!(embed(&cover, &payload, &opts).is_ok());
    }

    #[test]
    fn clean_image_has_no_magic() {
        let cover = RgbImage::from_pixel(30, 30, Rgb([0, 0, 0]));
        let err = extract(&cover, &StegoOptions::default()).unwrap_err();
        assert!(matches!(err, StegoError::BadMagic));
    }

    #[test]
    fn tiny_image_runs_out_before_header() {
        let cover = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let err = extract(&cover, &StegoOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StegoError::InsufficientBits {
                needed: 328,
                available: 48
            }
        ));
    }

    #[test]
    fn declared_size_beyond_image() {
        let cover = noisy_cover(20, 20);
        let opts = StegoOptions::default();
        let mut payload = build_payload(b"data", opts.bits_per_channel, false, None).unwrap();
        payload[4..8].copy_from_slice(&10_000u32.to_be_bytes());
        let stego = embed(&cover, &payload, &opts).unwrap();

        let err = extract(&stego, &opts).unwrap_err();
        assert!(matches!(
            err,
            StegoError::InsufficientBits { needed, available: 1200 } if needed == 328 + 80_000
        ));
    }

    #[test]
    fn flipped_payload_bit_fails_checksum() {
        let cover = noisy_cover(40, 40);
        let opts = options(BitsPerChannel::Two, None, false);
        let payload = build_payload(b"integrity matters", opts.bits_per_channel, false, None).unwrap();
        let mut stego = embed(&cover, &payload, &opts).unwrap();

        // 第一个载荷位之后的若干位
        let order = derive_pixel_order(40, 40, None, false, None);
        let bpc = 2;
        let bit = HEADER_SIZE * 8 + 13;
        let group = bit / bpc;
        let pixel = order[group / CHANNELS];
        let offset = pixel * CHANNELS + group % CHANNELS;
        let shift = bpc - 1 - bit % bpc;
        let raw: &mut [u8] = &mut stego;
        raw[offset] ^= 1 << shift;

        let err = extract(&stego, &opts).unwrap_err();
        assert!(matches!(err, StegoError::ChecksumMismatch));
    }

    #[test]
    fn wrong_password_rejected() {
        let cover = noisy_cover(60, 60);
        let stego = hide(&cover, b"secret", &options(BitsPerChannel::One, Some("correct"), false));
        let err = extract(&stego, &options(BitsPerChannel::One, Some("wrong"), false));
        assert!(err.is_err());
    }

    #[test]
    fn missing_password_on_encrypted_image() {
        let cover = noisy_cover(60, 60);
        let stego = hide(&cover, b"secret", &options(BitsPerChannel::One, Some("secret"), false));
        assert!(extract(&stego, &options(BitsPerChannel::One, None, false)).is_err());
        assert!(extract(&stego, &options(BitsPerChannel::One, Some(""), false)).is_err());
    }

    #[test]
    fn dry_run_reports_without_embedding() {
        let cover = noisy_cover(100, 100);
        let report = dry_run(&cover, None, &StegoOptions::default()).unwrap();
        assert_eq!(report.capacity, 3750);
        assert_eq!(report.required, None);
        assert!(report.fits());

        let report = dry_run(&cover, Some(b"hello"), &StegoOptions::default()).unwrap();
        assert!(report.required.unwrap() > HEADER_SIZE);
        assert!(report.fits());

        let mut big = vec![0u8; 5000];
        ChaCha8Rng::seed_from_u64(5).fill_bytes(&mut big);
        let report = dry_run(&cover, Some(&big), &StegoOptions::default()).unwrap();
        assert!(!report.fits());
    }
}
