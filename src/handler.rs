//! # 命令处理逻辑模块
//!
//! 包含处理 `encode`、`decode` 和 `dry-run` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写算法以及向用户报告结果。

use crate::cli::{CodecArgs, DecodeArgs, DryRunArgs, EncodeArgs};
use crate::payload::BitsPerChannel;
use crate::steganography::{StegoOptions, dry_run, embed_file, extract, load_cover, save_stego};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

impl TryFrom<CodecArgs> for StegoOptions {
    type Error = anyhow::Error;

    fn try_from(args: CodecArgs) -> Result<Self> {
        Ok(StegoOptions {
            bits_per_channel: BitsPerChannel::try_from(args.bits)?,
            password: args.password,
            adaptive: args.adaptive,
        })
    }
}

/// 在 `source` 同目录下生成 `<prefix><文件名><extension>` 形式的默认输出路径。
fn default_output(source: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    source.with_file_name(format!("{prefix}{stem}{extension}"))
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {} \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

/// 处理 'Encode' 命令的执行逻辑。
///
/// 读取载体图像与秘密文件，构建载荷并嵌入，最后以 PNG 格式写出隐写图像。
/// 所有检查 (包括容量) 都在写出文件之前完成，失败时不会留下半成品图像。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 输出文件已存在且未指定 `--force`。
/// * 无法读取载体图像或秘密文件。
/// * 图像没有足够的空间来隐藏载荷。
/// * 无法写入到目标图像文件。
pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    let dest = args
        .dest
        .unwrap_or_else(|| default_output(&args.image, "doctored_", ".png"));
    ensure_writable(&dest, args.force)?;

    let options = StegoOptions::try_from(args.codec)?;
    let cover = load_cover(&args.image)?;
    let stego = embed_file(&cover, &args.secret, &options)?;

    save_stego(&stego, &dest).with_context(|| {
        format!(
            "Unable to write to target image file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The file has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Decode' 命令的执行逻辑。
///
/// # Errors
///
/// * 输出文件已存在且未指定 `--force`。
/// * 图像中没有可识别的隐藏数据，或参数与隐藏时不一致。
/// * 校验、解密或解压失败。
/// * 无法写入到目标文件。
pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.image, "recovered_", ".bin"));
    ensure_writable(&output, args.force)?;

    let options = StegoOptions::try_from(args.codec)?;
    let image = load_cover(&args.image)?;
    let data = extract(&image, &options).with_context(|| {
        format!(
            "Failed to recover hidden data from '{}'",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    fs::write(&output, &data).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            output.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "{} bytes have been successfully recovered and saved: {}",
        data.len().to_string().green(),
        output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'DryRun' 命令：报告容量，以及秘密文件所需的空间。
pub fn handle_dry_run(args: DryRunArgs) -> Result<()> {
    let options = StegoOptions::try_from(args.codec)?;
    let image = load_cover(&args.image)?;

    let secret = args
        .secret
        .as_ref()
        .map(|path| {
            fs::read(path).with_context(|| {
                format!(
                    "Unable to read secret file: {}",
                    path.to_string_lossy().red().bold()
                )
            })
        })
        .transpose()?;

    let report = dry_run(&image, secret.as_deref(), &options)?;

    println!(
        "Image capacity: {} bytes ({} bit(s) per channel)",
        report.capacity.to_string().green().bold(),
        options.bits_per_channel.get()
    );

    if let Some(required) = report.required {
        let verdict = if report.fits() {
            "fits".green().bold()
        } else {
            "does not fit".red().bold()
        };
        println!(
            "Required: {} bytes (secret file {} bytes) - {}",
            required.to_string().bold(),
            secret.as_ref().map_or(0, Vec::len),
            verdict
        );
    }

    Ok(())
}
