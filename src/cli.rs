//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，可将任意文件压缩、校验、(可选) 加密后
/// 隐藏在无损格式图像 (如 PNG, BMP) 中，并按相同参数恢复。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，可将任意文件隐藏在无损格式图像 (如 PNG, BMP) 中。\n像素顺序由密码决定，可选按纹理自适应选择像素；输出图像始终为 PNG。"
)]
pub struct Cli {
    /// 输出调试日志。
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：encode (隐藏)、decode (恢复) 和 dry-run (容量检查)。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 将文件隐藏到图像中。
    #[command(alias = "hide")]
    Encode(EncodeArgs),

    /// 从经过隐写的图像中恢复隐藏的文件。
    #[command(alias = "recover")]
    Decode(DecodeArgs),

    /// 只计算图像容量与所需空间，不写出任何文件。
    DryRun(DryRunArgs),
}

/// 嵌入与提取共用的编码参数，恢复时必须与隐藏时一致。
#[derive(Args, Debug, Clone, Default)]
pub struct CodecArgs {
    /// 密码：决定像素顺序，非空时同时加密载荷。
    #[arg(short, long, env = "LSB_STASH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// 每个颜色通道使用的低位数 (1 或 2)。
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub bits: u8,

    /// 按纹理方差优先选择像素。
    #[arg(short, long)]
    pub adaptive: bool,
}

/// 'encode' 命令所需的参数。
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// 用于隐写的载体图像路径 (如 PNG, BMP)。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的文件路径。
    #[arg(short, long)]
    pub secret: PathBuf,

    /// 输出图像路径。默认为载体同目录下的 `doctored_<文件名>.png`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    #[command(flatten)]
    pub codec: CodecArgs,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'decode' 命令所需的参数。
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 已隐藏数据的图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 恢复文件的输出路径。默认为图像同目录下的 `recovered_<文件名>.bin`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub codec: CodecArgs,

    #[arg(short, long)]
    pub force: bool,
}

/// 'dry-run' 命令所需的参数。
#[derive(Args, Debug)]
pub struct DryRunArgs {
    #[arg(short, long)]
    pub image: PathBuf,

    /// 可选：计划隐藏的文件，用于计算所需空间。
    #[arg(short, long)]
    pub secret: Option<PathBuf>,

    #[command(flatten)]
    pub codec: CodecArgs,
}
