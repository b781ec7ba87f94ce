//! # lsb_stash 库
//!
//! 本库包含 LSB 隐写工具的核心逻辑：位/字节转换、载荷封装 (压缩、校验、加密)、
//! 像素顺序生成以及嵌入/提取算法。命令行相关的部分位于 `cli` 与 `handler`。

// 声明库包含的所有模块。

pub mod bits;
pub mod cli;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod order;
pub mod payload;
pub mod steganography;

pub use error::{Result, StegoError};
pub use payload::BitsPerChannel;
pub use steganography::{StegoOptions, capacity, embed, extract};
