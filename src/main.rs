use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use lsb_stash::{
    cli::{Cli, Commands},
    handler::{handle_decode, handle_dry_run, handle_encode},
};

/// 程序的主入口点
///
/// 负责解析命令行参数、初始化日志，并根据指定的子命令
/// 将执行分派到相应的处理函数
fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 日志写到 stderr，避免与结果输出混在一起
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 根据子命令调用相应的处理函数
    match cli.command {
        Commands::Encode(args) => handle_encode(args),
        Commands::Decode(args) => handle_decode(args),
        Commands::DryRun(args) => handle_dry_run(args),
    }
}
