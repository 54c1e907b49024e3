use std::{io, path::PathBuf};

use clap::Parser;

use ufs::mkfs;

/// 新建并格式化一个UFS磁盘镜像
#[derive(Parser)]
#[command(name = "ufs-mkfs")]
struct Cli {
    /// 镜像路径（已存在会被覆盖）
    image: PathBuf,

    /// inode容量
    #[arg(long, default_value_t = 32)]
    inodes: u32,

    /// 数据块容量
    #[arg(long, default_value_t = 32)]
    data: u32,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    mkfs::format(&cli.image, cli.inodes, cli.data)?;
    println!("formatted {}", cli.image.display());
    Ok(())
}
