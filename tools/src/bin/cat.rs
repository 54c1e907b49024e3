use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;

use ufs::{block::Disk, UnixFs};

/// 打印一个inode占用的块号序列和原始内容
#[derive(Parser)]
#[command(name = "ufs-cat")]
struct Cli {
    /// 磁盘镜像路径
    image: PathBuf,

    /// inode号
    inode: u32,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let fs = UnixFs::mount(Disk::open(&cli.image)?)?;
    let node = fs.stat(cli.inode)?;

    println!("File blocks");
    for block_idx in 0..node.blocks_held() {
        println!("{}", node.direct[block_idx]);
    }
    println!();

    println!("File data");
    let data = fs.read(cli.inode, node.size as usize)?;
    io::stdout().write_all(&data)?;

    Ok(())
}
