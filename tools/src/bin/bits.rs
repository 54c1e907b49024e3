use std::{io, path::PathBuf};

use clap::Parser;

use ufs::{block::Disk, UnixFs};

/// 打印超级块里的区域地址和两张位图的原始字节
#[derive(Parser)]
#[command(name = "ufs-bits")]
struct Cli {
    /// 磁盘镜像路径
    image: PathBuf,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let fs = UnixFs::mount(Disk::open(&cli.image)?)?;
    let sb = fs.super_block();

    println!("Super");
    println!("inode_region_addr {}", sb.inode_region_addr);
    println!("data_region_addr {}", sb.data_region_addr);
    println!();

    println!("Inode bitmap");
    for byte in fs.read_inode_bitmap()?.to_bytes() {
        print!("{} ", byte);
    }
    println!();
    println!();

    println!("Data bitmap");
    for byte in fs.read_data_bitmap()?.to_bytes() {
        print!("{} ", byte);
    }
    println!();

    Ok(())
}
