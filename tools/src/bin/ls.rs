use std::{io, path::PathBuf};

use clap::Parser;

use ufs::{block::Disk, dirent, fs_constants::ROOT_INODE, UnixFs};

/// 从指定目录开始递归列出整棵目录树
#[derive(Parser)]
#[command(name = "ufs-ls")]
struct Cli {
    /// 磁盘镜像路径
    image: PathBuf,

    /// 起始目录的inode号
    #[arg(long, default_value_t = ROOT_INODE)]
    inode: u32,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let fs = UnixFs::mount(Disk::open(&cli.image)?)?;
    list_tree(&fs, cli.inode, "")?;
    Ok(())
}

/// 打印一层目录，再按名字顺序下钻。根路径显示为`/`
fn list_tree(fs: &UnixFs, inum: u32, path: &str) -> io::Result<()> {
    let node = fs.stat(inum)?;
    if !node.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("inode {} is not a directory", inum),
        ));
    }

    println!("Directory {}/", path);

    let bytes = fs.read(inum, node.size as usize)?;
    let mut entries: Vec<dirent::DirEntry> = dirent::entries_from_bytes(&bytes)?
        .into_iter()
        .filter(|entry| !entry.is_empty_slot())
        .collect();
    entries.sort_by_key(|entry| entry.name_str());

    for entry in &entries {
        println!("{}\t{}", entry.inum, entry.name_str());
    }
    println!();

    for entry in &entries {
        if entry.is_special() {
            continue;
        }
        let child = fs.stat(entry.inum)?;
        if child.is_dir() {
            list_tree(fs, entry.inum, &format!("{}/{}", path, entry.name_str()))?;
        }
    }
    Ok(())
}
