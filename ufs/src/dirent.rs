use serde::{Deserialize, Serialize};

use crate::{block, block::BlockBuf, error::FsError, fs_constants::*, inode::Inode};

/// 32B定长目录项，名字以NUL结尾。
/// 目录的数据块就是这种记录的紧凑数组，size之外的槽位是垃圾
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct DirEntry {
    pub inum: u32,
    pub name: [u8; DIR_NAME_SIZE],
}

impl DirEntry {
    /// 名字为空或装不下（要留一个NUL）都算非法
    pub fn new(name: &str, inum: u32) -> Result<Self, FsError> {
        if name.is_empty() || name.len() >= DIR_NAME_SIZE {
            return Err(FsError::InvalidName);
        }
        let mut buf = [0u8; DIR_NAME_SIZE];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self { inum, name: buf })
    }

    /// NUL之前的部分是名字
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .split('\0')
            .next()
            .unwrap()
            .to_string()
    }

    // 名字首字节为0说明槽位没在用
    pub fn is_empty_slot(&self) -> bool {
        self.name[0] == 0
    }

    pub fn is_special(&self) -> bool {
        matches!(self.name_str().as_str(), "." | "..")
    }
}

/// 目录第block_idx个占用块里的有效目录项数。
/// 除最后一块外都是满的，最后一块按size的余数算
pub fn entries_in_block(dir: &Inode, block_idx: usize) -> usize {
    let tail = dir.size as usize % BLOCK_SIZE;
    if block_idx + 1 == dir.blocks_held() && tail != 0 {
        tail / DIRENT_SIZE
    } else {
        DIRENTS_PER_BLOCK
    }
}

/// 解析一个目录块的前count个目录项
pub fn entries_from_block(buf: &BlockBuf, count: usize) -> Result<Vec<DirEntry>, FsError> {
    entries_from_bytes(&buf[..count * DIRENT_SIZE])
}

/// 把read出来的目录内容解析成目录项数组
pub fn entries_from_bytes(bytes: &[u8]) -> Result<Vec<DirEntry>, FsError> {
    let mut entries = Vec::with_capacity(bytes.len() / DIRENT_SIZE);
    for chunk in bytes.chunks_exact(DIRENT_SIZE) {
        entries.push(block::deserialize(chunk)?);
    }
    Ok(entries)
}

/// 把目录项写进块内的指定槽位
pub fn put_entry(buf: &mut BlockBuf, slot: usize, entry: &DirEntry) -> Result<(), FsError> {
    let bytes = block::serialize(entry)?;
    let start = slot * DIRENT_SIZE;
    buf[start..start + bytes.len()].copy_from_slice(&bytes);
    Ok(())
}
