use serde::{Deserialize, Serialize};

use crate::{
    block::{self, Disk},
    error::FsError,
    fs_constants::*,
    super_block::SuperBlock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    RegularFile,
    Directory,
}

impl InodeType {
    /// 磁盘上的类型标记
    pub fn as_raw(self) -> u32 {
        match self {
            Self::RegularFile => UFS_REGULAR_FILE,
            Self::Directory => UFS_DIRECTORY,
        }
    }
}

/// 定长128B的inode记录。
/// 全0代表空槽位，占用与否以inode位图为准；
/// 目录的size是有效目录项的总字节数
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inode {
    pub itype: u32,
    pub size: u32,
    pub direct: [u32; DIRECT_PTRS],
}

impl Inode {
    pub fn is_dir(&self) -> bool {
        self.itype == UFS_DIRECTORY
    }

    pub fn is_file(&self) -> bool {
        self.itype == UFS_REGULAR_FILE
    }

    /// 内容占用的块数（向上取整）
    pub fn blocks_held(&self) -> usize {
        (self.size as usize).div_ceil(BLOCK_SIZE)
    }
}

/// 把整个inode区读进内存
pub fn read_inodes(disk: &Disk, sb: &SuperBlock) -> Result<Vec<Inode>, FsError> {
    let mut inodes = Vec::with_capacity(sb.num_inodes as usize);
    'region: for i in 0..sb.inode_region_len as usize {
        let buf = disk.read_block(sb.inode_region_addr as usize + i)?;
        for chunk in buf.chunks(INODE_SIZE) {
            if inodes.len() >= sb.num_inodes as usize {
                break 'region;
            }
            inodes.push(block::deserialize(chunk)?);
        }
    }
    Ok(inodes)
}

/// inode区整体写回
pub fn write_inodes(disk: &mut Disk, sb: &SuperBlock, inodes: &[Inode]) -> Result<(), FsError> {
    for i in 0..sb.inode_region_len as usize {
        let mut buf = [0u8; BLOCK_SIZE];
        for j in 0..INODES_PER_BLOCK {
            let idx = i * INODES_PER_BLOCK + j;
            if idx >= inodes.len() {
                break;
            }
            let bytes = block::serialize(&inodes[idx])?;
            buf[j * INODE_SIZE..j * INODE_SIZE + bytes.len()].copy_from_slice(&bytes);
        }
        disk.write_block(sb.inode_region_addr as usize + i, &buf)?;
    }
    Ok(())
}
