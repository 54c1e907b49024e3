use serde::{Deserialize, Serialize};

use crate::{
    block::{self, Disk},
    error::FsError,
    fs_constants::*,
};

/// 超级块，放在0号块，格式化之后不再改动。
/// 各区域的位置全由它描述，引擎不得写死任何区域地址
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuperBlock {
    pub inode_bitmap_addr: u32, // inode位图起始块号
    pub inode_bitmap_len: u32,  // inode位图块数
    pub data_bitmap_addr: u32,  // 数据位图起始块号
    pub data_bitmap_len: u32,   // 数据位图块数
    pub inode_region_addr: u32, // inode区起始块号
    pub inode_region_len: u32,  // inode区块数
    pub data_region_addr: u32,  // 数据区起始块号
    pub data_region_len: u32,   // 数据区块数
    pub num_inodes: u32,        // inode容量
    pub num_data: u32,          // 数据块容量
}

/// 从0号块读出超级块
pub fn read_super(disk: &Disk) -> Result<SuperBlock, FsError> {
    let buf = disk.read_block(0)?;
    Ok(block::deserialize(&buf[..SUPER_SIZE])?)
}

/// 超级块整块写回（只有格式化工具会用到）
pub fn write_super(disk: &mut Disk, sb: &SuperBlock) -> Result<(), FsError> {
    let bytes = block::serialize(sb)?;
    let mut buf = [0u8; BLOCK_SIZE];
    buf[..bytes.len()].copy_from_slice(&bytes);
    disk.write_block(0, &buf)?;
    Ok(())
}
