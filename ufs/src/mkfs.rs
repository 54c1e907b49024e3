use std::path::Path;

use log::info;

use crate::{
    bitmap::{self, Bitmap},
    block::Disk,
    dirent::{self, DirEntry},
    error::FsError,
    fs_constants::*,
    inode::{self, Inode},
    super_block::{self, SuperBlock},
};

/// 依据容量算出各区域的位置：
/// 0号块超级块，往后依次是inode位图、数据位图、inode区、数据区
pub fn layout(num_inodes: u32, num_data: u32) -> SuperBlock {
    let inode_bitmap_len = (num_inodes as usize).div_ceil(BITS_PER_BLOCK) as u32;
    let data_bitmap_len = (num_data as usize).div_ceil(BITS_PER_BLOCK) as u32;
    let inode_region_len = (num_inodes as usize).div_ceil(INODES_PER_BLOCK) as u32;

    let inode_bitmap_addr = 1;
    let data_bitmap_addr = inode_bitmap_addr + inode_bitmap_len;
    let inode_region_addr = data_bitmap_addr + data_bitmap_len;
    let data_region_addr = inode_region_addr + inode_region_len;

    SuperBlock {
        inode_bitmap_addr,
        inode_bitmap_len,
        data_bitmap_addr,
        data_bitmap_len,
        inode_region_addr,
        inode_region_len,
        data_region_addr,
        data_region_len: num_data,
        num_inodes,
        num_data,
    }
}

/// 新建镜像并格式化。
/// 根目录放在0号inode，`.`和`..`都指向自己；
/// 引擎只沿用这份初始状态，自己从不创建它
pub fn format(path: &Path, num_inodes: u32, num_data: u32) -> Result<(), FsError> {
    assert!(num_inodes >= 1 && num_data >= 1);
    let sb = layout(num_inodes, num_data);
    let total_blocks = (sb.data_region_addr + sb.num_data) as usize;
    let mut disk = Disk::create(path, total_blocks)?;

    super_block::write_super(&mut disk, &sb)?;

    // 0号inode和根目录的数据块在格式化时就占上
    let mut inode_map = Bitmap::from_bytes(
        &vec![0u8; sb.inode_bitmap_len as usize * BLOCK_SIZE],
        num_inodes as usize,
    );
    inode_map.set(ROOT_INODE as usize);
    bitmap::write_inode_bitmap(&mut disk, &sb, &inode_map)?;

    let mut data_map = Bitmap::from_bytes(
        &vec![0u8; sb.data_bitmap_len as usize * BLOCK_SIZE],
        num_data as usize,
    );
    data_map.set(0);
    bitmap::write_data_bitmap(&mut disk, &sb, &data_map)?;

    let mut inodes = vec![Inode::default(); num_inodes as usize];
    let mut root = Inode {
        itype: UFS_DIRECTORY,
        size: (2 * DIRENT_SIZE) as u32,
        direct: [0; DIRECT_PTRS],
    };
    root.direct[0] = sb.data_region_addr;
    inodes[ROOT_INODE as usize] = root;
    inode::write_inodes(&mut disk, &sb, &inodes)?;

    let mut buf = [0u8; BLOCK_SIZE];
    dirent::put_entry(&mut buf, 0, &DirEntry::new(".", ROOT_INODE)?)?;
    dirent::put_entry(&mut buf, 1, &DirEntry::new("..", ROOT_INODE)?)?;
    disk.write_block(sb.data_region_addr as usize, &buf)?;

    info!(
        "formatted {} blocks ({} inodes, {} data)",
        total_blocks, num_inodes, num_data
    );
    Ok(())
}
