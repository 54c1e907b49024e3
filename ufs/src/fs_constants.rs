use std::mem::size_of;

use crate::{dirent::DirEntry, inode::Inode, super_block::SuperBlock};

//* 布局 */
pub const BLOCK_SIZE: usize = 4096; // 块大小 4KB

pub const DIRECT_PTRS: usize = 30; // 每个inode的直接块指针数

pub const DIR_NAME_SIZE: usize = 28; // 目录项名字字段大小（含结尾NUL）

pub const ROOT_INODE: u32 = 0; // 根目录固定在0号inode，由格式化工具建好

//* inode类型的磁盘取值 */
pub const UFS_REGULAR_FILE: u32 = 1;
pub const UFS_DIRECTORY: u32 = 2;

//* 记录大小 */
pub const SUPER_SIZE: usize = size_of::<SuperBlock>();
pub const INODE_SIZE: usize = size_of::<Inode>();
pub const DIRENT_SIZE: usize = size_of::<DirEntry>();

pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;
pub const BITS_PER_BLOCK: usize = BLOCK_SIZE * 8;

pub const MAX_FILE_SIZE: usize = DIRECT_PTRS * BLOCK_SIZE; // 只有直接块，文件大小封顶
