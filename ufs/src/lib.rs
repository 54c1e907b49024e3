//! 磁盘镜像里的UNIX风格文件系统。
//!
//! 镜像布局：超级块 + inode位图 + 数据位图 + inode区 + 数据区。
//! 文件和目录都用inode号寻址，内容通过inode里的定长直接块指针展开，
//! 位图是占用与否的唯一依据。

pub mod bitmap;
pub mod block;
pub mod dirent;
pub mod error;
pub mod fs;
pub mod fs_constants;
pub mod inode;
pub mod mkfs;
pub mod super_block;

pub use error::FsError;
pub use fs::UnixFs;
