use thiserror::Error;

/// 引擎操作的失败种类。
/// 任何一种错误返回时，磁盘（以及事务缓冲里）的状态都保持原样
#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid inode number")]
    InvalidInode,

    #[error("invalid size")]
    InvalidSize,

    #[error("invalid type")]
    InvalidType,

    #[error("invalid name")]
    InvalidName,

    #[error("not found")]
    NotFound,

    #[error("not enough space")]
    NotEnoughSpace,

    #[error("directory not empty")]
    DirNotEmpty,

    #[error("unlink not allowed")]
    UnlinkNotAllowed,

    #[error("disk io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Io(inner) => inner,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
