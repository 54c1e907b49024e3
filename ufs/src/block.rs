use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{self, Error, ErrorKind},
    os::unix::prelude::FileExt,
    path::Path,
};

use log::trace;
use serde::{de::DeserializeOwned, Serialize};

use crate::fs_constants::BLOCK_SIZE;

pub type BlockBuf = [u8; BLOCK_SIZE];

/// 以块为单位访问磁盘镜像文件。
///
/// 事务外的写立即落盘；事务内的写先进缓冲，`commit`一次性刷下去，
/// `rollback`整体丢弃。事务不可嵌套，块号越界按编程错误处理，直接panic
pub struct Disk {
    file: File,
    num_blocks: usize,
    tx: Option<HashMap<usize, BlockBuf>>,
}

impl Disk {
    /// 打开已有镜像，块数由文件长度决定
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        Ok(Self {
            file,
            num_blocks: len / BLOCK_SIZE,
            tx: None,
        })
    }

    /// 新建定长镜像，内容全0
    pub fn create(path: &Path, num_blocks: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((num_blocks * BLOCK_SIZE) as u64)?;
        Ok(Self {
            file,
            num_blocks,
            tx: None,
        })
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// 读一块。事务中能读到自己尚未提交的写
    pub fn read_block(&self, block_id: usize) -> io::Result<BlockBuf> {
        assert!(block_id < self.num_blocks, "block {} out of range", block_id);
        if let Some(tx) = &self.tx {
            if let Some(buf) = tx.get(&block_id) {
                return Ok(*buf);
            }
        }
        let mut buf = [0u8; BLOCK_SIZE];
        self.file
            .read_exact_at(&mut buf, (block_id * BLOCK_SIZE) as u64)?;
        Ok(buf)
    }

    /// 写一块
    pub fn write_block(&mut self, block_id: usize, buf: &BlockBuf) -> io::Result<()> {
        assert!(block_id < self.num_blocks, "block {} out of range", block_id);
        match &mut self.tx {
            Some(tx) => {
                tx.insert(block_id, *buf);
            }
            None => self
                .file
                .write_all_at(buf, (block_id * BLOCK_SIZE) as u64)?,
        }
        Ok(())
    }

    pub fn begin_transaction(&mut self) {
        assert!(self.tx.is_none(), "transaction already open");
        self.tx = Some(HashMap::new());
    }

    /// 把事务缓冲里的块全部落盘
    pub fn commit(&mut self) -> io::Result<()> {
        let tx = self.tx.take().expect("commit without transaction");
        let mut blocks: Vec<_> = tx.into_iter().collect();
        blocks.sort_unstable_by_key(|(block_id, _)| *block_id);
        for (block_id, buf) in blocks {
            trace!("flush block {}", block_id);
            self.file
                .write_all_at(&buf, (block_id * BLOCK_SIZE) as u64)?;
        }
        Ok(())
    }

    /// 丢弃事务缓冲，镜像保持begin之前的内容
    pub fn rollback(&mut self) {
        let tx = self.tx.take().expect("rollback without transaction");
        trace!("discard {} buffered blocks", tx.len());
    }
}

pub fn serialize<T: Serialize>(object: &T) -> io::Result<Vec<u8>> {
    bincode::serialize(object).map_err(|err| Error::new(ErrorKind::InvalidData, err))
}

pub fn deserialize<T: DeserializeOwned>(buffer: &[u8]) -> io::Result<T> {
    bincode::deserialize(buffer).map_err(|err| Error::new(ErrorKind::InvalidData, err))
}
