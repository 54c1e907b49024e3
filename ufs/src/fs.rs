use log::{debug, trace};

use crate::{
    bitmap::{self, Bitmap},
    block::{self, Disk},
    dirent::{self, DirEntry},
    error::FsError,
    fs_constants::*,
    inode::{self, Inode, InodeType},
    super_block::{self, SuperBlock},
};

/// 磁盘镜像上的UNIX风格文件系统引擎。
///
/// 单次调用期间独占设备，调用内部没有挂起点。
/// 每个操作要么完整做完，要么报错并保持磁盘（含事务缓冲）原样：
/// 所有检查都在第一次写设备之前完成，改动先在内存里备齐再落盘
pub struct UnixFs {
    disk: Disk,
    sb: SuperBlock,
}

impl UnixFs {
    /// 挂载：读出超级块。
    /// 根目录（0号inode）由格式化工具预先建好，引擎只沿用不创建
    pub fn mount(disk: Disk) -> Result<Self, FsError> {
        let sb = super_block::read_super(&disk)?;
        debug!(
            "mount: {} inodes, {} data blocks, data region at {}",
            sb.num_inodes, sb.num_data, sb.data_region_addr
        );
        Ok(Self { disk, sb })
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.sb
    }

    //* 事务框架，按请求为单位使用 */

    pub fn begin_transaction(&mut self) {
        self.disk.begin_transaction()
    }

    pub fn commit(&mut self) -> Result<(), FsError> {
        Ok(self.disk.commit()?)
    }

    pub fn rollback(&mut self) {
        self.disk.rollback()
    }

    //* 整区读写 */

    pub fn read_inode_bitmap(&self) -> Result<Bitmap, FsError> {
        bitmap::read_inode_bitmap(&self.disk, &self.sb)
    }

    pub fn read_data_bitmap(&self) -> Result<Bitmap, FsError> {
        bitmap::read_data_bitmap(&self.disk, &self.sb)
    }

    pub fn read_inodes(&self) -> Result<Vec<Inode>, FsError> {
        inode::read_inodes(&self.disk, &self.sb)
    }

    fn write_inode_bitmap(&mut self, map: &Bitmap) -> Result<(), FsError> {
        bitmap::write_inode_bitmap(&mut self.disk, &self.sb, map)
    }

    fn write_data_bitmap(&mut self, map: &Bitmap) -> Result<(), FsError> {
        bitmap::write_data_bitmap(&mut self.disk, &self.sb, map)
    }

    fn write_inodes(&mut self, inodes: &[Inode]) -> Result<(), FsError> {
        inode::write_inodes(&mut self.disk, &self.sb, inodes)
    }

    //* 六个引擎操作 */

    /// 在parent目录里查名字，返回对应的inode号。
    /// `.`和`..`是真实目录项，一样能查到
    pub fn lookup(&self, parent: u32, name: &str) -> Result<u32, FsError> {
        let dir = self.stat(parent)?;
        if !dir.is_dir() {
            return Err(FsError::InvalidInode);
        }
        for (_, _, entry) in self.dir_entries(&dir)? {
            if entry.name_str() == name {
                return Ok(entry.inum);
            }
        }
        Err(FsError::NotFound)
    }

    /// 读出inode记录本身。不查位图，活跃与否调用方自己判断
    pub fn stat(&self, inum: u32) -> Result<Inode, FsError> {
        if inum >= self.sb.num_inodes {
            return Err(FsError::InvalidInode);
        }
        let block_id = self.sb.inode_region_addr as usize + inum as usize / INODES_PER_BLOCK;
        let offset = (inum as usize % INODES_PER_BLOCK) * INODE_SIZE;
        let buf = self.disk.read_block(block_id)?;
        Ok(block::deserialize(&buf[offset..offset + INODE_SIZE])?)
    }

    /// 从偏移0读出min(size, inode.size)个字节。
    /// 文件目录都能读，目录读出来的是紧凑的目录项数组
    pub fn read(&self, inum: u32, size: usize) -> Result<Vec<u8>, FsError> {
        if size > MAX_FILE_SIZE {
            return Err(FsError::InvalidSize);
        }
        let node = self.stat(inum)?;
        let total = size.min(node.size as usize);
        let mut out = Vec::with_capacity(total);
        let mut done = 0;
        while done < total {
            let block_idx = done / BLOCK_SIZE;
            let offset = done % BLOCK_SIZE;
            // 一次最多拷到块尾，再受剩余请求量约束
            let step = (BLOCK_SIZE - offset).min(total - done);
            let buf = self.disk.read_block(node.direct[block_idx] as usize)?;
            out.extend_from_slice(&buf[offset..offset + step]);
            done += step;
        }
        Ok(out)
    }

    /// 整文件覆盖写，只许对普通文件。
    /// 旧块全部释放再按最低空位重新分配，空间不够在动手之前就失败
    pub fn write(&mut self, inum: u32, data: &[u8]) -> Result<usize, FsError> {
        if inum >= self.sb.num_inodes {
            return Err(FsError::InvalidInode);
        }
        let mut inodes = self.read_inodes()?;
        let mut node = inodes[inum as usize];
        if !node.is_file() {
            return Err(FsError::InvalidType);
        }
        if data.len() > MAX_FILE_SIZE {
            return Err(FsError::InvalidSize);
        }

        //1. 空位不够新内容就直接失败，什么都不动
        let new_blocks = data.len().div_ceil(BLOCK_SIZE);
        let mut data_map = self.read_data_bitmap()?;
        if data_map.count_free() < new_blocks {
            return Err(FsError::NotEnoughSpace);
        }

        //2. 在内存位图里释放现有的块，指针清零
        for ptr in node.direct.iter_mut().filter(|ptr| **ptr != 0) {
            data_map.clear((*ptr - self.sb.data_region_addr) as usize);
            *ptr = 0;
        }

        //3. 逐块取最低空位，写入对应的内容
        let mut written = 0;
        for i in 0..new_blocks {
            let bit = data_map.alloc().ok_or(FsError::NotEnoughSpace)?;
            let block_id = self.sb.data_region_addr as usize + bit;
            node.direct[i] = block_id as u32;

            let step = (data.len() - written).min(BLOCK_SIZE);
            let mut buf = [0u8; BLOCK_SIZE];
            buf[..step].copy_from_slice(&data[written..written + step]);
            self.disk.write_block(block_id, &buf)?;
            written += step;
        }
        node.size = data.len() as u32;
        inodes[inum as usize] = node;

        //4. inode区和数据位图整区写回
        self.write_inodes(&inodes)?;
        self.write_data_bitmap(&data_map)?;
        trace!("write {} bytes to inode {}", written, inum);
        Ok(written)
    }

    /// 在parent下新建文件或目录，返回新inode号。
    /// 同名即失败，create不做覆盖
    pub fn create(&mut self, parent: u32, kind: InodeType, name: &str) -> Result<u32, FsError> {
        if parent >= self.sb.num_inodes {
            return Err(FsError::InvalidInode);
        }
        if name.is_empty() || name.len() >= DIR_NAME_SIZE {
            return Err(FsError::InvalidName);
        }
        let parent_probe = self.stat(parent)?;
        if !parent_probe.is_dir() {
            return Err(FsError::InvalidInode);
        }
        match self.lookup(parent, name) {
            Ok(_) => return Err(FsError::InvalidName),
            Err(FsError::NotFound) => {}
            Err(err) => return Err(err),
        }

        let mut inodes = self.read_inodes()?;
        let mut inode_map = self.read_inode_bitmap()?;
        let mut data_map = self.read_data_bitmap()?;
        let mut parent_node = inodes[parent as usize];

        //1. 申请inode号
        let new_inum = inode_map.alloc().ok_or(FsError::NotEnoughSpace)? as u32;
        let entry = DirEntry::new(name, new_inum)?;

        //2. 给目录项找位置：末块还有空槽就追加，否则给父目录配一个新块
        let tail = parent_node.size as usize % BLOCK_SIZE;
        let (entry_block_id, entry_slot, fresh_block) = if tail != 0 {
            let block_idx = parent_node.size as usize / BLOCK_SIZE;
            (
                parent_node.direct[block_idx] as usize,
                tail / DIRENT_SIZE,
                false,
            )
        } else {
            let bit = data_map.alloc().ok_or(FsError::NotEnoughSpace)?;
            let free_slot = parent_node
                .direct
                .iter()
                .position(|&ptr| ptr == 0)
                .ok_or(FsError::NotEnoughSpace)?;
            let block_id = self.sb.data_region_addr as usize + bit;
            parent_node.direct[free_slot] = block_id as u32;
            (block_id, 0, true)
        };
        let mut entry_buf = if fresh_block {
            [0u8; BLOCK_SIZE]
        } else {
            self.disk.read_block(entry_block_id)?
        };
        dirent::put_entry(&mut entry_buf, entry_slot, &entry)?;

        //3. 新inode本体
        let mut new_node = Inode {
            itype: kind.as_raw(),
            size: 0,
            direct: [0; DIRECT_PTRS],
        };

        //4. 目录还要一个数据块装自己的`.`和`..`
        let mut dir_block = None;
        if kind == InodeType::Directory {
            let bit = data_map.alloc().ok_or(FsError::NotEnoughSpace)?;
            let block_id = self.sb.data_region_addr as usize + bit;
            let mut buf = [0u8; BLOCK_SIZE];
            dirent::put_entry(&mut buf, 0, &DirEntry::new(".", new_inum)?)?;
            dirent::put_entry(&mut buf, 1, &DirEntry::new("..", parent)?)?;
            new_node.direct[0] = block_id as u32;
            new_node.size = (2 * DIRENT_SIZE) as u32;
            dir_block = Some((block_id, buf));
        }

        //5. 检查全部通过，改动一次性落盘
        parent_node.size += DIRENT_SIZE as u32;
        inodes[parent as usize] = parent_node;
        inodes[new_inum as usize] = new_node;
        self.disk.write_block(entry_block_id, &entry_buf)?;
        if let Some((block_id, buf)) = dir_block {
            self.disk.write_block(block_id, &buf)?;
        }
        self.write_inodes(&inodes)?;
        self.write_inode_bitmap(&inode_map)?;
        self.write_data_bitmap(&data_map)?;
        trace!("create {:?} '{}' under {} -> inode {}", kind, name, parent, new_inum);
        Ok(new_inum)
    }

    /// 从parent里删掉name指向的对象。
    /// 名字不存在不算错；目录里除`.`、`..`之外还有东西就拒绝
    pub fn unlink(&mut self, parent: u32, name: &str) -> Result<(), FsError> {
        if name == "." || name == ".." {
            return Err(FsError::UnlinkNotAllowed);
        }
        if parent >= self.sb.num_inodes {
            return Err(FsError::InvalidInode);
        }
        if name.is_empty() || name.len() >= DIR_NAME_SIZE {
            return Err(FsError::InvalidName);
        }
        let parent_probe = self.stat(parent)?;
        if !parent_probe.is_dir() {
            return Err(FsError::InvalidInode);
        }

        //1. 找到目录项的位置，找不到直接算成功
        let mut found = None;
        for (block_idx, slot, entry) in self.dir_entries(&parent_probe)? {
            if entry.name_str() == name {
                found = Some((block_idx, slot, entry.inum));
                break;
            }
        }
        let Some((block_idx, slot, victim_inum)) = found else {
            return Ok(());
        };

        let mut inodes = self.read_inodes()?;
        let victim = inodes[victim_inum as usize];
        //2. 非空目录在动任何数据之前拒绝
        if victim.is_dir() && victim.size as usize > 2 * DIRENT_SIZE {
            return Err(FsError::DirNotEmpty);
        }

        //3. 目录真正的末尾项（末块的末槽）顶到洞上，末槽清零，前缀保持紧凑。
        //   洞开在非末块时要跨块搬
        let mut parent_node = inodes[parent as usize];
        let mut data_map = self.read_data_bitmap()?;
        let last_block_idx = parent_node.blocks_held() - 1;
        let last_slot = dirent::entries_in_block(&parent_node, last_block_idx) - 1;
        let last_block_id = parent_node.direct[last_block_idx] as usize;

        let mut last_buf = self.disk.read_block(last_block_id)?;
        let last_entry: DirEntry =
            block::deserialize(&last_buf[last_slot * DIRENT_SIZE..(last_slot + 1) * DIRENT_SIZE])?;
        if block_idx == last_block_idx {
            dirent::put_entry(&mut last_buf, slot, &last_entry)?;
            dirent::put_entry(&mut last_buf, last_slot, &DirEntry::default())?;
        } else {
            let found_block_id = parent_node.direct[block_idx] as usize;
            let mut found_buf = self.disk.read_block(found_block_id)?;
            dirent::put_entry(&mut found_buf, slot, &last_entry)?;
            self.disk.write_block(found_block_id, &found_buf)?;
            dirent::put_entry(&mut last_buf, last_slot, &DirEntry::default())?;
        }
        if last_slot == 0 {
            // 末块只装着刚搬走的这一项，腾空后把块也还回去，
            // direct里不留中间空洞
            data_map.clear(last_block_id - self.sb.data_region_addr as usize);
            self.disk.write_block(last_block_id, &[0u8; BLOCK_SIZE])?;
            parent_node.direct[last_block_idx] = 0;
        } else {
            self.disk.write_block(last_block_id, &last_buf)?;
        }
        parent_node.size -= DIRENT_SIZE as u32;

        //4. 释放victim的数据块并清空块内容
        for &ptr in victim.direct.iter().filter(|&&ptr| ptr != 0) {
            data_map.clear((ptr - self.sb.data_region_addr) as usize);
            self.disk.write_block(ptr as usize, &[0u8; BLOCK_SIZE])?;
        }

        //5. 释放inode，记录抹成全0
        let mut inode_map = self.read_inode_bitmap()?;
        inode_map.clear(victim_inum as usize);
        inodes[victim_inum as usize] = Inode::default();
        inodes[parent as usize] = parent_node;

        self.write_inodes(&inodes)?;
        self.write_inode_bitmap(&inode_map)?;
        self.write_data_bitmap(&data_map)?;
        trace!("unlink '{}' from inode {}", name, parent);
        Ok(())
    }

    /// 按direct顺序展开目录的全部有效目录项，带上(块下标, 块内槽位)
    fn dir_entries(&self, dir: &Inode) -> Result<Vec<(usize, usize, DirEntry)>, FsError> {
        let mut out = Vec::new();
        for block_idx in 0..dir.blocks_held() {
            let buf = self.disk.read_block(dir.direct[block_idx] as usize)?;
            let count = dirent::entries_in_block(dir, block_idx);
            for (slot, entry) in dirent::entries_from_block(&buf, count)?
                .into_iter()
                .enumerate()
            {
                out.push((block_idx, slot, entry));
            }
        }
        Ok(out)
    }
}
