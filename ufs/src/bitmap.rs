use crate::{block::Disk, error::FsError, fs_constants::*, super_block::SuperBlock};

type BitmapByte = bitmaps::Bitmap<8>;

/// 位图的内存镜像，bit为1代表对象占用。
/// bit k 在第 k/8 个字节的第 k%8 位（低位在前）
pub struct Bitmap {
    bytes: Vec<BitmapByte>,
    limit: usize, // 对象容量，位图区尾部多余的bit不算数
}

impl Bitmap {
    pub fn from_bytes(raw: &[u8], limit: usize) -> Self {
        let bytes = raw.iter().map(|b| BitmapByte::from_value(*b)).collect();
        Self { bytes, limit }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| b.into_value()).collect()
    }

    /// 从0号bit开始找第一个空位，置1并返回bit号。
    /// 固定从头扫，分配结果是确定的
    pub fn alloc(&mut self) -> Option<usize> {
        for (byte_pos, byte) in self.bytes.iter_mut().enumerate() {
            if let Some(bit_pos) = byte.first_false_index() {
                let id = byte_pos * 8 + bit_pos;
                if id >= self.limit {
                    return None;
                }
                byte.set(bit_pos, true);
                return Some(id);
            }
        }
        None
    }

    pub fn is_set(&self, bit: usize) -> bool {
        self.bytes[bit / 8].get(bit % 8)
    }

    pub fn set(&mut self, bit: usize) {
        self.bytes[bit / 8].set(bit % 8, true);
    }

    /// 返回false代表bit本来就是0
    pub fn clear(&mut self, bit: usize) -> bool {
        self.bytes[bit / 8].set(bit % 8, false)
    }

    /// 空闲bit数
    pub fn count_free(&self) -> usize {
        (0..self.limit).filter(|&bit| !self.is_set(bit)).count()
    }
}

/// 把inode位图整个区域读进内存
pub fn read_inode_bitmap(disk: &Disk, sb: &SuperBlock) -> Result<Bitmap, FsError> {
    read_region(
        disk,
        sb.inode_bitmap_addr,
        sb.inode_bitmap_len,
        sb.num_inodes as usize,
    )
}

pub fn write_inode_bitmap(disk: &mut Disk, sb: &SuperBlock, map: &Bitmap) -> Result<(), FsError> {
    write_region(disk, sb.inode_bitmap_addr, map)
}

/// 把数据位图整个区域读进内存
pub fn read_data_bitmap(disk: &Disk, sb: &SuperBlock) -> Result<Bitmap, FsError> {
    read_region(
        disk,
        sb.data_bitmap_addr,
        sb.data_bitmap_len,
        sb.num_data as usize,
    )
}

pub fn write_data_bitmap(disk: &mut Disk, sb: &SuperBlock, map: &Bitmap) -> Result<(), FsError> {
    write_region(disk, sb.data_bitmap_addr, map)
}

fn read_region(disk: &Disk, addr: u32, len: u32, limit: usize) -> Result<Bitmap, FsError> {
    let mut raw = Vec::with_capacity(len as usize * BLOCK_SIZE);
    for i in 0..len as usize {
        raw.extend_from_slice(&disk.read_block(addr as usize + i)?);
    }
    Ok(Bitmap::from_bytes(&raw, limit))
}

// 位图只整区写回，更新才不会互相错开
fn write_region(disk: &mut Disk, addr: u32, map: &Bitmap) -> Result<(), FsError> {
    let raw = map.to_bytes();
    for (i, chunk) in raw.chunks(BLOCK_SIZE).enumerate() {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..chunk.len()].copy_from_slice(chunk);
        disk.write_block(addr as usize + i, &buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_takes_lowest_free_bit() {
        let mut map = Bitmap::from_bytes(&[0u8; 2], 16);
        map.set(0);
        map.set(2);
        assert_eq!(map.alloc(), Some(1));
        assert_eq!(map.alloc(), Some(3));
        assert_eq!(map.alloc(), Some(4));
    }

    #[test]
    fn alloc_respects_capacity() {
        let mut map = Bitmap::from_bytes(&[0u8; 1], 3);
        assert_eq!(map.alloc(), Some(0));
        assert_eq!(map.alloc(), Some(1));
        assert_eq!(map.alloc(), Some(2));
        assert!(map.alloc().is_none());
        assert_eq!(map.count_free(), 0);
    }

    #[test]
    fn clear_reports_previous_state() {
        let mut map = Bitmap::from_bytes(&[0u8; 1], 8);
        map.set(5);
        assert!(map.clear(5));
        assert!(!map.clear(5));
    }

    #[test]
    fn bytes_round_trip_low_bit_first() {
        let map = Bitmap::from_bytes(&[0b0000_0101], 8);
        assert!(map.is_set(0));
        assert!(!map.is_set(1));
        assert!(map.is_set(2));
        assert_eq!(map.to_bytes(), vec![0b0000_0101]);
        assert_eq!(map.count_free(), 6);
    }
}
