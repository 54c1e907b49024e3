use log::{debug, warn};

use ufs::{dirent, error::FsError, fs_constants::*, inode::InodeType, UnixFs};

/// 请求处理的结果，由连接层编成HTTP响应
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// 按`/`切开、丢掉空段，再丢掉第一段服务前缀，
/// 剩下的就是文件系统内的路径
pub fn path_components(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    if !parts.is_empty() {
        parts.remove(0);
    }
    parts
}

/// 引擎错误到状态码
fn status_of(err: &FsError) -> u16 {
    match err {
        FsError::NotEnoughSpace => 507,
        FsError::NotFound => 404,
        FsError::Io(_) => 500,
        _ => 400,
    }
}

/// GET：文件返回原始内容，目录返回排好序的条目清单。
/// 只读，不需要事务
pub fn get(fs: &UnixFs, path: &str) -> Reply {
    let components = path_components(path);
    let mut cur = ROOT_INODE;
    for comp in &components {
        match fs.lookup(cur, comp) {
            Ok(next) => cur = next,
            Err(_) => return Reply::status(404),
        }
    }
    let node = match fs.stat(cur) {
        Ok(node) => node,
        Err(_) => return Reply::status(404),
    };

    if node.is_file() {
        match fs.read(cur, node.size as usize) {
            Ok(bytes) => Reply::ok(bytes),
            Err(err) => Reply::status(status_of(&err)),
        }
    } else if node.is_dir() {
        match list_directory(fs, cur) {
            Ok(body) => Reply::ok(body),
            Err(err) => Reply::status(status_of(&err)),
        }
    } else {
        Reply::status(404)
    }
}

/// PUT：中间缺的目录补出来，终点存在就覆盖，不存在就新建再写。
/// 整个请求套在一个事务里，第一处失败就整体回滚
pub fn put(fs: &mut UnixFs, path: &str, body: &[u8]) -> Reply {
    let components = path_components(path);
    let Some((file_name, dirs)) = components.split_last() else {
        return Reply::status(400);
    };

    fs.begin_transaction();
    let mut cur = ROOT_INODE;
    for comp in dirs {
        match fs.lookup(cur, comp) {
            Ok(next) => match fs.stat(next) {
                // 中途撞上非目录就没法往下走
                Ok(node) if node.is_dir() => cur = next,
                Ok(_) => return fail(fs, 409),
                Err(err) => return fail(fs, status_of(&err)),
            },
            Err(FsError::NotFound) => match fs.create(cur, InodeType::Directory, comp) {
                Ok(new_dir) => cur = new_dir,
                Err(err) => return fail(fs, status_of(&err)),
            },
            Err(err) => return fail(fs, status_of(&err)),
        }
    }

    let target = match fs.lookup(cur, file_name) {
        Ok(existing) => Ok(existing),
        Err(FsError::NotFound) => fs.create(cur, InodeType::RegularFile, file_name),
        Err(err) => Err(err),
    };
    match target.and_then(|inum| fs.write(inum, body).map(|_| ())) {
        Ok(()) => finish(fs, path),
        Err(err) => fail(fs, status_of(&err)),
    }
}

/// DELETE：空路径不合法；解析到最后一段，对父目录unlink
pub fn delete(fs: &mut UnixFs, path: &str) -> Reply {
    let components = path_components(path);
    let Some((name, dirs)) = components.split_last() else {
        return Reply::status(400);
    };

    fs.begin_transaction();
    let mut parent = ROOT_INODE;
    for comp in dirs {
        match fs.lookup(parent, comp) {
            Ok(next) => parent = next,
            Err(err) => return fail(fs, status_of(&err)),
        }
    }
    // DELETE不存在的路径是404，和unlink本身的幂等区分开
    if let Err(err) = fs.lookup(parent, name) {
        return fail(fs, status_of(&err));
    }
    match fs.unlink(parent, name) {
        Ok(()) => finish(fs, path),
        Err(err) => fail(fs, status_of(&err)),
    }
}

/// 目录清单：排除`.`和`..`，子目录名尾缀`/`，字节序排序，一行一个
fn list_directory(fs: &UnixFs, inum: u32) -> Result<Vec<u8>, FsError> {
    let node = fs.stat(inum)?;
    let bytes = fs.read(inum, node.size as usize)?;

    let mut names = Vec::new();
    for entry in dirent::entries_from_bytes(&bytes)? {
        if entry.is_empty_slot() || entry.is_special() {
            continue;
        }
        let Ok(child) = fs.stat(entry.inum) else {
            continue;
        };
        let mut name = entry.name_str();
        if child.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let mut body = Vec::new();
    for name in names {
        body.extend_from_slice(name.as_bytes());
        body.push(b'\n');
    }
    Ok(body)
}

fn finish(fs: &mut UnixFs, path: &str) -> Reply {
    match fs.commit() {
        Ok(()) => {
            debug!("committed {}", path);
            Reply::status(200)
        }
        Err(err) => {
            warn!("commit failed for {}: {}", path, err);
            Reply::status(status_of(&err))
        }
    }
}

fn fail(fs: &mut UnixFs, status: u16) -> Reply {
    fs.rollback();
    Reply::status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ufs::{block::Disk, mkfs};

    fn build_fs(num_inodes: u32, num_data: u32) -> (TempDir, UnixFs) {
        let dir = TempDir::new().expect("tempdir");
        let image = dir.path().join("disk.img");
        mkfs::format(&image, num_inodes, num_data).expect("format");
        let fs = UnixFs::mount(Disk::open(&image).expect("open")).expect("mount");
        (dir, fs)
    }

    fn bitmap_snapshot(fs: &UnixFs) -> (Vec<u8>, Vec<u8>) {
        (
            fs.read_inode_bitmap().expect("inode bitmap").to_bytes(),
            fs.read_data_bitmap().expect("data bitmap").to_bytes(),
        )
    }

    #[test]
    fn drops_service_prefix_and_empty_segments() {
        assert_eq!(path_components("/svc/a//b/"), vec!["a", "b"]);
        assert!(path_components("/svc").is_empty());
        assert!(path_components("/").is_empty());
    }

    #[test]
    fn put_creates_nested_file() {
        let (_dir, mut fs) = build_fs(64, 64);
        assert_eq!(put(&mut fs, "/svc/a/b/c.txt", b"hello").status, 200);

        let a = fs.lookup(ROOT_INODE, "a").expect("a");
        let b = fs.lookup(a, "b").expect("b");
        let c = fs.lookup(b, "c.txt").expect("c.txt");
        assert_eq!(fs.read(c, 5).expect("read"), b"hello");
    }

    #[test]
    fn get_renders_files_and_listings() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/a/b/c.txt", b"hello");

        let reply = get(&fs, "/svc/a/b/c.txt");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"hello");

        assert_eq!(get(&fs, "/svc/a/b").body, b"c.txt\n");
        assert_eq!(get(&fs, "/svc/a").body, b"b/\n");
        assert_eq!(get(&fs, "/svc").body, b"a/\n");
    }

    #[test]
    fn listing_is_sorted_with_directory_suffix() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/zeta", b"1");
        put(&mut fs, "/svc/alpha/inner", b"2");
        put(&mut fs, "/svc/beta", b"3");
        assert_eq!(get(&fs, "/svc").body, b"alpha/\nbeta\nzeta\n");
    }

    #[test]
    fn get_missing_path_is_not_found() {
        let (_dir, fs) = build_fs(64, 64);
        assert_eq!(get(&fs, "/svc/nope").status, 404);
        assert_eq!(get(&fs, "/svc/no/such/file").status, 404);
    }

    #[test]
    fn put_overwrites_existing_file() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/a/b/c.txt", b"hello");
        let big = vec![b'z'; 2 * BLOCK_SIZE];
        assert_eq!(put(&mut fs, "/svc/a/b/c.txt", &big).status, 200);

        let a = fs.lookup(ROOT_INODE, "a").expect("a");
        let b = fs.lookup(a, "b").expect("b");
        let c = fs.lookup(b, "c.txt").expect("c");
        let node = fs.stat(c).expect("stat");
        assert_eq!(node.size as usize, 2 * BLOCK_SIZE);
        assert_eq!(node.direct.iter().filter(|&&ptr| ptr != 0).count(), 2);
        assert_eq!(get(&fs, "/svc/a/b/c.txt").body, big);
    }

    #[test]
    fn put_conflicts_when_intermediate_is_a_file() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/f", b"flat");
        assert_eq!(put(&mut fs, "/svc/f/x.txt", b"nested").status, 409);
        // 回滚之后旧文件原样
        assert_eq!(get(&fs, "/svc/f").body, b"flat");
    }

    #[test]
    fn put_on_directory_target_is_rejected() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/d/inner", b"x");
        assert_eq!(put(&mut fs, "/svc/d", b"overwrite dir").status, 400);
        assert_eq!(get(&fs, "/svc/d/inner").status, 200);
    }

    #[test]
    fn put_without_final_component_is_rejected() {
        let (_dir, mut fs) = build_fs(64, 64);
        assert_eq!(put(&mut fs, "/svc", b"x").status, 400);
        assert_eq!(put(&mut fs, "/", b"x").status, 400);
    }

    #[test]
    fn put_out_of_space_rolls_back_everything() {
        // 数据区只有1块，早被根目录占了
        let (_dir, mut fs) = build_fs(16, 1);
        let snapshot = bitmap_snapshot(&fs);

        assert_eq!(put(&mut fs, "/svc/big.bin", &vec![7u8; 5000]).status, 507);
        assert_eq!(bitmap_snapshot(&fs), snapshot);
        assert_eq!(get(&fs, "/svc/big.bin").status, 404);
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/a/b/c.txt", b"hello");
        let a = fs.lookup(ROOT_INODE, "a").expect("a");
        let b = fs.lookup(a, "b").expect("b");
        let c = fs.lookup(b, "c.txt").expect("c");

        assert_eq!(delete(&mut fs, "/svc/a/b/c.txt").status, 200);
        assert_eq!(get(&fs, "/svc/a/b/c.txt").status, 404);
        assert!(!fs
            .read_inode_bitmap()
            .expect("bitmap")
            .is_set(c as usize));
    }

    #[test]
    fn delete_missing_path_is_not_found() {
        let (_dir, mut fs) = build_fs(64, 64);
        assert_eq!(delete(&mut fs, "/svc/ghost").status, 404);
    }

    #[test]
    fn delete_empty_path_is_rejected() {
        let (_dir, mut fs) = build_fs(64, 64);
        assert_eq!(delete(&mut fs, "/svc").status, 400);
        assert_eq!(delete(&mut fs, "/").status, 400);
    }

    #[test]
    fn delete_non_empty_directory_is_rejected_unchanged() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/a/b/c.txt", b"hello");
        let snapshot = bitmap_snapshot(&fs);

        assert_eq!(delete(&mut fs, "/svc/a").status, 400);
        assert_eq!(bitmap_snapshot(&fs), snapshot);
        assert_eq!(get(&fs, "/svc/a/b/c.txt").body, b"hello");
    }

    #[test]
    fn delete_empty_directory_succeeds() {
        let (_dir, mut fs) = build_fs(64, 64);
        put(&mut fs, "/svc/d/x", b"1");
        assert_eq!(delete(&mut fs, "/svc/d/x").status, 200);
        assert_eq!(delete(&mut fs, "/svc/d").status, 200);
        assert_eq!(get(&fs, "/svc/d").status, 404);
    }
}
