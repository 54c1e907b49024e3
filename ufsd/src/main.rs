use std::{io, path::PathBuf, sync::Arc};

use clap::Parser;
use log::{error, info};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::RwLock,
};

use ufs::{block::Disk, UnixFs};

mod http;
mod service;

/// 把一个UFS磁盘镜像挂成HTTP服务：
/// GET读文件或列目录，PUT写文件（缺的目录顺手补上），DELETE删除
#[derive(Parser)]
struct Cli {
    /// 磁盘镜像路径（需要已经格式化，见ufs-mkfs）
    image: PathBuf,

    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let disk = Disk::open(&cli.image)?;
    let fs = UnixFs::mount(disk)?;
    let fs = Arc::new(RwLock::new(fs));

    let listener = TcpListener::bind(&cli.listen).await?;
    info!("server listening to {}", cli.listen);

    loop {
        let (socket, addr) = listener.accept().await?;
        let fs = Arc::clone(&fs);
        tokio::spawn(async move {
            if let Err(err) = handle(socket, fs).await {
                error!("request from {:?} failed: {}", addr, err);
            }
        });
    }
}

/// 一条连接处理一个请求。
/// GET走读锁；PUT/DELETE走写锁，改动的请求一次只进一个
async fn handle(mut socket: TcpStream, fs: Arc<RwLock<UnixFs>>) -> io::Result<()> {
    let request = match http::read_request(&mut socket).await {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            return http::write_response(&mut socket, 400, b"").await;
        }
        Err(err) => return Err(err),
    };

    let reply = match request.method.as_str() {
        "GET" => service::get(&*fs.read().await, &request.path),
        "PUT" => service::put(&mut *fs.write().await, &request.path, &request.body),
        "DELETE" => service::delete(&mut *fs.write().await, &request.path),
        _ => service::Reply::status(400),
    };
    http::write_response(&mut socket, reply.status, &reply.body).await
}
