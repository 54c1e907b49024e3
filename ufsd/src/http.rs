use std::io::{self, Error, ErrorKind};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

const MAX_HEADER_BYTES: usize = 64 * 1024;

/// 一次请求的要素，body长度由Content-Length决定
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// 从socket读出一个完整请求。
/// 对端没发东西就关了返回None，报文不成样子返回InvalidData
pub async fn read_request(socket: &mut TcpStream) -> io::Result<Option<Request>> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];

    // 1. 先凑齐头部
    let header_end = loop {
        if let Some(pos) = find_header_end(&raw) {
            break pos;
        }
        if raw.len() > MAX_HEADER_BYTES {
            return Err(invalid("header too large"));
        }
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            if raw.is_empty() {
                return Ok(None);
            }
            return Err(invalid("connection closed mid header"));
        }
        raw.extend_from_slice(&buf[..n]);
    };

    let head = std::str::from_utf8(&raw[..header_end]).map_err(|_| invalid("header not utf8"))?;
    let (method, path, content_length) = parse_head(head)?;

    // 2. 再把body补齐
    let mut body = raw[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Err(invalid("connection closed mid body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    Ok(Some(Request { method, path, body }))
}

/// 写回状态行和定长body，发完就关连接
pub async fn write_response(socket: &mut TcpStream, status: u16, body: &[u8]) -> io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body).await?;
    socket.shutdown().await
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

/// 解析请求行和头部，返回(method, path, content_length)
fn parse_head(head: &str) -> io::Result<(String, String, usize)> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or_else(|| invalid("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| invalid("missing method"))?;
    let path = parts.next().ok_or_else(|| invalid("missing path"))?;

    let mut content_length = 0usize;
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            if key.eq_ignore_ascii_case("content-length") {
                content_length = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid("bad content-length"))?;
            }
        }
    }
    Ok((method.to_string(), path.to_string(), content_length))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        507 => "Insufficient Storage",
        _ => "Unknown",
    }
}

fn invalid(msg: &str) -> Error {
    Error::new(ErrorKind::InvalidData, msg.to_string())
}
