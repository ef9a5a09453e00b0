//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使对战会话与具体传输实现解耦。
//! 每条消息都是固定 5 字节，不需要长度前缀。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::constants::{CONNECT_RETRY_INTERVAL, CONNECT_TIMEOUT, DEFAULT_PORT, MESSAGE_SIZE};
use crate::error::{ProtocolError, Result};
use crate::message::PeerMessage;

/// 网络配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 加入方连接的地址（主机方忽略）
    pub host: String,
    pub port: u16,
    /// 主机方监听 IPv6 通配地址
    pub ipv6: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            ipv6: false,
        }
    }
}

impl NetworkConfig {
    /// 主机方监听地址
    pub fn bind_addr(&self) -> String {
        if self.ipv6 {
            format!("[::]:{}", self.port)
        } else {
            format!("0.0.0.0:{}", self.port)
        }
    }

    /// 加入方连接地址
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// 连接抽象 trait（核心抽象，用于会话层）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送消息
    async fn send(&mut self, msg: &PeerMessage) -> Result<()>;

    /// 接收消息
    async fn recv(&mut self) -> Result<PeerMessage>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（加入方使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;

    /// 反复尝试连接，直到成功或超过 `max_wait`
    ///
    /// 对方可能还没开始监听，所以失败后间隔一段时间重试。
    async fn connect_with_retry(
        &self,
        addr: &str,
        max_wait: Option<Duration>,
    ) -> Result<Self::Conn> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.connect(addr).await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    debug!("Connect attempt {} to {} failed: {}", attempts, addr, e);
                    if max_wait.is_some_and(|limit| started.elapsed() >= limit) {
                        return Err(ProtocolError::ConnectionTimeout);
                    }
                    sleep(CONNECT_RETRY_INTERVAL).await;
                }
            }
        }
    }
}

/// 监听器 trait（主机方使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端，分别交给接收循环和发送循环
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, msg: &PeerMessage) -> Result<()> {
        self.writer.write_frame(msg).await
    }

    async fn recv(&mut self) -> Result<PeerMessage> {
        self.reader.read_frame().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        debug!("Accepted TCP connection from {}", addr);
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 帧编解码
// ============================================================================

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// 读取并解码一帧消息
    ///
    /// 对方关闭连接时返回 `ConnectionClosed`。
    pub async fn read_frame(&mut self) -> Result<PeerMessage> {
        let mut frame = [0u8; MESSAGE_SIZE];
        self.reader.read_exact(&mut frame).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtocolError::ConnectionClosed
            } else {
                ProtocolError::Io(e)
            }
        })?;

        PeerMessage::decode(&frame)
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 编码并写入一帧消息
    pub async fn write_frame(&mut self, msg: &PeerMessage) -> Result<()> {
        self.writer.write_all(&msg.encode()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
