//! 对战同步
//!
//! 建立连接后启动两个任务：接收循环把对方消息交给会话，发送循环写出会话产生的消息。

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use protocol::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, PeerMessage,
    ProtocolError, Side, TcpConnection, TcpConnector, TcpListener,
};

use crate::session::{wait_until, Session};

/// 发送队列容量
const OUTBOX_CAPACITY: usize = 32;

/// 主机方：监听并接受一个对手
pub async fn host(network: &NetworkConfig) -> anyhow::Result<TcpConnection> {
    let addr = network.bind_addr();
    let mut listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("正在等待对方连接 {}", listener.local_addr().unwrap_or(addr));

    let conn = listener.accept().await.context("接受连接失败")?;
    info!("对方已连接: {}", conn.peer_addr().unwrap_or_default());
    Ok(conn)
}

/// 加入方：反复尝试连接主机方，直到成功
pub async fn join(network: &NetworkConfig) -> anyhow::Result<TcpConnection> {
    let addr = network.connect_addr();
    info!("正在联系 {}", addr);

    let conn = TcpConnector
        .connect_with_retry(&addr, None)
        .await
        .with_context(|| format!("无法连接 {}", addr))?;
    info!("已连接到 {}", addr);
    Ok(conn)
}

/// 同步任务句柄
pub struct SyncTasks {
    pub receiver: JoinHandle<protocol::Result<()>>,
    pub sender: JoinHandle<protocol::Result<()>>,
}

impl SyncTasks {
    /// 等待两个任务结束
    pub async fn join(self) -> anyhow::Result<()> {
        let received = self.receiver.await.context("接收任务异常退出")?;
        let sent = self.sender.await.context("发送任务异常退出")?;
        received?;
        sent?;
        Ok(())
    }
}

/// 在 TCP 连接上启动联机会话
pub fn start(playing_as: Side, conn: TcpConnection) -> (Arc<Session>, SyncTasks) {
    let (reader, writer) = conn.split();
    start_with(playing_as, reader, writer)
}

/// 在任意读写端上启动联机会话
pub fn start_with<R, W>(
    playing_as: Side,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
) -> (Arc<Session>, SyncTasks)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
    let session = Arc::new(Session::online(playing_as, tx));

    let receiver = tokio::spawn(receive_loop(Arc::clone(&session), reader));
    let sender = tokio::spawn(send_loop(rx, writer));

    (session, SyncTasks { receiver, sender })
}

/// 接收循环
///
/// 对方断开视为退出；其他读取错误会结束循环并返回。
async fn receive_loop<R>(session: Arc<Session>, mut reader: FrameReader<R>) -> protocol::Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut quit_rx = session.subscribe_quit();

    loop {
        tokio::select! {
            _ = wait_until(&mut quit_rx, |quit| *quit) => return Ok(()),
            frame = reader.read_frame() => match frame {
                Ok(msg) => session.apply_remote(msg).await,
                Err(ProtocolError::ConnectionClosed) => {
                    info!("对方已断开连接");
                    session.mark_disconnected();
                    return Ok(());
                }
                Err(e) => {
                    error!("接收消息失败: {}", e);
                    session.mark_disconnected();
                    return Err(e);
                }
            },
        }
    }
}

/// 发送循环
///
/// 会话释放或发出退出消息后关闭写端。
async fn send_loop<W>(
    mut outbox: mpsc::Receiver<PeerMessage>,
    mut writer: FrameWriter<W>,
) -> protocol::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(msg) = outbox.recv().await {
        if let Err(e) = writer.write_frame(&msg).await {
            error!("发送消息失败: {}", e);
            return Err(e);
        }
        if msg == PeerMessage::Quit {
            break;
        }
    }

    // 对方可能已经关闭，关闭失败不影响退出
    let _ = writer.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
    use tokio::time::timeout;

    use crate::session::MoveOutcome;
    use protocol::Position;

    type Pipe = (FrameReader<ReadHalf<DuplexStream>>, FrameWriter<WriteHalf<DuplexStream>>);

    fn pipes() -> (Pipe, Pipe) {
        let (a, b) = duplex(256);
        let (a_read, a_write) = split(a);
        let (b_read, b_write) = split(b);
        (
            (FrameReader::new(a_read), FrameWriter::new(a_write)),
            (FrameReader::new(b_read), FrameWriter::new(b_write)),
        )
    }

    async fn wait_turn(session: &Session, side: Side) {
        let mut rx = session.subscribe_turn();
        timeout(Duration::from_secs(1), rx.wait_for(|turn| *turn == side))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_moves_and_restart_propagate() {
        let ((host_r, host_w), (join_r, join_w)) = pipes();
        let (host, host_tasks) = start_with(Side::Red, host_r, host_w);
        let (guest, guest_tasks) = start_with(Side::Black, join_r, join_w);

        // 红方走棋，黑方同步
        host.select(Position::new(1, 7)).await;
        assert!(matches!(
            host.submit(Position::new(4, 7)).await,
            MoveOutcome::Moved(_)
        ));
        wait_turn(&guest, Side::Black).await;
        let view = guest.view().await;
        assert!(view.state.find_piece(Position::new(4, 7)).is_some());
        assert_eq!(view.last_moved.unwrap().from, Position::new(1, 7));

        // 黑方走棋，红方同步
        guest.select(Position::new(1, 0)).await;
        assert!(matches!(
            guest.submit(Position::new(2, 2)).await,
            MoveOutcome::Moved(_)
        ));
        wait_turn(&host, Side::Red).await;
        assert_eq!(host.view().await.state, guest.view().await.state);

        // 黑方重开，红方立即重置
        guest.restart().await;
        timeout(Duration::from_secs(1), async {
            while host.view().await.state != protocol::GameState::new() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // 红方退出，黑方收到退出
        host.quit().await;
        let mut guest_quit = guest.subscribe_quit();
        timeout(Duration::from_secs(1), guest_quit.wait_for(|quit| *quit))
            .await
            .unwrap()
            .unwrap();

        drop(host);
        drop(guest);
        timeout(Duration::from_secs(1), host_tasks.join())
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_secs(1), guest_tasks.join())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_receive_loop_runs_as_task() {
        let ((reader, _unused), (_peer_reader, mut peer_writer)) = pipes();
        let (tx, _outbox) = mpsc::channel(OUTBOX_CAPACITY);
        let session = Arc::new(Session::online(Side::Black, tx));
        let receiver = tokio::spawn(receive_loop(Arc::clone(&session), reader));

        peer_writer
            .write_frame(&PeerMessage::Move(protocol::Move::new(
                Position::new(1, 7),
                Position::new(4, 7),
            )))
            .await
            .unwrap();
        wait_turn(&session, Side::Black).await;

        peer_writer.write_frame(&PeerMessage::Quit).await.unwrap();
        timeout(Duration::from_secs(1), receiver)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(session.is_quit());
        assert!(session.view().await.state.find_piece(Position::new(4, 7)).is_some());
    }

    #[tokio::test]
    async fn test_disconnect_is_implicit_quit() {
        let ((host_r, host_w), (join_r, join_w)) = pipes();
        let (host, host_tasks) = start_with(Side::Red, host_r, host_w);

        // 对方直接关闭连接
        drop(join_r);
        drop(join_w);

        let mut quit_rx = host.subscribe_quit();
        timeout(Duration::from_secs(1), quit_rx.wait_for(|quit| *quit))
            .await
            .unwrap()
            .unwrap();

        drop(host);
        timeout(Duration::from_secs(1), host_tasks.join())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_host_and_join_over_tcp() {
        let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let network = NetworkConfig {
            host: "127.0.0.1".to_string(),
            port,
            ipv6: false,
        };

        let join_network = network.clone();
        let joining = tokio::spawn(async move { join(&join_network).await });
        let host_conn = host(&network).await.unwrap();
        let join_conn = joining.await.unwrap().unwrap();

        let (host_session, host_tasks) = start(Side::Red, host_conn);
        let (join_session, join_tasks) = start(Side::Black, join_conn);

        host_session.select(Position::new(0, 6)).await;
        assert!(matches!(
            host_session.submit(Position::new(0, 5)).await,
            MoveOutcome::Moved(_)
        ));
        wait_turn(&join_session, Side::Black).await;

        join_session.quit().await;
        let mut quit_rx = host_session.subscribe_quit();
        timeout(Duration::from_secs(1), quit_rx.wait_for(|quit| *quit))
            .await
            .unwrap()
            .unwrap();

        drop(host_session);
        drop(join_session);
        timeout(Duration::from_secs(1), host_tasks.join())
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_secs(1), join_tasks.join())
            .await
            .unwrap()
            .unwrap();
    }
}
