//! 对局会话
//!
//! 会话持有对局状态、选中的棋子和上一步记录。本地输入和对方消息都通过会话修改局面，
//! 每个先读后写的操作都在同一把锁内完成。

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use protocol::{ChessError, GameState, Move, MoveGenerator, PeerMessage, PieceId, Position, Side};

/// 上一步走子，用于标记起点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastMove {
    pub piece: PieceId,
    pub from: Position,
}

/// 走棋被拒绝的原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("没有选中棋子")]
    NoSelection,

    #[error("选中的棋子不能走到 {0}")]
    NotHighlighted(Position),

    #[error("对局已结束")]
    GameOver,

    #[error("现在轮到{0}走棋")]
    OutOfTurn(Side),

    #[error("只能走{0}的棋子")]
    NotLocalSide(Side),
}

/// 提交走法的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(Move),
    Rejected(RejectReason),
}

/// 锁内的可变状态
#[derive(Debug, Clone)]
struct Table {
    state: GameState,
    selected: Option<PieceId>,
    highlights: Vec<Position>,
    last_moved: Option<LastMove>,
}

impl Table {
    fn new() -> Self {
        Self {
            state: GameState::new(),
            selected: None,
            highlights: Vec::new(),
            last_moved: None,
        }
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.highlights.clear();
    }

    /// 走棋并记录上一步，旧的高亮随之失效
    fn commit(&mut self, id: PieceId, to: Position) -> Move {
        let from = self.state.piece(id).pos;
        self.last_moved = Some(LastMove { piece: id, from });
        self.state.perform_move(id, to);
        self.clear_selection();
        Move::new(from, to)
    }
}

/// 供显示使用的局面快照
#[derive(Debug, Clone)]
pub struct SessionView {
    pub state: GameState,
    pub selected: Option<PieceId>,
    pub highlights: Vec<Position>,
    pub last_moved: Option<LastMove>,
    pub playing_as: Option<Side>,
}

/// 对局会话
pub struct Session {
    table: Mutex<Table>,
    /// 联机时本方执子，单机为 None
    playing_as: Option<Side>,
    /// 发往对方的消息，由发送循环写出
    outbox: Option<mpsc::Sender<PeerMessage>>,
    /// 每次走棋或重开后发布当前走子方
    turn: watch::Sender<Side>,
    quit: watch::Sender<bool>,
}

impl Session {
    fn with_parts(playing_as: Option<Side>, outbox: Option<mpsc::Sender<PeerMessage>>) -> Self {
        let table = Table::new();
        let (turn, _) = watch::channel(table.state.current_turn());
        let (quit, _) = watch::channel(false);
        Self {
            table: Mutex::new(table),
            playing_as,
            outbox,
            turn,
            quit,
        }
    }

    /// 单机会话
    pub fn offline() -> Self {
        Self::with_parts(None, None)
    }

    /// 联机会话，本方走法和重开、退出消息发往 `outbox`
    pub fn online(playing_as: Side, outbox: mpsc::Sender<PeerMessage>) -> Self {
        Self::with_parts(Some(playing_as), Some(outbox))
    }

    pub fn playing_as(&self) -> Option<Side> {
        self.playing_as
    }

    pub fn current_turn(&self) -> Side {
        *self.turn.borrow()
    }

    pub fn is_quit(&self) -> bool {
        *self.quit.borrow()
    }

    /// 订阅走子方变化（走棋和重开都会通知）
    pub fn subscribe_turn(&self) -> watch::Receiver<Side> {
        self.turn.subscribe()
    }

    /// 订阅退出信号
    pub fn subscribe_quit(&self) -> watch::Receiver<bool> {
        self.quit.subscribe()
    }

    /// 当前局面快照
    pub async fn view(&self) -> SessionView {
        let table = self.table.lock().await;
        SessionView {
            state: table.state.clone(),
            selected: table.selected,
            highlights: table.highlights.clone(),
            last_moved: table.last_moved,
            playing_as: self.playing_as,
        }
    }

    /// 选中指定位置的棋子，返回其合法目标
    ///
    /// 空位会清除当前选择。
    pub async fn select(&self, pos: Position) -> Vec<Position> {
        let mut table = self.table.lock().await;
        match table.state.find_piece(pos) {
            Some(id) => {
                let moves = MoveGenerator::legal_moves(&mut table.state, id);
                table.selected = Some(id);
                table.highlights = moves.clone();
                moves
            }
            None => {
                table.clear_selection();
                Vec::new()
            }
        }
    }

    /// 把选中的棋子走到 `to`
    ///
    /// 目标不在高亮中时保留选择；其余拒绝情况和走棋成功都会清除选择。
    pub async fn submit(&self, to: Position) -> MoveOutcome {
        let mut table = self.table.lock().await;

        let Some(id) = table.selected else {
            return MoveOutcome::Rejected(RejectReason::NoSelection);
        };
        if !table.highlights.contains(&to) {
            return MoveOutcome::Rejected(RejectReason::NotHighlighted(to));
        }

        let side = table.state.piece(id).side;
        let turn = table.state.current_turn();
        let rejection = if table.state.checkmate() {
            Some(RejectReason::GameOver)
        } else if side != turn {
            Some(RejectReason::OutOfTurn(turn))
        } else {
            match self.playing_as {
                Some(local) if local != side => Some(RejectReason::NotLocalSide(local)),
                _ => None,
            }
        };
        if let Some(reason) = rejection {
            table.clear_selection();
            return MoveOutcome::Rejected(reason);
        }

        let mv = table.commit(id, to);
        self.publish_turn(&table.state);
        self.send(PeerMessage::Move(mv));
        MoveOutcome::Moved(mv)
    }

    /// 重新开局
    pub async fn restart(&self) {
        let mut table = self.table.lock().await;
        *table = Table::new();
        self.publish_turn(&table.state);
        info!("重新开局");
        self.send(PeerMessage::Restart);
    }

    /// 退出对局，联机时通知对方
    pub async fn quit(&self) {
        if self.quit.send_replace(true) {
            return;
        }
        info!("退出对局");
        self.send(PeerMessage::Quit);
    }

    /// 连接断开，视为对方退出
    pub(crate) fn mark_disconnected(&self) {
        self.quit.send_replace(true);
    }

    /// 处理对方发来的消息
    ///
    /// 走法要等到轮到对方时才执行，不再检查合法性；重开和退出立即处理。
    pub async fn apply_remote(&self, msg: PeerMessage) {
        match msg {
            PeerMessage::Move(mv) => self.apply_remote_move(mv).await,
            PeerMessage::Restart => {
                let mut table = self.table.lock().await;
                *table = Table::new();
                self.publish_turn(&table.state);
                info!("对方重新开局");
            }
            PeerMessage::Quit => {
                info!("对方退出对局");
                self.quit.send_replace(true);
            }
        }
    }

    async fn apply_remote_move(&self, mv: Move) {
        let mut turn_rx = self.turn.subscribe();
        let mut quit_rx = self.quit.subscribe();

        loop {
            if let Some(local) = self.playing_as {
                tokio::select! {
                    _ = wait_until(&mut turn_rx, |turn| *turn != local) => {}
                    _ = wait_until(&mut quit_rx, |quit| *quit) => return,
                }
            }

            let mut table = self.table.lock().await;
            // 等待和加锁之间本方可能重开了对局
            if self.playing_as == Some(table.state.current_turn()) {
                continue;
            }

            let piece = table.state.require_piece(mv.from).and_then(|id| {
                if mv.to.is_valid() {
                    Ok(id)
                } else {
                    Err(ChessError::InvalidPosition {
                        x: mv.to.x,
                        y: mv.to.y,
                    })
                }
            });
            match piece {
                Ok(id) => {
                    debug!("执行对方走法 {}", mv);
                    table.commit(id, mv.to);
                    self.publish_turn(&table.state);
                }
                Err(e) => warn!("对方走法 {} 无效，已忽略: {}", mv, e),
            }
            return;
        }
    }

    fn publish_turn(&self, state: &GameState) {
        self.turn.send_replace(state.current_turn());
    }

    /// 放入发送队列，不等待
    ///
    /// 调用方可能持有对局锁，队列满时丢弃消息而不是阻塞其他操作。
    fn send(&self, msg: PeerMessage) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => warn!("发送队列已满，消息未发出: {:?}", msg),
            Err(TrySendError::Closed(msg)) => warn!("发送通道已关闭，消息未发出: {:?}", msg),
        }
    }
}

/// 等待 watch 中的值满足条件
///
/// 只返回 `()`，读锁不会留到等待结束之后。
pub(crate) async fn wait_until<T>(
    rx: &mut watch::Receiver<T>,
    condition: impl FnMut(&T) -> bool,
) {
    let _ = rx.wait_for(condition).await;
}
