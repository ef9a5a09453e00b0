//! 中国象棋规则引擎与对战协议库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 走法生成、合法性过滤和走子执行
//! - FEN 局面导入导出
//! - 对战消息定义 (PeerMessage，固定 5 字节)
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod board;
mod constants;
mod error;
mod fen;
mod message;
mod moves;
mod piece;
mod transport;

pub use board::{GameState, Simulation, DEFAULT_SETUP};
pub use constants::*;
pub use error::{ChessError, ProtocolError, Result};
pub use fen::{Fen, INITIAL_FEN};
pub use message::{MessageType, PeerMessage};
pub use moves::{Move, MoveGenerator};
pub use piece::{Piece, PieceId, PieceType, Position, Side};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, TcpConnection,
    TcpConnector, TcpListener,
};
