//! 错误类型定义

use thiserror::Error;

/// 象棋规则错误
///
/// 规则引擎本身不返回错误，只在局面导入和会话层使用。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChessError {
    /// 无效的位置
    #[error("Invalid position: ({x}, {y})")]
    InvalidPosition { x: i8, y: i8 },

    /// 没有棋子
    #[error("No piece at position ({x}, {y})")]
    NoPiece { x: i8, y: i8 },

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 未知消息类型
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
