//! 对战消息定义
//!
//! 固定 5 字节：
//! - 0: 消息类型（0: Move, 1: Restart, 2: Quit）
//! - 1: 起始列
//! - 2: 起始行
//! - 3: 目标列
//! - 4: 目标行
//!
//! Restart 和 Quit 忽略第 1-4 字节。

use serde::{Deserialize, Serialize};

use crate::constants::MESSAGE_SIZE;
use crate::error::{ProtocolError, Result};
use crate::moves::Move;
use crate::piece::Position;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Move = 0,
    Restart = 1,
    Quit = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MessageType::Move),
            1 => Ok(MessageType::Restart),
            2 => Ok(MessageType::Quit),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

/// 双方之间传递的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// 走棋：把起始位置的棋子走到目标位置
    Move(Move),
    /// 重新开局，收到后立即处理
    Restart,
    /// 退出对局，收到后立即处理
    Quit,
}

impl PeerMessage {
    /// 消息类型
    pub fn message_type(&self) -> MessageType {
        match self {
            PeerMessage::Move(_) => MessageType::Move,
            PeerMessage::Restart => MessageType::Restart,
            PeerMessage::Quit => MessageType::Quit,
        }
    }

    /// 编码为固定长度字节
    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let mut bytes = [0u8; MESSAGE_SIZE];
        bytes[0] = self.message_type() as u8;
        if let PeerMessage::Move(mv) = self {
            bytes[1] = mv.from.x as u8;
            bytes[2] = mv.from.y as u8;
            bytes[3] = mv.to.x as u8;
            bytes[4] = mv.to.y as u8;
        }
        bytes
    }

    /// 从固定长度字节解码
    ///
    /// 坐标不做校验，对方发来的走法视为可信。
    pub fn decode(bytes: &[u8; MESSAGE_SIZE]) -> Result<Self> {
        let message = match MessageType::try_from(bytes[0])? {
            MessageType::Move => PeerMessage::Move(Move::new(
                Position::new(bytes[1] as i8, bytes[2] as i8),
                Position::new(bytes[3] as i8, bytes[4] as i8),
            )),
            MessageType::Restart => PeerMessage::Restart,
            MessageType::Quit => PeerMessage::Quit,
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_layout() {
        let msg = PeerMessage::Move(Move::new(Position::new(1, 7), Position::new(1, 0)));
        assert_eq!(msg.encode(), [0, 1, 7, 1, 0]);
        assert_eq!(PeerMessage::decode(&[0, 1, 7, 1, 0]).unwrap(), msg);
    }

    #[test]
    fn test_restart_and_quit_ignore_payload() {
        assert_eq!(PeerMessage::Restart.encode(), [1, 0, 0, 0, 0]);
        assert_eq!(PeerMessage::Quit.encode(), [2, 0, 0, 0, 0]);
        assert_eq!(
            PeerMessage::decode(&[1, 9, 9, 9, 9]).unwrap(),
            PeerMessage::Restart
        );
        assert_eq!(PeerMessage::decode(&[2, 4, 0, 4, 1]).unwrap(), PeerMessage::Quit);
    }

    #[test]
    fn test_unknown_type() {
        let err = PeerMessage::decode(&[3, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(3)));
    }
}
