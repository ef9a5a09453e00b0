//! 协议常量定义

use std::time::Duration;

/// 棋盘宽度（列数）
pub const BOARD_WIDTH: usize = 9;

/// 棋盘高度（行数）
pub const BOARD_HEIGHT: usize = 10;

/// 双方棋子总数（固定槽位数）
pub const PIECE_COUNT: usize = 32;

/// 河界：黑方一侧为 0-4 行，红方一侧为 5-9 行
pub const RIVER_BLACK_EDGE: i8 = 4;

/// 河界红方一侧的第一行
pub const RIVER_RED_EDGE: i8 = 5;

/// 对战消息固定长度（字节）
pub const MESSAGE_SIZE: usize = 5;

/// 默认端口
pub const DEFAULT_PORT: u16 = 9527;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 客户端重连间隔（毫秒）
pub const CONNECT_RETRY_INTERVAL_MS: u64 = 100;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 重连间隔 Duration
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(CONNECT_RETRY_INTERVAL_MS);
