//! 中国象棋双人对战
//!
//! 包含:
//! - 启动配置（命令行和 JSON 配置文件）
//! - 对局会话（选子、走棋、重开、退出）
//! - 对战同步（建立连接、收发消息）
//! - 文本界面

pub mod config;
pub mod session;
pub mod sync;
pub mod terminal;

pub use config::{Cli, PeerConfig, PeerMode};
pub use session::{LastMove, MoveOutcome, RejectReason, Session, SessionView};
pub use sync::SyncTasks;
