//! 文本界面
//!
//! 从标准输入读取命令，把局面画成文本。所有操作都交给 [`Session`]。

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use protocol::{Position, Side, BOARD_HEIGHT, BOARD_WIDTH};

use crate::session::{wait_until, MoveOutcome, Session, SessionView};

const HELP: &str = "\
命令:
  select x y   选中 (x, y) 的棋子并显示可走位置（简写 s）
  move x y     把选中的棋子走到 (x, y)（简写 m）
  board        重新显示棋盘
  restart      重新开局
  quit         退出（简写 q）
  help         显示本帮助
坐标 x 为列 (0-8)，y 为行 (0-9)，第 0 行为黑方底线";

/// 终端命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(Position),
    Move(Position),
    Board,
    Restart,
    Quit,
    Help,
}

/// 命令解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("未知命令: {0}，输入 help 查看帮助")]
    Unknown(String),

    #[error("用法: {0} x y")]
    MissingCoordinates(&'static str),

    #[error("坐标无效: {0}")]
    InvalidCoordinate(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(Command::Board);
        };

        match name {
            "select" | "s" => Ok(Command::Select(parse_position("select", words)?)),
            "move" | "m" => Ok(Command::Move(parse_position("move", words)?)),
            "board" | "b" => Ok(Command::Board),
            "restart" => Ok(Command::Restart),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            "help" | "h" | "?" => Ok(Command::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_position<'a>(
    name: &'static str,
    mut words: impl Iterator<Item = &'a str>,
) -> Result<Position, CommandError> {
    let (Some(x), Some(y)) = (words.next(), words.next()) else {
        return Err(CommandError::MissingCoordinates(name));
    };
    let invalid = || CommandError::InvalidCoordinate(format!("{} {}", x, y));
    let x: i8 = x.parse().map_err(|_| invalid())?;
    let y: i8 = y.parse().map_err(|_| invalid())?;
    Position::checked(x, y).ok_or_else(invalid)
}

/// 把局面画成文本
///
/// 每格三列：标记加棋子。`*` 为可走位置，`>` 为选中的棋子，`+` 为上一步的起点。
pub fn render(view: &SessionView) -> String {
    let state = &view.state;
    let selected_pos = view.selected.map(|id| state.piece(id).pos);
    let last_from = view.last_moved.map(|last| last.from);

    let mut out = String::new();
    let _ = writeln!(out, "{}", captured_tray(view, Side::Black));
    out.push_str("   ");
    for x in 0..BOARD_WIDTH {
        let _ = write!(out, " {} ", x);
    }
    out.push('\n');

    for y in 0..BOARD_HEIGHT as i8 {
        if y == 5 {
            out.push_str("   ─────── 楚河    漢界 ───────\n");
        }
        let _ = write!(out, "{:>2} ", y);
        for x in 0..BOARD_WIDTH as i8 {
            let pos = Position::new(x, y);
            let marker = if view.highlights.contains(&pos) {
                '*'
            } else if selected_pos == Some(pos) {
                '>'
            } else if last_from == Some(pos) {
                '+'
            } else {
                ' '
            };
            let glyph = state.piece_at(pos).map_or('．', |piece| piece.display_char());
            out.push(marker);
            out.push(glyph);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", captured_tray(view, Side::Red));
    out.push_str(&banner(view));
    out
}

/// 一方被吃掉的棋子
fn captured_tray(view: &SessionView, side: Side) -> String {
    let captured: String = view
        .state
        .pieces()
        .iter()
        .filter(|piece| piece.side == side && piece.captured)
        .map(|piece| piece.display_char())
        .collect();
    format!("{}被吃: {}", side, captured)
}

/// 走子方和将军状态
fn banner(view: &SessionView) -> String {
    let state = &view.state;
    let turn = state.current_turn();

    let mut line = match state.checking() {
        Some(attacker) if state.checkmate() => {
            format!("{}被将死，{}胜", attacker.opponent(), attacker)
        }
        Some(attacker) => format!("{}将军！轮到{}", attacker, turn),
        None => format!("轮到{}", turn),
    };
    if let Some(local) = view.playing_as {
        let _ = write!(line, "（你执{}）", local);
    }
    line
}

/// 执行一条命令，返回是否继续
async fn execute(session: &Session, command: Command) -> bool {
    match command {
        Command::Select(pos) => {
            let moves = session.select(pos).await;
            if moves.is_empty() && session.view().await.selected.is_none() {
                println!("{} 没有棋子", pos);
            }
            println!("{}", render(&session.view().await));
        }
        Command::Move(pos) => {
            if let MoveOutcome::Rejected(reason) = session.submit(pos).await {
                println!("无法走棋: {}", reason);
            }
        }
        Command::Board => println!("{}", render(&session.view().await)),
        Command::Restart => session.restart().await,
        Command::Quit => {
            session.quit().await;
            return false;
        }
        Command::Help => println!("{}", HELP),
    }
    true
}

/// 在独立线程中读取标准输入
///
/// 阻塞读取无法取消，放在普通线程里不会拖住运行时的退出。
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// 运行文本界面，直到本方或对方退出
pub async fn run(session: Arc<Session>) -> anyhow::Result<()> {
    let mut lines = spawn_stdin_reader();
    let mut turn_rx = session.subscribe_turn();
    let mut quit_rx = session.subscribe_quit();

    println!("{}", HELP);
    println!("{}", render(&session.view().await));

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    session.quit().await;
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !execute(&session, command).await {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            changed = turn_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render(&session.view().await));
            }
            _ = wait_until(&mut quit_rx, |quit| *quit) => {
                println!("对局结束");
                break;
            }
        }
    }

    Ok(())
}
