//! FEN 格式解析和生成
//!
//! 格式：`<棋盘> [走子方]`，棋盘共 10 行，第一行为第 0 行（黑方底线）。
//!
//! 示例：
//! `rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR r`
//!
//! 解析出的棋子按类型和阵营依次放入初始布局的槽位，
//! 所以将/帅始终在槽位 0 和 1；没用到的槽位标记为已被吃。

use crate::board::{GameState, DEFAULT_SETUP};
use crate::constants::{BOARD_HEIGHT, BOARD_WIDTH, PIECE_COUNT};
use crate::error::ChessError;
use crate::piece::{Piece, PieceId, PieceType, Position, Side};

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR r";

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串为对局状态
    pub fn parse(fen: &str) -> Result<GameState, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ChessError::InvalidFen {
                reason: "Empty FEN string".to_string(),
            });
        }

        let pieces = Self::parse_board(parts[0])?;

        // 解析走子方（默认红方）
        let current_turn = match parts.get(1) {
            Some(field) => field
                .chars()
                .next()
                .and_then(Side::from_fen_char)
                .ok_or_else(|| ChessError::InvalidFen {
                    reason: format!("Invalid side to move: {}", field),
                })?,
            None => Side::Red,
        };

        Ok(GameState::from_pieces(pieces, current_turn))
    }

    /// 解析棋盘部分并分配槽位
    fn parse_board(board_str: &str) -> Result<[Piece; PIECE_COUNT], ChessError> {
        let rows: Vec<&str> = board_str.split('/').collect();
        if rows.len() != BOARD_HEIGHT {
            return Err(ChessError::InvalidFen {
                reason: format!("Expected {} rows, got {}", BOARD_HEIGHT, rows.len()),
            });
        }

        let mut pieces = DEFAULT_SETUP;
        let mut used = [false; PIECE_COUNT];

        for (y, row) in rows.iter().enumerate() {
            let mut x = 0usize;

            for c in row.chars() {
                if x >= BOARD_WIDTH {
                    return Err(ChessError::InvalidFen {
                        reason: format!("Row {} has too many columns", y),
                    });
                }

                if let Some(empty_count) = c.to_digit(10) {
                    x += empty_count as usize;
                } else if let Some((piece_type, side)) = PieceType::from_fen_char(c) {
                    let slot = Self::free_slot(&used, piece_type, side).ok_or_else(|| {
                        ChessError::InvalidFen {
                            reason: format!("Too many pieces of kind '{}'", c),
                        }
                    })?;
                    used[slot] = true;
                    pieces[slot] = Piece::new(Position::new(x as i8, y as i8), piece_type, side);
                    x += 1;
                } else {
                    return Err(ChessError::InvalidFen {
                        reason: format!("Invalid piece character: {}", c),
                    });
                }
            }

            if x != BOARD_WIDTH {
                return Err(ChessError::InvalidFen {
                    reason: format!("Row {} has {} columns, expected {}", y, x, BOARD_WIDTH),
                });
            }
        }

        for side in [Side::Red, Side::Black] {
            if !used[PieceId::general(side).index()] {
                return Err(ChessError::InvalidFen {
                    reason: format!("Missing general for {:?}", side),
                });
            }
        }

        // 没用到的槽位保留初始位置，只标记为已被吃
        for (slot, piece) in pieces.iter_mut().enumerate() {
            if !used[slot] {
                piece.captured = true;
            }
        }

        Ok(pieces)
    }

    /// 查找初始布局中同类型同阵营的第一个空闲槽位
    fn free_slot(used: &[bool; PIECE_COUNT], piece_type: PieceType, side: Side) -> Option<usize> {
        DEFAULT_SETUP
            .iter()
            .enumerate()
            .position(|(slot, template)| {
                !used[slot] && template.piece_type == piece_type && template.side == side
            })
    }

    /// 将对局状态转换为 FEN 字符串
    pub fn to_string(state: &GameState) -> String {
        format!(
            "{} {}",
            Self::board_to_string(state),
            state.current_turn().to_fen_char()
        )
    }

    /// 将棋盘转换为 FEN 棋盘部分
    pub fn board_to_string(state: &GameState) -> String {
        let mut rows = Vec::with_capacity(BOARD_HEIGHT);

        for y in 0..BOARD_HEIGHT as i8 {
            let mut row = String::new();
            let mut empty_count = 0;

            for x in 0..BOARD_WIDTH as i8 {
                if let Some(piece) = state.piece_at(Position::new(x, y)) {
                    if empty_count > 0 {
                        row.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    row.push(piece.to_fen_char());
                } else {
                    empty_count += 1;
                }
            }

            if empty_count > 0 {
                row.push_str(&empty_count.to_string());
            }

            rows.push(row);
        }

        rows.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_initial_fen() {
        let state = Fen::parse(INITIAL_FEN).unwrap();
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_initial_to_string() {
        assert_eq!(Fen::to_string(&GameState::new()), INITIAL_FEN);
    }

    #[test]
    fn test_parse_custom_fen() {
        let state = Fen::parse("4k4/9/9/9/9/9/9/9/4R4/3K5 b").unwrap();

        assert_eq!(state.current_turn(), Side::Black);
        assert_eq!(state.general_pos(Side::Red), Position::new(3, 9));
        assert_eq!(state.general_pos(Side::Black), Position::new(4, 0));

        // 红车占用初始布局中第一个红车的槽位
        assert_eq!(state.find_piece(Position::new(4, 8)), PieceId::new(2));

        // 其余槽位被标记为已被吃，不出现在查找表中
        assert_eq!(state.pieces().iter().filter(|p| !p.captured).count(), 3);
        assert_eq!(state.active_ids(Side::Red).len(), 2);
        assert_eq!(state.active_ids(Side::Black).len(), 1);
        let unused = state.piece(PieceId::new(3).unwrap());
        assert!(unused.captured);
        assert_eq!(state.find_piece(unused.pos), None);
    }

    #[test]
    fn test_parse_sets_check_flags() {
        // 红车刚将军，轮到黑方
        let state = Fen::parse("4k4/9/9/9/9/4R4/9/9/9/3K5 b").unwrap();
        assert!(state.check());
        assert!(!state.checkmate());
        assert_eq!(state.checking(), Some(Side::Red));
    }

    #[test]
    fn test_side_aliases() {
        assert_eq!(
            Fen::parse("4k4/9/9/9/9/9/9/9/9/3K5 w").unwrap().current_turn(),
            Side::Red
        );
        assert!(Fen::parse("4k4/9/9/9/9/9/9/9/9/3K5 x").is_err());
    }

    #[test]
    fn test_invalid_fen() {
        // 空串
        assert!(Fen::parse("").is_err());

        // 行数不对
        assert!(Fen::parse("4k4/9/9").is_err());

        // 列数不对
        assert!(Fen::parse("4k44/9/9/9/9/9/9/9/9/4K4 r").is_err());
        assert!(Fen::parse("4k3/9/9/9/9/9/9/9/9/4K4 r").is_err());

        // 无效字符
        assert!(Fen::parse("4x4/9/9/9/9/9/9/9/9/4K4 r").is_err());

        // 缺少将
        assert!(Fen::parse("9/9/9/9/9/9/9/9/9/4K4 r").is_err());

        // 棋子数量超过初始布局
        assert!(Fen::parse("4k4/9/9/RRR6/9/9/9/9/9/4K4 r").is_err());
    }
}
