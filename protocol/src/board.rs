//! 棋盘状态
//!
//! 32 个棋子存放在固定槽位中（被吃的棋子只做标记，不移除），
//! 另有 9x10 的位置查找表指向占据该位置的槽位。

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::constants::{BOARD_HEIGHT, BOARD_WIDTH, PIECE_COUNT};
use crate::error::ChessError;
use crate::moves::MoveGenerator;
use crate::piece::{Piece, PieceId, PieceType, Position, Side};

const fn red(x: i8, y: i8, piece_type: PieceType) -> Piece {
    Piece::new(Position::new(x, y), piece_type, Side::Red)
}

const fn black(x: i8, y: i8, piece_type: PieceType) -> Piece {
    Piece::new(Position::new(x, y), piece_type, Side::Black)
}

/// 初始布局，槽位 0 和 1 固定为红帅、黑将
pub const DEFAULT_SETUP: [Piece; PIECE_COUNT] = [
    red(4, 9, PieceType::General),
    black(4, 0, PieceType::General),
    red(0, 9, PieceType::Chariot),
    red(8, 9, PieceType::Chariot),
    red(1, 7, PieceType::Cannon),
    red(7, 7, PieceType::Cannon),
    red(1, 9, PieceType::Horse),
    red(7, 9, PieceType::Horse),
    red(2, 9, PieceType::Elephant),
    red(6, 9, PieceType::Elephant),
    red(3, 9, PieceType::Advisor),
    red(5, 9, PieceType::Advisor),
    red(0, 6, PieceType::Soldier),
    red(2, 6, PieceType::Soldier),
    red(4, 6, PieceType::Soldier),
    red(6, 6, PieceType::Soldier),
    red(8, 6, PieceType::Soldier),
    black(0, 0, PieceType::Chariot),
    black(8, 0, PieceType::Chariot),
    black(1, 2, PieceType::Cannon),
    black(7, 2, PieceType::Cannon),
    black(1, 0, PieceType::Horse),
    black(7, 0, PieceType::Horse),
    black(2, 0, PieceType::Elephant),
    black(6, 0, PieceType::Elephant),
    black(3, 0, PieceType::Advisor),
    black(5, 0, PieceType::Advisor),
    black(0, 3, PieceType::Soldier),
    black(2, 3, PieceType::Soldier),
    black(4, 3, PieceType::Soldier),
    black(6, 3, PieceType::Soldier),
    black(8, 3, PieceType::Soldier),
];

type Grid = [[Option<PieceId>; BOARD_HEIGHT]; BOARD_WIDTH];

/// 棋子槽位与查找表的快照，用于模拟走法后还原
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    pieces: [Piece; PIECE_COUNT],
    grid: Grid,
}

/// 完整的对局状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// 固定槽位，初始化后不增不减、不重排
    pieces: [Piece; PIECE_COUNT],
    /// 查找表，索引为 [x][y]
    grid: Grid,
    /// 当前走子方
    current_turn: Side,
    /// 是否将军
    check: bool,
    /// 是否将死（只在将军时为真）
    checkmate: bool,
    /// 正在将军的一方
    checking: Option<Side>,
}

impl GameState {
    /// 创建初始状态
    pub fn new() -> Self {
        Self::from_pieces(DEFAULT_SETUP, Side::Red)
    }

    /// 从槽位数组创建状态，并以走子方的对方为上一手计算将军状态
    pub(crate) fn from_pieces(pieces: [Piece; PIECE_COUNT], current_turn: Side) -> Self {
        let mut state = Self {
            pieces,
            grid: [[None; BOARD_HEIGHT]; BOARD_WIDTH],
            current_turn,
            check: false,
            checkmate: false,
            checking: None,
        };
        state.rebuild_grid();
        state.refresh_status(current_turn.opponent());
        state
    }

    fn rebuild_grid(&mut self) {
        self.grid = [[None; BOARD_HEIGHT]; BOARD_WIDTH];
        for (index, piece) in self.pieces.iter().enumerate() {
            if piece.captured || !piece.pos.is_valid() {
                continue;
            }
            self.grid[piece.pos.x as usize][piece.pos.y as usize] = PieceId::new(index);
        }
    }

    /// 重新开局
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 获取指定位置的棋子槽位，越界或空位返回 None
    pub fn find_piece(&self, pos: Position) -> Option<PieceId> {
        if !pos.is_valid() {
            return None;
        }
        self.grid[pos.x as usize][pos.y as usize]
    }

    /// 获取指定位置的棋子槽位，区分越界和空位
    pub fn require_piece(&self, pos: Position) -> Result<PieceId, ChessError> {
        if !pos.is_valid() {
            return Err(ChessError::InvalidPosition { x: pos.x, y: pos.y });
        }
        self.find_piece(pos)
            .ok_or(ChessError::NoPiece { x: pos.x, y: pos.y })
    }

    /// 获取指定位置的棋子
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.find_piece(pos).map(|id| self.piece(id))
    }

    /// 获取槽位中的棋子
    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.pieces[id.index()]
    }

    /// 所有槽位（包括被吃的棋子）
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// 指定阵营未被吃的棋子槽位
    pub fn active_ids(&self, side: Side) -> Vec<PieceId> {
        self.pieces
            .iter()
            .enumerate()
            .filter(|(_, piece)| !piece.captured && piece.side == side)
            .filter_map(|(index, _)| PieceId::new(index))
            .collect()
    }

    /// 指定阵营将/帅的位置
    pub fn general_pos(&self, side: Side) -> Position {
        self.piece(PieceId::general(side)).pos
    }

    pub fn current_turn(&self) -> Side {
        self.current_turn
    }

    pub fn check(&self) -> bool {
        self.check
    }

    pub fn checkmate(&self) -> bool {
        self.checkmate
    }

    pub fn checking(&self) -> Option<Side> {
        self.checking
    }

    /// 两将是否在同一列且中间没有将/帅以外的棋子（飞将）
    pub fn generals_facing(&self) -> bool {
        let red_pos = self.general_pos(Side::Red);
        let black_pos = self.general_pos(Side::Black);
        if red_pos.x != black_pos.x {
            return false;
        }

        let (min_y, max_y) = if red_pos.y < black_pos.y {
            (red_pos.y, black_pos.y)
        } else {
            (black_pos.y, red_pos.y)
        };
        (min_y..=max_y).all(|y| match self.piece_at(Position::new(red_pos.x, y)) {
            Some(piece) => piece.piece_type == PieceType::General,
            None => true,
        })
    }

    /// 临时走一步，返回的守卫在离开作用域时还原槽位和查找表
    ///
    /// 不改变走子方和将军状态。
    pub fn simulate(&mut self, id: PieceId, to: Position) -> Simulation<'_> {
        let saved = Snapshot {
            pieces: self.pieces,
            grid: self.grid,
        };
        self.move_piece(id, to);
        Simulation { state: self, saved }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pieces = snapshot.pieces;
        self.grid = snapshot.grid;
    }

    /// 移动棋子并处理吃子（不检查规则，不切换走子方）
    fn move_piece(&mut self, id: PieceId, to: Position) {
        if let Some(other) = self.find_piece(to) {
            self.pieces[other.index()].captured = true;
        }
        let from = self.pieces[id.index()].pos;
        if from.is_valid() {
            self.grid[from.x as usize][from.y as usize] = None;
        }
        if to.is_valid() {
            self.grid[to.x as usize][to.y as usize] = Some(id);
        }
        self.pieces[id.index()].pos = to;
    }

    /// 走棋并重新计算将军/将死，然后切换走子方
    ///
    /// 不检查走子方和目标是否合法，调用方只能提交
    /// [`MoveGenerator::legal_moves`] 给出的目标。
    pub fn perform_move(&mut self, id: PieceId, to: Position) {
        let piece = *self.piece(id);
        debug!(
            "{} {} {} -> {}",
            piece.side,
            piece.display_char(),
            piece.pos,
            to
        );
        self.move_piece(id, to);
        self.refresh_status(piece.side);
        self.switch_turn();
    }

    /// 以 `mover` 为刚走完的一方，重新计算将军和将死
    fn refresh_status(&mut self, mover: Side) {
        let target = self.general_pos(mover.opponent());
        let check = self
            .active_ids(mover)
            .into_iter()
            .any(|id| MoveGenerator::filtered_moves(self, id, false).contains(&target));
        self.check = check;

        if check {
            self.checking = Some(mover);
            let checkmate = self
                .active_ids(mover.opponent())
                .into_iter()
                .all(|id| MoveGenerator::legal_moves(self, id).is_empty());
            self.checkmate = checkmate;
            if self.checkmate {
                debug!("{} 被将死", mover.opponent());
            } else {
                debug!("{} 将军", mover);
            }
        } else {
            self.checking = None;
            self.checkmate = false;
        }
    }

    /// 切换走子方
    fn switch_turn(&mut self) {
        self.current_turn = self.current_turn.opponent();
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// 临时走法守卫
///
/// 可通过解引用把模拟后的局面当作 [`GameState`] 使用，
/// 无论以何种方式离开作用域都会还原。
pub struct Simulation<'a> {
    state: &'a mut GameState,
    saved: Snapshot,
}

impl Deref for Simulation<'_> {
    type Target = GameState;

    fn deref(&self) -> &GameState {
        &*self.state
    }
}

impl DerefMut for Simulation<'_> {
    fn deref_mut(&mut self) -> &mut GameState {
        &mut *self.state
    }
}

impl Drop for Simulation<'_> {
    fn drop(&mut self) {
        self.state.restore(self.saved);
    }
}
