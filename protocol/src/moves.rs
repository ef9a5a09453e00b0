//! 走法生成和验证

use serde::{Deserialize, Serialize};

use crate::board::GameState;
use crate::piece::{PieceId, PieceType, Position, Side};

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 横竖四个方向
const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// 斜向四个方向
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// 士/仕的四个斜向，按右上、右下、左上、左下的顺序生成
const ADVISOR_STEPS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// 马腿及对应的两个落点
const HORSE_JUMPS: [((i8, i8), [(i8, i8); 2]); 4] = [
    ((1, 0), [(2, 1), (2, -1)]),
    ((-1, 0), [(-2, 1), (-2, -1)]),
    ((0, 1), [(1, 2), (-1, 2)]),
    ((0, -1), [(1, -2), (-1, -2)]),
];

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定棋子的伪合法目标
    ///
    /// 只按棋子的几何规则生成，不检查边界、己方棋子、飞将和自身安全。
    pub fn pseudo_legal(state: &GameState, id: PieceId) -> Vec<Position> {
        let piece = *state.piece(id);
        let mut moves = Vec::with_capacity(17);

        match piece.piece_type {
            PieceType::General => Self::generate_general_moves(piece.pos, piece.side, &mut moves),
            PieceType::Advisor => Self::generate_advisor_moves(piece.pos, piece.side, &mut moves),
            PieceType::Elephant => {
                Self::generate_elephant_moves(state, piece.pos, piece.side, &mut moves)
            }
            PieceType::Horse => Self::generate_horse_moves(state, piece.pos, &mut moves),
            PieceType::Chariot => Self::generate_chariot_moves(state, piece.pos, &mut moves),
            PieceType::Cannon => Self::generate_cannon_moves(state, piece.pos, &mut moves),
            PieceType::Soldier => Self::generate_soldier_moves(piece.pos, piece.side, &mut moves),
        }

        moves
    }

    /// 生成指定棋子的合法目标（包含自身安全检查）
    pub fn legal_moves(state: &mut GameState, id: PieceId) -> Vec<Position> {
        Self::filtered_moves(state, id, true)
    }

    /// 生成指定棋子经过过滤的目标
    ///
    /// `danger_check` 为 false 时不检查走后己方将/帅是否会被吃，
    /// 用于判断对方棋子能否攻击到某个位置。
    pub fn filtered_moves(state: &mut GameState, id: PieceId, danger_check: bool) -> Vec<Position> {
        Self::pseudo_legal(state, id)
            .into_iter()
            .filter(|&to| Self::is_allowed(state, id, to, danger_check))
            .collect()
    }

    /// 检查一个伪合法目标能否通过过滤
    pub fn is_allowed(state: &mut GameState, id: PieceId, to: Position, danger_check: bool) -> bool {
        // 越界
        if !to.is_valid() {
            return false;
        }

        // 吃己方棋子
        let side = state.piece(id).side;
        let target = state.piece_at(to).copied();
        if target.is_some_and(|t| t.side == side) {
            return false;
        }

        // 飞将
        if Self::causes_flying_general(state, id, to) {
            return false;
        }

        // 走后己方将/帅会被吃，除非这一步直接吃掉对方将/帅
        if danger_check && Self::endangers_own_general(state, id, to) {
            return target.is_some_and(|t| t.is_general_of(side.opponent()));
        }

        true
    }

    /// 走这一步后两将是否照面
    ///
    /// 任何棋子离开或被吃都可能打开原本被挡住的列，所以对所有走法都要检查。
    pub fn causes_flying_general(state: &mut GameState, id: PieceId, to: Position) -> bool {
        let sim = state.simulate(id, to);
        sim.generals_facing()
    }

    /// 走这一步后己方将/帅能否被对方任意棋子吃掉
    pub fn endangers_own_general(state: &mut GameState, id: PieceId, to: Position) -> bool {
        let side = state.piece(id).side;
        let mut sim = state.simulate(id, to);
        let general = sim.general_pos(side);

        sim.active_ids(side.opponent())
            .into_iter()
            .any(|enemy| Self::filtered_moves(&mut sim, enemy, false).contains(&general))
    }

    /// 某阵营是否还有任何合法走法
    pub fn has_any_legal_move(state: &mut GameState, side: Side) -> bool {
        state
            .active_ids(side)
            .into_iter()
            .any(|id| !Self::legal_moves(state, id).is_empty())
    }

    /// 生成将/帅的走法：九宫内横竖一步
    ///
    /// 先横走（右、左），再前进，最后后退。
    fn generate_general_moves(pos: Position, side: Side, moves: &mut Vec<Position>) {
        let forward = side.forward();
        for (dx, dy) in [(1, 0), (-1, 0), (0, forward), (0, -forward)] {
            let to = pos.offset(dx, dy);
            if to.is_in_palace(side) {
                moves.push(to);
            }
        }
    }

    /// 生成士/仕的走法：九宫内斜走一步
    fn generate_advisor_moves(pos: Position, side: Side, moves: &mut Vec<Position>) {
        for (dx, dy) in ADVISOR_STEPS {
            let to = pos.offset(dx, dy);
            if to.is_in_palace(side) {
                moves.push(to);
            }
        }
    }

    /// 生成象/相的走法：田字，塞象眼，不过河
    fn generate_elephant_moves(
        state: &GameState,
        pos: Position,
        side: Side,
        moves: &mut Vec<Position>,
    ) {
        for (dx, dy) in DIAGONAL {
            if state.find_piece(pos.offset(dx, dy)).is_some() {
                continue;
            }
            let to = pos.offset(dx * 2, dy * 2);
            if to.is_own_half(side) {
                moves.push(to);
            }
        }
    }

    /// 生成马/傌的走法：日字，蹩马腿
    fn generate_horse_moves(state: &GameState, pos: Position, moves: &mut Vec<Position>) {
        for ((lx, ly), landings) in HORSE_JUMPS {
            if state.find_piece(pos.offset(lx, ly)).is_some() {
                continue;
            }
            for (dx, dy) in landings {
                moves.push(pos.offset(dx, dy));
            }
        }
    }

    /// 生成车/俥的走法：直线滑行，遇子为止（含该子）
    fn generate_chariot_moves(state: &GameState, pos: Position, moves: &mut Vec<Position>) {
        for (dx, dy) in ORTHOGONAL {
            let mut to = pos.offset(dx, dy);
            while to.is_valid() {
                moves.push(to);
                if state.find_piece(to).is_some() {
                    break;
                }
                to = to.offset(dx, dy);
            }
        }
    }

    /// 生成炮/砲的走法：空位直线滑行，隔一子（炮架）吃子
    fn generate_cannon_moves(state: &GameState, pos: Position, moves: &mut Vec<Position>) {
        for (dx, dy) in ORTHOGONAL {
            let mut to = pos.offset(dx, dy);
            while to.is_valid() && state.find_piece(to).is_none() {
                moves.push(to);
                to = to.offset(dx, dy);
            }

            // to 为炮架，继续找下一个棋子
            to = to.offset(dx, dy);
            while to.is_valid() {
                if state.find_piece(to).is_some() {
                    moves.push(to);
                    break;
                }
                to = to.offset(dx, dy);
            }
        }
    }

    /// 生成兵/卒的走法：前进一步，过河后可左右
    fn generate_soldier_moves(pos: Position, side: Side, moves: &mut Vec<Position>) {
        moves.push(pos.offset(0, side.forward()));

        if !pos.is_own_half(side) {
            moves.push(pos.offset(-1, 0));
            moves.push(pos.offset(1, 0));
        }
    }
}
