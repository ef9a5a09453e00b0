//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_HEIGHT, BOARD_WIDTH, PIECE_COUNT, RIVER_BLACK_EDGE, RIVER_RED_EDGE};

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    /// 将/帅
    General,
    /// 士/仕
    Advisor,
    /// 象/相
    Elephant,
    /// 马/傌
    Horse,
    /// 车/俥
    Chariot,
    /// 炮/砲
    Cannon,
    /// 兵/卒
    Soldier,
}

impl PieceType {
    /// 获取 FEN 字符（红方大写，黑方小写）
    pub fn to_fen_char(&self, side: Side) -> char {
        let c = match self {
            PieceType::General => 'k',
            PieceType::Advisor => 'a',
            PieceType::Elephant => 'b',
            PieceType::Horse => 'n',
            PieceType::Chariot => 'r',
            PieceType::Cannon => 'c',
            PieceType::Soldier => 'p',
        };
        match side {
            Side::Red => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceType, Side)> {
        let side = if c.is_ascii_uppercase() {
            Side::Red
        } else {
            Side::Black
        };
        let piece_type = match c.to_ascii_lowercase() {
            'k' => PieceType::General,
            'a' => PieceType::Advisor,
            'b' | 'e' => PieceType::Elephant,
            'n' | 'h' => PieceType::Horse,
            'r' => PieceType::Chariot,
            'c' => PieceType::Cannon,
            'p' => PieceType::Soldier,
            _ => return None,
        };
        Some((piece_type, side))
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// 红方（先手，在下方，第 7-9 行为九宫）
    Red,
    /// 黑方（后手，在上方，第 0-2 行为九宫）
    Black,
}

impl Side {
    /// 获取对方阵营
    pub fn opponent(&self) -> Side {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }

    /// 兵/卒前进方向（行增量）
    pub fn forward(&self) -> i8 {
        match self {
            Side::Red => -1,
            Side::Black => 1,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Side::Red => 'r',
            Side::Black => 'b',
        }
    }

    /// 从 FEN 字符解析（`w` 视为红方）
    pub fn from_fen_char(c: char) -> Option<Side> {
        match c {
            'r' | 'R' | 'w' | 'W' => Some(Side::Red),
            'b' | 'B' => Some(Side::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Red => write!(f, "红方"),
            Side::Black => write!(f, "黑方"),
        }
    }
}

/// 棋盘位置
///
/// 坐标允许越界，伪合法走法在过滤阶段才检查边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 列 (0-8)
    pub x: i8,
    /// 行 (0-9)，第 0 行为黑方底线
    pub y: i8,
}

impl Position {
    /// 创建新位置（不检查边界）
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// 创建新位置，越界返回 None
    pub fn checked(x: i8, y: i8) -> Option<Self> {
        let pos = Self { x, y };
        pos.is_valid().then_some(pos)
    }

    /// 检查位置是否在棋盘内
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && (self.x as usize) < BOARD_WIDTH && self.y >= 0 && (self.y as usize) < BOARD_HEIGHT
    }

    /// 检查位置是否在指定阵营的半边（未过河）
    pub fn is_own_half(&self, side: Side) -> bool {
        match side {
            Side::Red => self.y >= RIVER_RED_EDGE,
            Side::Black => self.y <= RIVER_BLACK_EDGE,
        }
    }

    /// 检查位置是否在九宫格内
    pub fn is_in_palace(&self, side: Side) -> bool {
        let in_x = (3..=5).contains(&self.x);
        let in_y = match side {
            Side::Red => (7..=9).contains(&self.y),
            Side::Black => (0..=2).contains(&self.y),
        };
        in_x && in_y
    }

    /// 获取偏移后的位置（不检查边界）
    ///
    /// 坐标按饱和加法计算，远离棋盘的位置偏移后仍在棋盘外。
    pub fn offset(&self, dx: i8, dy: i8) -> Position {
        Position {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 棋子在固定槽位中的编号
///
/// 槽位在整局中不增不减，编号可长期持有（选中棋子、上一步走子等）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceId(u8);

impl PieceId {
    /// 红帅所在槽位
    pub const RED_GENERAL: PieceId = PieceId(0);
    /// 黑将所在槽位
    pub const BLACK_GENERAL: PieceId = PieceId(1);

    /// 从槽位下标创建
    pub fn new(index: usize) -> Option<Self> {
        (index < PIECE_COUNT).then_some(PieceId(index as u8))
    }

    /// 槽位下标
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// 指定阵营的将/帅槽位
    pub fn general(side: Side) -> PieceId {
        match side {
            Side::Red => Self::RED_GENERAL,
            Side::Black => Self::BLACK_GENERAL,
        }
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub pos: Position,
    pub piece_type: PieceType,
    pub side: Side,
    /// 被吃的棋子保留在槽位中，只做标记
    pub captured: bool,
}

impl Piece {
    /// 创建新棋子
    pub const fn new(pos: Position, piece_type: PieceType, side: Side) -> Self {
        Self {
            pos,
            piece_type,
            side,
            captured: false,
        }
    }

    /// 获取棋子显示的汉字
    pub fn display_char(&self) -> char {
        match (self.piece_type, self.side) {
            (PieceType::General, Side::Red) => '帥',
            (PieceType::General, Side::Black) => '將',
            (PieceType::Advisor, Side::Red) => '仕',
            (PieceType::Advisor, Side::Black) => '士',
            (PieceType::Elephant, Side::Red) => '相',
            (PieceType::Elephant, Side::Black) => '象',
            (PieceType::Horse, Side::Red) => '傌',
            (PieceType::Horse, Side::Black) => '馬',
            (PieceType::Chariot, Side::Red) => '俥',
            (PieceType::Chariot, Side::Black) => '車',
            (PieceType::Cannon, Side::Red) => '炮',
            (PieceType::Cannon, Side::Black) => '砲',
            (PieceType::Soldier, Side::Red) => '兵',
            (PieceType::Soldier, Side::Black) => '卒',
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.piece_type.to_fen_char(self.side)
    }

    /// 是否为指定阵营的将/帅
    pub fn is_general_of(&self, side: Side) -> bool {
        self.piece_type == PieceType::General && self.side == side
    }
}
