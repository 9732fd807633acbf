use serde::{Deserialize, Serialize};

/// k-mer 表示：2-bit/碱基打包，可选经过哈希
pub type Representation = u64;
/// read 编号
pub type ReadId = u32;
/// k-mer 在 read 中的起始位置
pub type PositionInRead = u32;

/// 产生规范表示的链方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    ReverseComplement,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// 草图元素：一个窗口选出的 minimizer 观测
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SketchElement {
    pub representation: Representation,
    pub read_id: ReadId,
    pub position_in_read: PositionInRead,
    pub direction: Direction,
}

impl SketchElement {
    pub fn new(
        representation: Representation,
        read_id: ReadId,
        position_in_read: PositionInRead,
        direction: Direction,
    ) -> Self {
        Self { representation, read_id, position_in_read, direction }
    }
}
