//! SBC 常量表.
//!
//! 窗口系数是 A2DP 原型滤波器乘以 2^31 的定点值, 按历史缓冲区的排列顺序展开:
//! 第 `i + 2n*j` 项与历史样本 `X[offset + i + 2n*j]` 相乘 (n 为子带数, j = 0..5).
//! 原型滤波器关于中点对称; 位于对称轴上的 `2n*j` 与 `n + 2n*j` 两组系数单独给出,
//! 其中 `2n*j` 组在后半段取反.

/// 4 子带窗口系数 (40 项)
#[rustfmt::skip]
pub(super) const WINDOW_4: [i32; 40] = [
    0, 1152230, 3203795, 5870595, 8240328,
    8358116, 4006811, -6571563, 23437125, 43891363,
    62010177, 69135936, 55569964, 13169340, -61894188,
    -166744265, 291184338, 418733200, 529648198, 605221457,
    632037362, 605221457, 529648198, 418733200, -291184338,
    -166744265, -61894188, 13169340, 55569964, 69135936,
    62010177, 43891363, -23437125, -6571563, 4006811,
    8358116, 8240328, 5870595, 3203795, 1152230,
];

/// 8 子带窗口系数 (80 项)
#[rustfmt::skip]
pub(super) const WINDOW_8: [i32; 80] = [
    0, 336243, 737137, 1191037, 1769353,
    2447970, 3170548, 3830503, 4320362, 4517704,
    4283253, 3471542, 1937362, -383981, -3542770,
    -7510125, 12153672, 17243030, 22459338, 27374475,
    31466060, 34154783, 34834003, 32896036, 27782383,
    19021498, 6279423, -10556557, -31440035, -56070530,
    -83913220, -114218863, 146026618, 178208410, 209541558,
    238793071, 264708601, 286183152, 302265850, 312222319,
    315583605, 312222319, 302265850, 286183152, 264708601,
    238793071, 209541558, 178208410, -146026618, -114218863,
    -83913220, -56070530, -31440035, -10556557, 6279423,
    19021498, 27782383, 32896036, 34834003, 34154783,
    31466060, 27374475, 22459338, 17243030, -12153672,
    -7510125, -3542770, -383981, 1937362, 3471542,
    4283253, 4517704, 4320362, 3830503, 3170548,
    2447970, 1769353, 1191037, 737137, 336243,
];

/// 4 子带响度偏移表, 按采样率帧头编码索引 (16k/32k/44.1k/48k)
pub(super) const LOUDNESS_OFFSET_4: [[i32; 4]; 4] = [
    [-1, 0, 0, 0],
    [-2, 0, 0, 1],
    [-2, 0, 0, 1],
    [-2, 0, 0, 1],
];

/// 8 子带响度偏移表, 按采样率帧头编码索引 (16k/32k/44.1k/48k)
pub(super) const LOUDNESS_OFFSET_8: [[i32; 8]; 4] = [
    [-2, 0, 0, 0, 0, 0, 0, 1],
    [-3, 0, 0, 0, 0, 0, 1, 2],
    [-4, 0, 0, 0, 0, 0, 1, 2],
    [-4, 0, 0, 0, 0, 0, 1, 2],
];

// ============================================================
// IDCT 常量 (Q16)
// ============================================================

/// cos(pi/4)
pub(super) const COS_PI_4: i32 = 46341;
/// cos(pi/8)
pub(super) const COS_PI_8: i32 = 60547;
/// cos(3pi/8)
pub(super) const COS_3PI_8: i32 = 25080;
/// 1 / (2 cos((2k+1) pi / 16)), k = 0..4
pub(super) const ODD_TWIDDLE: [i32; 4] = [33410, 39410, 58981, 167963];
