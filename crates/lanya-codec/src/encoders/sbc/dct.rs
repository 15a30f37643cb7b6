//! 分析滤波器的余弦调制 (定点快速 IDCT).
//!
//! 输入为窗口累加得到的 2n 个中间值 `Y[i]`, 输出 n 个子带采样:
//!
//! ```text
//! S[k] = 1/2 * sum_{i=0}^{2n-1} cos((k + 1/2)(i - n/2) pi / n) * Y[i]
//! ```
//!
//! 先利用余弦的对称性把 2n 个输入折叠为 n 个, 再用 4 点核心蝶形完成变换.
//! 常量为 Q16 定点, 每次乘法算术右移 (向负无穷截断).
//!
//! 这是独立的分解方式, 不是 Feig-Winograd 乘加树: 输出与上式的浮点值只在
//! 少量最低位上接近, 与其他编码器的滤波器输出不保证逐位相同.

use super::tables::{COS_3PI_8, COS_PI_4, COS_PI_8, ODD_TWIDDLE};

/// Q16 定点乘法
#[inline]
pub(super) fn mul_q16(a: i32, b: i32) -> i32 {
    ((i64::from(a) * i64::from(b)) >> 16) as i32
}

/// 4 点 DCT-III 核心: `out[k] = sum_i cos((2k+1) i pi / 8) * p[i]` (p[0] 权重为 1)
#[inline]
fn core4(p: [i32; 4]) -> [i32; 4] {
    let t = mul_q16(COS_PI_4, p[2]);
    let e0 = p[0] + t;
    let e1 = p[0] - t;

    let d = p[1] - p[3];
    let m = mul_q16(COS_PI_4, p[3] << 1);
    let q0 = mul_q16(COS_PI_8, d + m);
    let q1 = mul_q16(COS_3PI_8, d - m);

    [e0 + q0, e1 + q1, e1 - q1, e0 - q0]
}

/// 4 子带变换: 8 个中间值 -> 4 个子带采样
pub(super) fn idct4(y: &[i32; 8]) -> [i32; 4] {
    core4([y[2] >> 1, (y[1] + y[3]) >> 1, (y[0] + y[4]) >> 1, (y[5] - y[7]) >> 1])
}

/// 8 子带变换: 16 个中间值 -> 8 个子带采样
pub(super) fn idct8(y: &[i32; 16]) -> [i32; 8] {
    let x = [
        y[4] >> 1,
        (y[3] + y[5]) >> 1,
        (y[2] + y[6]) >> 1,
        (y[1] + y[7]) >> 1,
        (y[0] + y[8]) >> 1,
        (y[9] - y[15]) >> 1,
        (y[10] - y[14]) >> 1,
        (y[11] - y[13]) >> 1,
    ];

    // 偶数项直接是 4 点变换; 奇数项先做前缀和, 变换后乘以 1/(2cos)
    let even = core4([x[0], x[2], x[4], x[6]]);
    let odd = core4([x[1], x[1] + x[3], x[3] + x[5], x[5] + x[7]]);

    let mut out = [0i32; 8];
    for k in 0..4 {
        let o = mul_q16(ODD_TWIDDLE[k], odd[k]);
        out[k] = even[k] + o;
        out[7 - k] = even[k] - o;
    }
    out
}
