//! 多相分析滤波器组.
//!
//! 每个块读入 n 个新采样 (n 为子带数), 与最近 10n 个历史采样组成窗口,
//! 加窗累加得到 2n 个中间值后做余弦调制, 输出 n 个子带采样.
//!
//! 历史缓冲区比窗口长得多: 新采样逐块写到窗口的更低地址处, 只有写指针到达
//! 缓冲区底部时才把最近 9n 个采样整体搬回顶部, 避免每块都移动整个窗口.

use super::config::{MAX_BLOCKS, MAX_CHANNELS, MAX_SUBBANDS};
use super::dct::{idct4, idct8};
use super::tables::{WINDOW_4, WINDOW_8};

/// 子带采样缓冲: `[块][声道][子带]`
pub(super) type SubbandSamples = [[[i32; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS];

/// 历史缓冲区总长度 (所有声道合计)
const HISTORY_LEN: usize = 1024;

/// 分析滤波器状态
pub(super) struct AnalysisFilter {
    /// 各声道历史采样, 声道 c 占 `[c * stride, (c + 1) * stride)`
    history: Vec<i16>,
    /// 子带数
    subbands: usize,
    /// 声道数
    channels: usize,
    /// 每声道历史区长度
    stride: usize,
    /// 写指针相对顶部的偏移
    shift: usize,
    /// 写指针偏移上限 (子带数的整数倍)
    max_shift: usize,
}

impl AnalysisFilter {
    pub(super) fn new(subbands: usize, channels: usize) -> Self {
        let window_len = 10 * subbands;
        let max_shift = (HISTORY_LEN - window_len * channels) / (subbands * channels) * subbands;
        let stride = max_shift + window_len;
        Self {
            history: vec![0; stride * channels],
            subbands,
            channels,
            stride,
            shift: 0,
            max_shift,
        }
    }

    pub(super) fn max_shift(&self) -> usize {
        self.max_shift
    }

    /// 清空历史 (开始新的码流)
    pub(super) fn reset(&mut self) {
        self.history.fill(0);
        self.shift = 0;
    }

    /// 对一帧交错 PCM 做子带分析
    ///
    /// `pcm` 至少包含 `blocks * subbands * channels` 个采样.
    pub(super) fn analyze(&mut self, pcm: &[i16], blocks: usize, out: &mut SubbandSamples) {
        let sb = self.subbands;
        let block_len = sb * self.channels;

        for (blk, block_pcm) in pcm.chunks_exact(block_len).take(blocks).enumerate() {
            let offset = self.max_shift - self.shift;
            for ch in 0..self.channels {
                let base = ch * self.stride + offset;
                // 最新的采样放在窗口最低地址
                for i in 0..sb {
                    self.history[base + sb - 1 - i] = block_pcm[i * self.channels + ch];
                }

                let window = &self.history[base..base + 10 * sb];
                let dst = &mut out[blk][ch];
                if sb == 4 {
                    dst[..4].copy_from_slice(&idct4(&window_sum::<8>(&WINDOW_4, window)));
                } else {
                    dst[..8].copy_from_slice(&idct8(&window_sum::<16>(&WINDOW_8, window)));
                }
            }
            self.advance();
        }
    }

    /// 移动写指针, 到达底部时把最近 9n 个采样搬回顶部
    fn advance(&mut self) {
        if self.shift >= self.max_shift {
            let keep = 9 * self.subbands;
            let dst = self.max_shift + self.subbands;
            for ch in 0..self.channels {
                let start = ch * self.stride;
                self.history.copy_within(start..start + keep, start + dst);
            }
            self.shift = 0;
        } else {
            self.shift += self.subbands;
        }
    }
}

/// 加窗累加: `Y[i] = sum_j C[i + M*j] * X[i + M*j] >> 16`, M = 2n, j = 0..5
#[inline]
fn window_sum<const M: usize>(coeffs: &[i32], x: &[i16]) -> [i32; M] {
    let mut y = [0i32; M];
    for (i, yi) in y.iter_mut().enumerate() {
        let acc: i64 = (0..5)
            .map(|j| i64::from(coeffs[i + M * j]) * i64::from(x[i + M * j]))
            .sum();
        *yi = (acc >> 16) as i32;
    }
    y
}
