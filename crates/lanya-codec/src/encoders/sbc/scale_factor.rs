//! 比例因子计算与联合立体声判决.

use super::analysis::SubbandSamples;
use super::config::{ChannelMode, FrameParams, MAX_BLOCKS, MAX_CHANNELS, MAX_SUBBANDS};

/// 比例因子表: `[声道][子带]`, 取值 0..=15
pub type ScaleFactors = [[u8; MAX_SUBBANDS]; MAX_CHANNELS];

/// 一帧的比例因子与联合立体声标志
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FrameScale {
    pub(super) scale_factors: ScaleFactors,
    /// 按子带的和/差编码标志 (最后一个子带恒为 false)
    pub(super) join: [bool; MAX_SUBBANDS],
}

/// 由块内最大绝对值求比例因子
///
/// 返回满足 `max_abs <= 0x8000 << sf` 的最小 sf, 上限 15.
pub(super) fn scale_factor(max_abs: u32) -> u8 {
    let mut sf = if max_abs > 0x80_0000 { 9 } else { 0 };
    while sf < 15 && max_abs > (0x8000u32 << sf) {
        sf += 1;
    }
    sf
}

fn max_abs<'a>(values: impl Iterator<Item = &'a i32>) -> u32 {
    values.map(|v| v.unsigned_abs()).max().unwrap_or(0)
}

/// 计算整帧比例因子, 联合立体声时就地改写为和/差信号
pub(super) fn compute(params: &FrameParams, samples: &mut SubbandSamples) -> FrameScale {
    let blocks = params.blocks;
    let subbands = params.subbands;
    let mut scale = FrameScale {
        scale_factors: [[0; MAX_SUBBANDS]; MAX_CHANNELS],
        join: [false; MAX_SUBBANDS],
    };

    for ch in 0..params.channels() {
        for sb in 0..subbands {
            let peak = max_abs(samples[..blocks].iter().map(|block| &block[ch][sb]));
            scale.scale_factors[ch][sb] = scale_factor(peak);
        }
    }

    if params.channel_mode == ChannelMode::JointStereo {
        decide_joint(samples, blocks, subbands, &mut scale);
    }
    scale
}

/// 逐子带比较左右与和差两种表示的比例因子之和, 取较小者
fn decide_joint(
    samples: &mut SubbandSamples,
    blocks: usize,
    subbands: usize,
    scale: &mut FrameScale,
) {
    let mut sum = [0i32; MAX_BLOCKS];
    let mut diff = [0i32; MAX_BLOCKS];

    for sb in 0..subbands - 1 {
        for (blk, block) in samples[..blocks].iter().enumerate() {
            let (l, r) = (block[0][sb], block[1][sb]);
            sum[blk] = (l + r) >> 1;
            diff[blk] = (l - r) >> 1;
        }
        let sf_sum = scale_factor(max_abs(sum[..blocks].iter()));
        let sf_diff = scale_factor(max_abs(diff[..blocks].iter()));

        let [sf_left, sf_right] = [scale.scale_factors[0][sb], scale.scale_factors[1][sb]];
        if sf_left + sf_right > sf_sum + sf_diff {
            scale.join[sb] = true;
            scale.scale_factors[0][sb] = sf_sum;
            scale.scale_factors[1][sb] = sf_diff;
            for (blk, block) in samples[..blocks].iter_mut().enumerate() {
                block[0][sb] = sum[blk];
                block[1][sb] = diff[blk];
            }
        }
    }
}
