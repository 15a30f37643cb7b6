//! 比特分配.
//!
//! 先由比例因子求每个子带的比特需求, 再从最高需求开始逐层下移 "切片",
//! 直到再下移一层就会超出比特池; 切片以上的需求差即各子带的基础比特数,
//! 剩余比特按子带顺序补给.
//!
//! 单声道/双声道每个声道独立使用完整比特池; 立体声/联合立体声把两个声道按
//! `(声道 0, 子带 0), (声道 1, 子带 0), (声道 0, 子带 1), ...` 交错成一个序列,
//! 共享一个比特池.
//!
//! 解码端用同样的规则由比例因子和比特池重算分配表, 因此比例因子为 0 的子带
//! 也照常参与分配 (响度模式下需求为 -5, SNR 模式下为 0). 比特池不超过格式上限时,
//! 分配总量恰好等于比特池.

use super::config::{AllocationMethod, FrameParams, MAX_CHANNELS, MAX_SUBBANDS};
use super::scale_factor::ScaleFactors;
use super::tables::{LOUDNESS_OFFSET_4, LOUDNESS_OFFSET_8};

/// 比特分配结果: `[声道][子带]`, 取值 0..=16
pub type BitAllocation = [[u8; MAX_SUBBANDS]; MAX_CHANNELS];

/// 单个样本最多使用的比特数
const MAX_BITS: u8 = 16;

/// 响度模式下比例因子为 0 的子带需求
const SILENT_LOUDNESS_NEED: i32 = -5;

/// 计算整帧的比特分配
pub fn allocate(params: &FrameParams, scale_factors: &ScaleFactors) -> BitAllocation {
    let subbands = params.subbands;
    let bitpool = i32::from(params.bitpool);
    let mut bits = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];

    if params.channel_mode.shares_bitpool() {
        let mut need = [0i32; 2 * MAX_SUBBANDS];
        for sb in 0..subbands {
            for ch in 0..2 {
                need[2 * sb + ch] = bit_need(params, scale_factors[ch][sb], sb);
            }
        }
        let mut seq = [0u8; 2 * MAX_SUBBANDS];
        allocate_sequence(&need[..2 * subbands], bitpool, &mut seq[..2 * subbands]);
        for sb in 0..subbands {
            bits[0][sb] = seq[2 * sb];
            bits[1][sb] = seq[2 * sb + 1];
        }
    } else {
        for (ch, channel_bits) in bits.iter_mut().enumerate().take(params.channels()) {
            let mut need = [0i32; MAX_SUBBANDS];
            for (sb, n) in need.iter_mut().enumerate().take(subbands) {
                *n = bit_need(params, scale_factors[ch][sb], sb);
            }
            allocate_sequence(&need[..subbands], bitpool, &mut channel_bits[..subbands]);
        }
    }
    bits
}

/// 子带的比特需求
fn bit_need(params: &FrameParams, scale_factor: u8, sb: usize) -> i32 {
    let sf = i32::from(scale_factor);
    match params.allocation {
        AllocationMethod::Snr => sf,
        AllocationMethod::Loudness if scale_factor == 0 => SILENT_LOUDNESS_NEED,
        AllocationMethod::Loudness => {
            let freq = usize::from(params.frequency.header_code());
            let offset = if params.subbands == 4 {
                LOUDNESS_OFFSET_4[freq][sb]
            } else {
                LOUDNESS_OFFSET_8[freq][sb]
            };
            let loudness = sf - offset;
            if loudness > 0 { loudness >> 1 } else { loudness }
        }
    }
}

/// 切片 `slice` 下移一层新增的比特数
fn slice_cost(need: &[i32], slice: i32) -> i32 {
    need.iter()
        .map(|&n| {
            if n == slice + 1 {
                2
            } else if n > slice + 1 && n < slice + 16 {
                1
            } else {
                0
            }
        })
        .sum()
}

/// 对一个分配序列执行切片搜索与剩余比特分发
fn allocate_sequence(need: &[i32], bitpool: i32, bits: &mut [u8]) {
    bits.fill(0);
    let Some(&max_need) = need.iter().max() else {
        return;
    };
    let min_need = need.iter().copied().min().unwrap_or(max_need);

    let mut slice = max_need + 1;
    let mut bit_count = 0;
    let mut slice_count = 0;
    loop {
        slice -= 1;
        bit_count += slice_count;
        slice_count = slice_cost(need, slice);
        if bit_count + slice_count >= bitpool {
            break;
        }
        // 所有子带都已达到 16 比特, 比特池超出容量
        if slice + 16 <= min_need {
            break;
        }
    }
    if bit_count + slice_count == bitpool {
        bit_count += slice_count;
        slice -= 1;
    }

    for (b, &n) in bits.iter_mut().zip(need) {
        *b = if n < slice + 2 {
            0
        } else {
            (n - slice).min(i32::from(MAX_BITS)) as u8
        };
    }

    // 第一轮: 已有 2..16 比特的子带加 1, 恰在切片下一层的子带直接给 2
    let mut i = 0;
    while bit_count < bitpool && i < bits.len() {
        if (2..MAX_BITS).contains(&bits[i]) {
            bits[i] += 1;
            bit_count += 1;
        } else if need[i] == slice + 1 && bitpool > bit_count + 1 {
            bits[i] = 2;
            bit_count += 2;
        }
        i += 1;
    }

    // 第二轮: 剩余比特逐个给未满的子带
    let mut i = 0;
    while bit_count < bitpool && i < bits.len() {
        if bits[i] < MAX_BITS {
            bits[i] += 1;
            bit_count += 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::sbc::config::{ChannelMode, SamplingFrequency, SbcConfig, Subbands};
    use AllocationMethod::{Loudness, Snr};

    fn params(mode: ChannelMode, alloc: AllocationMethod, bitpool: u8) -> FrameParams {
        SbcConfig {
            channel_mode: mode,
            allocation: alloc,
            ..SbcConfig::default()
        }
        .frame_params(bitpool)
    }

    fn mono_sf(sf: [u8; 8]) -> ScaleFactors {
        [sf, [0; MAX_SUBBANDS]]
    }

    fn total(bits: &BitAllocation) -> u32 {
        bits.iter().flatten().map(|&b| u32::from(b)).sum()
    }

    /// 确定性伪随机比例因子
    fn pseudo_random_sf(seed: &mut u32) -> ScaleFactors {
        let mut sf = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        for v in sf.iter_mut().flatten() {
            *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            *v = ((*seed >> 16) % 16) as u8;
        }
        sf
    }

    const ALL_MODES: [ChannelMode; 4] = [
        ChannelMode::Mono,
        ChannelMode::DualChannel,
        ChannelMode::Stereo,
        ChannelMode::JointStereo,
    ];

    /// A2DP 规则下的单声道 8 子带 44.1 kHz 分配: (方式, 比特池, 比例因子, 期望)
    const MONO_CASES: [(AllocationMethod, u8, [u8; 8], [u8; 8]); 7] = [
        (Loudness, 30, [8, 7, 6, 5, 4, 3, 2, 1], [9, 5, 5, 4, 4, 3, 0, 0]),
        (Snr, 30, [8, 7, 6, 5, 4, 3, 2, 1], [8, 7, 6, 4, 3, 2, 0, 0]),
        (Loudness, 40, [8; 8], [7, 5, 5, 5, 5, 5, 4, 4]),
        (Snr, 40, [2, 1, 1, 0, 0, 0, 0, 0], [7, 6, 6, 5, 4, 4, 4, 4]),
        (Loudness, 40, [1, 1, 1, 1, 0, 0, 0, 0], [10, 8, 7, 7, 2, 2, 2, 2]),
        (Loudness, 100, [0, 10, 0, 0, 0, 0, 0, 0], [12, 16, 12, 12, 12, 12, 12, 12]),
        (Snr, 64, [0; 8], [8; 8]),
    ];

    #[test]
    fn test_单声道分配表() {
        for (alloc, bitpool, sf, expected) in MONO_CASES {
            let p = params(ChannelMode::Mono, alloc, bitpool);
            let bits = allocate(&p, &mono_sf(sf));
            assert_eq!(bits[0], expected, "{alloc:?} 比特池 {bitpool} 比例因子 {sf:?}");
            assert_eq!(bits[1], [0; MAX_SUBBANDS]);
        }
    }

    #[test]
    fn test_立体声交错分配() {
        let p = params(ChannelMode::Stereo, Loudness, 35);
        let bits = allocate(&p, &[[6; 8], [6; 8]]);
        // 比特池为奇数, 多出的比特按交错顺序先给声道 0
        assert_eq!(bits[0], [5, 3, 3, 3, 2, 2, 0, 0]);
        assert_eq!(bits[1], [5, 3, 3, 2, 2, 2, 0, 0]);
        assert_eq!(total(&bits), 35);
    }

    #[test]
    fn test_联合立体声含零比例因子() {
        let p = SbcConfig {
            frequency: SamplingFrequency::F16000,
            channel_mode: ChannelMode::JointStereo,
            subbands: Subbands::Four,
            ..SbcConfig::default()
        }
        .frame_params(20);
        let mut sf = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        sf[0][..4].copy_from_slice(&[9, 0, 7, 0]);
        sf[1][..4].copy_from_slice(&[9, 5, 0, 0]);
        let bits = allocate(&p, &sf);
        assert_eq!(bits[0][..4], [7, 0, 4, 0]);
        assert_eq!(bits[1][..4], [6, 3, 0, 0]);
    }

    #[test]
    fn test_msbc静音帧分配() {
        let p = SbcConfig {
            frequency: SamplingFrequency::F16000,
            channel_mode: ChannelMode::Mono,
            ..SbcConfig::default()
        }
        .frame_params(26);
        let bits = allocate(&p, &[[0; MAX_SUBBANDS]; MAX_CHANNELS]);
        assert_eq!(bits[0], [4, 4, 3, 3, 3, 3, 3, 3]);
    }

    #[test]
    fn test_静音帧用满比特池() {
        for mode in ALL_MODES {
            for alloc in [Loudness, Snr] {
                let p = params(mode, alloc, 64);
                let bits = allocate(&p, &[[0; MAX_SUBBANDS]; MAX_CHANNELS]);
                let expected = if mode.shares_bitpool() { [4; 8] } else { [8; 8] };
                assert_eq!(bits[0], expected, "{mode:?} {alloc:?}");
                if mode != ChannelMode::Mono {
                    assert_eq!(bits[1], expected, "{mode:?} {alloc:?}");
                }
            }
        }
    }

    #[test]
    fn test_零比特池() {
        let p = params(ChannelMode::JointStereo, Loudness, 0);
        let bits = allocate(&p, &[[10; 8], [12; 8]]);
        assert_eq!(total(&bits), 0);
    }

    #[test]
    fn test_分配总量等于比特池() {
        let mut seed = 3;
        for _ in 0..200 {
            let sf = pseudo_random_sf(&mut seed);
            for mode in ALL_MODES {
                for alloc in [Loudness, Snr] {
                    for bitpool in 0..=255u8 {
                        let p = params(mode, alloc, bitpool);
                        let bits = allocate(&p, &sf);
                        assert!(bits.iter().flatten().all(|&b| b <= 16));

                        let budget = u32::from(p.bitpool);
                        if mode.shares_bitpool() {
                            assert_eq!(total(&bits), budget, "{mode:?} {alloc:?} {sf:?}");
                        } else {
                            for ch in 0..p.channels() {
                                let used: u32 = bits[ch].iter().map(|&b| u32::from(b)).sum();
                                assert_eq!(used, budget, "{mode:?} {alloc:?} {sf:?}");
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_单个子带分配不随比特池单调() {
        let p = |bitpool| {
            SbcConfig {
                channel_mode: ChannelMode::Mono,
                subbands: Subbands::Four,
                ..SbcConfig::default()
            }
            .frame_params(bitpool)
        };
        let silent = [[0; MAX_SUBBANDS]; MAX_CHANNELS];
        // 比特池 3 -> 4 时子带 0 由 3 比特降为 2 比特, 解码端按同样规则重算
        assert_eq!(allocate(&p(3), &silent)[0][..4], [3, 0, 0, 0]);
        assert_eq!(allocate(&p(4), &silent)[0][..4], [2, 2, 0, 0]);
    }

    #[test]
    fn test_切片代价() {
        let need = [5, 4, -5, 20];
        // slice = 3: 需求 4 恰在下一层 (+2), 需求 5 在 (4, 19) 内 (+1)
        assert_eq!(slice_cost(&need, 3), 3);
        // slice = 4: 需求 5 恰在下一层, 需求 20 仍在 16 层以外
        assert_eq!(slice_cost(&need, 4), 2);
        assert_eq!(slice_cost(&need, 5), 1);
        // 静音子带的需求 -5 在切片足够低时同样计入
        assert_eq!(slice_cost(&need, -6), 2 + 1 + 1);
    }
}
