//! 量化与帧打包.
//!
//! 帧布局 (MSB 优先):
//!
//! ```text
//! [同步字 8][帧头 8][比特池 8][CRC 8]
//! [联合立体声标志 n, 仅联合立体声]
//! [比例因子 4 x 声道 x 子带]
//! [量化采样: 块 -> 声道 -> 子带, 每个 bits[ch][sb] 位]
//! [零填充到帧长度]
//! ```
//!
//! CRC 覆盖帧头、比特池、联合立体声标志和比例因子.

use lanya_core::bitwriter::BitWriter;
use lanya_core::crc::crc8_sbc;

use super::analysis::SubbandSamples;
use super::bit_alloc::BitAllocation;
use super::config::FrameParams;
use super::scale_factor::FrameScale;

/// 把子带采样量化为 `bits` 位无符号索引
///
/// 索引 = `((s / 2^(sf+15) + 1) * (2^bits - 1)) / 2`, 截断到 `[0, 2^bits - 1]`.
pub(super) fn quantize(sample: i32, scale_factor: u8, bits: u8) -> u32 {
    let levels = (1i64 << bits) - 1;
    let shift = u32::from(scale_factor) + 16;
    let biased = i64::from(sample) + (1i64 << (shift - 1));
    ((biased * levels) >> shift).clamp(0, levels) as u32
}

/// 计算帧 CRC
///
/// `frame` 至少包含帧头和比例因子; `protected_bits` 为第 4 字节之后受保护的位数.
pub(crate) fn frame_crc(frame: &[u8], protected_bits: usize) -> u8 {
    let tail_len = protected_bits.div_ceil(8);
    let mut input = Vec::with_capacity(2 + tail_len);
    input.extend_from_slice(&frame[1..3]);
    input.extend_from_slice(&frame[4..4 + tail_len]);
    crc8_sbc(&input, 16 + protected_bits)
}

/// 打包一帧, 追加到 `out`, 返回写入的字节数
pub(super) fn pack_frame(
    params: &FrameParams,
    samples: &SubbandSamples,
    scale: &FrameScale,
    bits: &BitAllocation,
    out: &mut Vec<u8>,
) -> usize {
    let frame_len = params.frame_length();
    let channels = params.channels();
    let subbands = params.subbands;

    let mut bw = BitWriter::with_capacity(frame_len);
    bw.write_bits(u32::from(params.sync_word()), 8);
    bw.write_bits(u32::from(params.header_byte()), 8);
    bw.write_bits(u32::from(params.bitpool_byte()), 8);
    // CRC 占位, 打包完成后回填
    bw.write_bits(0, 8);

    for &joined in &scale.join[..params.join_bits()] {
        bw.write_bit(u32::from(joined));
    }
    for ch in 0..channels {
        for sb in 0..subbands {
            bw.write_bits(u32::from(scale.scale_factors[ch][sb]), 4);
        }
    }
    let protected_bits = bw.bits_written() - 32;

    for block in &samples[..params.blocks] {
        for ch in 0..channels {
            for sb in 0..subbands {
                let nbits = bits[ch][sb];
                if nbits > 0 {
                    let index = quantize(block[ch][sb], scale.scale_factors[ch][sb], nbits);
                    bw.write_bits(index, u32::from(nbits));
                }
            }
        }
    }

    bw.pad_to_len(frame_len);
    let mut frame = bw.finish();
    frame[3] = frame_crc(&frame, protected_bits);

    let written = frame.len();
    out.extend_from_slice(&frame);
    written
}
