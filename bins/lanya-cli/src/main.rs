//! lanya-cli - SBC / mSBC 编码命令行工具
//!
//! 把 16 位 PCM WAV 或原始 S16LE 数据编码为 SBC 基本码流 (连续的 SBC 帧).

mod logging;
mod profile;
mod report;
mod wav;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use lanya_codec::SbcEncoder;
use profile::{AllocArg, EncodeProfile, ModeArg};
use report::EncodeReport;
use wav::PcmAudio;

#[derive(Parser, Debug)]
#[command(name = "lanya-cli", version, about = "纯 Rust SBC / mSBC 编码工具")]
struct Cli {
    /// 输入文件路径 (WAV, 或配合 --raw 的 S16LE 数据)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 输出 SBC 文件路径
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 覆盖输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 输入为原始 S16LE 交错数据
    #[arg(long)]
    raw: bool,

    /// 原始输入的采样率 (Hz)
    #[arg(long)]
    ar: Option<u32>,

    /// 原始输入的声道数
    #[arg(long)]
    ac: Option<u32>,

    /// 目标码率 (kbps, 默认 328)
    #[arg(long)]
    bitrate: Option<u32>,

    /// 显式比特池 (优先于码率)
    #[arg(long)]
    bitpool: Option<u8>,

    /// 对端允许的最小比特池
    #[arg(long)]
    min_bitpool: Option<u8>,

    /// 对端允许的最大比特池
    #[arg(long)]
    max_bitpool: Option<u8>,

    /// 子带数 (4 或 8)
    #[arg(long)]
    subbands: Option<usize>,

    /// 每帧块数 (4/8/12/16)
    #[arg(long)]
    blocks: Option<usize>,

    /// 声道模式
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// 比特分配方式
    #[arg(long, value_enum)]
    alloc: Option<AllocArg>,

    /// 编码为 mSBC (16 kHz 单声道)
    #[arg(long)]
    msbc: bool,

    /// 非 EDR 链路, 码率上限 229 kbps
    #[arg(long)]
    non_edr: bool,

    /// JSON 编码配置文件, 命令行参数优先
    #[arg(long)]
    profile: Option<PathBuf>,

    /// 输出 JSON 编码报告
    #[arg(long)]
    report: Option<PathBuf>,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// 命令行中显式给出的编码参数
    fn overrides(&self) -> EncodeProfile {
        EncodeProfile {
            bitrate: self.bitrate,
            bitpool: self.bitpool,
            min_bitpool: self.min_bitpool,
            max_bitpool: self.max_bitpool,
            subbands: self.subbands,
            blocks: self.blocks,
            mode: self.mode,
            alloc: self.alloc,
            msbc: self.msbc,
            non_edr: self.non_edr,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("lanya-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if cli.input.is_none() {
        print_banner();
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let Some(input_path) = cli.input.as_deref() else {
        bail!("必须指定输入文件 (-i <输入文件>)");
    };
    let Some(output_path) = cli.output.as_deref() else {
        bail!("必须指定输出文件 (-o <输出文件>)");
    };
    if !cli.overwrite && output_path.exists() {
        bail!("输出文件已存在 '{}', 使用 -y 覆盖", output_path.display());
    }

    eprintln!(
        "lanya 版本 {} -- 纯 Rust SBC 编码工具",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("输入: {}", input_path.display());
    eprintln!("输出: {}", output_path.display());

    let audio = read_input(cli, input_path)?;
    info!(
        "输入音频: {} Hz, {} 声道, {} 个采样/声道",
        audio.sample_rate,
        audio.channels,
        audio.frames(),
    );

    let profile = match &cli.profile {
        Some(path) => EncodeProfile::load(path)?.merge(cli.overrides()),
        None => cli.overrides(),
    };
    let mut encoder = profile.build_encoder(audio.sample_rate, audio.channels)?;

    let (stream, padded) = encode_all(&mut encoder, &audio.samples)?;
    write_output(output_path, &stream)?;

    let report = EncodeReport::new(&encoder, &stream, padded)?;
    eprintln!(
        "完成: {} 帧, {} 字节, 比特池 {}, 帧长 {} 字节, {:.1} kbps",
        report.frames,
        report.bytes,
        report.bitpool,
        report.frame_length,
        f64::from(report.bitrate) / 1000.0,
    );
    if let Some(path) = &cli.report {
        report.write(path)?;
        info!("报告已写入 {}", path.display());
    }
    Ok(())
}

fn read_input(cli: &Cli, path: &Path) -> Result<PcmAudio> {
    let file =
        File::open(path).with_context(|| format!("无法打开输入文件 '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let audio = if cli.raw {
        let (Some(sample_rate), Some(channels)) = (cli.ar, cli.ac) else {
            bail!("原始 PCM 输入需要 --ar 与 --ac");
        };
        wav::read_raw(reader, sample_rate, channels)
    } else {
        wav::read_wav(reader)
    };
    audio.with_context(|| format!("读取输入文件 '{}' 失败", path.display()))
}

/// 编码全部采样, 末尾不足一帧时补零
///
/// 返回码流与补零的采样数.
fn encode_all(encoder: &mut SbcEncoder, samples: &[i16]) -> Result<(Vec<u8>, usize)> {
    let per_frame = encoder.pcm_samples_per_frame();
    let full_frames = samples.len() / per_frame;
    let mut stream = Vec::new();
    let summary = encoder.encode(samples, full_frames, &mut stream)?;

    let rest = &samples[summary.samples_consumed..];
    if rest.is_empty() {
        return Ok((stream, 0));
    }
    let padded = per_frame - rest.len();
    warn!("末尾不足一帧, 补零 {padded} 个采样");
    let mut last = rest.to_vec();
    last.resize(per_frame, 0);
    stream.extend_from_slice(&encoder.encode_frame(&last)?);
    Ok((stream, padded))
}

fn write_output(path: &Path, stream: &[u8]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("无法创建输出文件 '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(stream)?;
    writer.flush()?;
    Ok(())
}

fn print_banner() {
    eprintln!(
        "lanya 版本 {} -- 纯 Rust SBC 编码工具",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!("用法: lanya-cli -i <输入.wav> -o <输出.sbc> [选项]");
    eprintln!();
    eprintln!("示例:");
    eprintln!("  lanya-cli -i music.wav -o music.sbc");
    eprintln!("  lanya-cli -i music.wav -o music.sbc --bitrate 229 --alloc snr");
    eprintln!("  lanya-cli -i voice.raw --raw --ar 16000 --ac 1 -o voice.msbc --msbc");
    eprintln!("  lanya-cli -i music.wav -o music.sbc --min-bitpool 2 --max-bitpool 35");
    eprintln!();
    eprintln!("使用 --help 查看全部选项");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use lanya_codec::SbcConfig;
    use lanya_codec::encoders::sbc::split_frames;

    #[test]
    fn test_补零编码末帧() {
        let mut encoder = SbcEncoder::new(SbcConfig::default());
        let samples = vec![500i16; 256 * 2 + 10];
        let (stream, padded) = encode_all(&mut encoder, &samples).unwrap();
        assert_eq!(padded, 246);
        assert_eq!(stream.len(), 3 * 119);
        let frames = split_frames(&stream).unwrap();
        assert!(frames.iter().all(|(info, _)| info.crc_ok));
    }

    #[test]
    fn test_整帧输入不补零() {
        let mut encoder = SbcEncoder::msbc();
        let (stream, padded) = encode_all(&mut encoder, &[0; 360]).unwrap();
        assert_eq!(padded, 0);
        assert_eq!(stream.len(), 3 * 57);
    }

    #[test]
    fn test_wav到sbc文件() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.sbc");
        let samples: Vec<i16> = (0..44100)
            .map(|i| ((i as f64 * 0.03).sin() * 8000.0) as i16)
            .collect();
        fs::write(&input, wav::tests::build_wav(44100, 2, &samples, &[])).unwrap();

        let cli = Cli::parse_from([
            "lanya-cli",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--bitrate",
            "229",
        ]);
        run(&cli).unwrap();

        let stream = fs::read(&output).unwrap();
        let frames = split_frames(&stream).unwrap();
        // 22050 个采样/声道 = 172 整帧 + 1 个补零帧
        assert_eq!(frames.len(), 173);
        assert!(frames.iter().all(|(info, _)| info.params.bitpool == 35));

        // 输出已存在且未指定 -y
        assert!(run(&cli).is_err());
    }

    #[test]
    fn test_模式与分配参数取值() {
        let cli = Cli::try_parse_from(["lanya-cli", "--mode", "dual", "--alloc", "snr"]).unwrap();
        let profile = cli.overrides();
        assert_eq!(profile.mode, Some(ModeArg::Dual));
        assert_eq!(profile.alloc, Some(AllocArg::Snr));

        assert!(Cli::try_parse_from(["lanya-cli", "--mode", "surround"]).is_err());
        assert!(Cli::try_parse_from(["lanya-cli", "--alloc", "peak"]).is_err());
    }

    #[test]
    fn test_原始输入缺少参数() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.raw");
        fs::write(&input, [0u8; 64]).unwrap();
        let cli = Cli::parse_from([
            "lanya-cli",
            "-i",
            input.to_str().unwrap(),
            "-o",
            dir.path().join("out.sbc").to_str().unwrap(),
            "--raw",
        ]);
        assert!(run(&cli).is_err());
    }
}
