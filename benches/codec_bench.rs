//! Lanya 编码性能基准测试.
//!
//! 覆盖 SBC 各典型配置与 mSBC 的逐帧编码, 以及 Encoder trait 管线.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use lanya::codec::{
    AllocationMethod, AudioFrame, ChannelMode, CodecId, CodecParameters, SamplingFrequency,
    SbcConfig, SbcEncoder, Subbands,
};

/// 生成交错 S16 测试信号
fn make_pcm(nb_samples: usize, channels: usize) -> Vec<i16> {
    (0..nb_samples * channels)
        .map(|i| (((i / channels) as f64 * 0.07).sin() * 12000.0) as i16)
        .collect()
}

fn bench_sbc_config(c: &mut Criterion, name: &str, config: SbcConfig) {
    let mut encoder = SbcEncoder::new(config);
    let frames = 64;
    let pcm = make_pcm(encoder.samples_per_frame() * frames, config.channel_mode.channels());
    let mut out = Vec::with_capacity(frames * encoder.frame_length());

    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Elements(pcm.len() as u64));
    group.bench_function("encode_64_frames", |b| {
        b.iter(|| {
            out.clear();
            encoder
                .encode(black_box(&pcm), frames, &mut out)
                .unwrap();
        });
    });
    group.finish();
}

fn bench_sbc_encode(c: &mut Criterion) {
    bench_sbc_config(c, "sbc_44k_joint_8sb", SbcConfig::default());
    bench_sbc_config(
        c,
        "sbc_48k_stereo_8sb_snr",
        SbcConfig {
            frequency: SamplingFrequency::F48000,
            channel_mode: ChannelMode::Stereo,
            allocation: AllocationMethod::Snr,
            ..SbcConfig::default()
        },
    );
    bench_sbc_config(
        c,
        "sbc_16k_mono_4sb",
        SbcConfig {
            frequency: SamplingFrequency::F16000,
            channel_mode: ChannelMode::Mono,
            subbands: Subbands::Four,
            bitrate_kbps: 64,
            ..SbcConfig::default()
        },
    );
}

fn bench_msbc_encode(c: &mut Criterion) {
    c.bench_function("msbc_encode_frame", |b| {
        let mut encoder = SbcEncoder::msbc();
        let pcm = make_pcm(120, 1);
        b.iter(|| {
            let _frame = encoder.encode_frame(black_box(&pcm)).unwrap();
        });
    });
}

fn bench_trait_pipeline(c: &mut Criterion) {
    c.bench_function("sbc_trait_pipeline_4096", |b| {
        let registry = lanya::default_codec_registry();
        let params = CodecParameters::new_audio(CodecId::Sbc, 44100, 2);
        let frame = AudioFrame::new(make_pcm(4096, 2), 44100, 2);
        b.iter(|| {
            let mut enc = registry.create_encoder(CodecId::Sbc).unwrap();
            enc.open(&params).unwrap();
            enc.send_frame(Some(black_box(&frame))).unwrap();
            enc.send_frame(None).unwrap();
            while let Ok(_pkt) = enc.receive_packet() {}
        });
    });
}

criterion_group!(
    benches,
    bench_sbc_encode,
    bench_msbc_encode,
    bench_trait_pipeline
);
criterion_main!(benches);
