use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use joymap_input::DeviceInfo;
use joymap_logical::{decode, encode, generate_template, MapperConfig, Template};

fn sample_templates() -> Vec<Template> {
    let config = MapperConfig::default();
    (0..32u16)
        .map(|i| {
            let info = DeviceInfo {
                id: i32::from(i) + 1,
                vendor_id: 0x0400 + i,
                product_id: 0x1000 + i,
                version: 0x100,
                name: format!("Bench Pad {i}"),
                standard_mapping: true,
            };
            generate_template(&config, &info, &[], &[])
        })
        .collect()
}

fn bench_codec(c: &mut Criterion) {
    let templates = sample_templates();
    let encoded = encode(&templates);

    c.bench_function("codec_encode_32_templates", |b| {
        b.iter(|| black_box(encode(black_box(&templates))))
    });

    c.bench_function("codec_decode_32_templates", |b| {
        b.iter(|| {
            let decoded = decode(black_box(encoded.as_bytes()))
                .expect("encoded templates should decode");
            black_box(decoded);
        })
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
